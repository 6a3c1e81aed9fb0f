//! # Menu Engineering
//!
//! Places each product in the classic margin × popularity matrix.
//!
//! ```text
//!                    popularity < 7        popularity ≥ 7
//!                 ┌────────────────────┬────────────────────┐
//!  margin ≥ 0.5   │  Puzzle            │  Star              │
//!                 │  promote it        │  keep it           │
//!                 ├────────────────────┼────────────────────┤
//!  margin < 0.5   │  Dog               │  Plow Horse        │
//!                 │  rethink/remove    │  reprice/re-cost   │
//!                 └────────────────────┴────────────────────┘
//! ```
//!
//! Missing margin or popularity counts as 0.
//!
//! The dashboard also buckets the menu into bands and picks out the
//! margin leaders:
//!
//! ```text
//!   band     margin          popularity
//!   high     ≥ 0.5           ≥ 8
//!   medium   0.3 ..< 0.5     5 ..< 8
//!   low      < 0.3           < 5
//! ```
//!
//! Band counts only include products that have the value at all.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;
use crate::{
    ENGINEERING_MARGIN_THRESHOLD, ENGINEERING_POPULARITY_THRESHOLD, MARGIN_BAND_HIGH_MIN, MARGIN_BAND_MEDIUM_MIN,
    POPULARITY_BAND_HIGH_MIN, POPULARITY_BAND_MEDIUM_MIN,
};

/// Quadrant of the menu-engineering matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MenuClass {
    Star,
    Puzzle,
    PlowHorse,
    Dog,
}

impl MenuClass {
    pub fn classify(margin: Option<f64>, popularity: Option<i64>) -> Self {
        let margin = margin.filter(|m| m.is_finite()).unwrap_or(0.0);
        let popularity = popularity.unwrap_or(0);

        let high_margin = margin >= ENGINEERING_MARGIN_THRESHOLD;
        let popular = popularity >= ENGINEERING_POPULARITY_THRESHOLD;

        match (high_margin, popular) {
            (true, true) => MenuClass::Star,
            (true, false) => MenuClass::Puzzle,
            (false, true) => MenuClass::PlowHorse,
            (false, false) => MenuClass::Dog,
        }
    }

    pub fn for_product(product: &Product) -> Self {
        MenuClass::classify(product.margin, product.popularity_level)
    }
}

/// One product placed in the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EngineeringEntry {
    pub product_id: String,
    pub name: String,
    pub margin: Option<f64>,
    pub popularity_level: Option<i64>,
    pub class: MenuClass,
}

/// The whole menu classified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuEngineering {
    pub entries: Vec<EngineeringEntry>,
    pub stars: usize,
    pub puzzles: usize,
    pub plow_horses: usize,
    pub dogs: usize,
}

impl MenuEngineering {
    pub fn from_products(products: &[Product]) -> Self {
        let mut report = MenuEngineering::default();
        for product in products {
            let class = MenuClass::for_product(product);
            match class {
                MenuClass::Star => report.stars += 1,
                MenuClass::Puzzle => report.puzzles += 1,
                MenuClass::PlowHorse => report.plow_horses += 1,
                MenuClass::Dog => report.dogs += 1,
            }
            report.entries.push(EngineeringEntry {
                product_id: product.id.clone(),
                name: product.name.clone(),
                margin: product.margin,
                popularity_level: product.popularity_level,
                class,
            });
        }
        report
    }

    pub fn of_class(&self, class: MenuClass) -> impl Iterator<Item = &EngineeringEntry> {
        self.entries.iter().filter(move |entry| entry.class == class)
    }
}

/// Average of the known margins, or `None` when no product has one.
pub fn average_margin(products: &[Product]) -> Option<f64> {
    let margins: Vec<f64> = products
        .iter()
        .filter_map(|p| p.margin)
        .filter(|m| m.is_finite())
        .collect();
    if margins.is_empty() {
        return None;
    }
    Some(margins.iter().sum::<f64>() / margins.len() as f64)
}

/// Dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuStats {
    pub product_count: i64,
    pub ingredient_count: i64,
    pub combo_count: i64,
    pub average_margin: Option<f64>,
}

// =============================================================================
// Dashboard Bands
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    High,
    Medium,
    Low,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::High, Band::Medium, Band::Low];

    pub fn for_margin(margin: f64) -> Self {
        if margin >= MARGIN_BAND_HIGH_MIN {
            Band::High
        } else if margin >= MARGIN_BAND_MEDIUM_MIN {
            Band::Medium
        } else {
            Band::Low
        }
    }

    pub fn for_popularity(level: i64) -> Self {
        if level >= POPULARITY_BAND_HIGH_MIN {
            Band::High
        } else if level >= POPULARITY_BAND_MEDIUM_MIN {
            Band::Medium
        } else {
            Band::Low
        }
    }
}

/// How many products fall in one band, and their share of the counted ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BandShare {
    pub band: Band,
    pub count: usize,
    /// Fraction of `total` (0 when nothing was counted).
    pub share: f64,
}

/// High, medium and low bands, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BandDistribution {
    pub total: usize,
    pub bands: Vec<BandShare>,
}

impl BandDistribution {
    fn from_bands(bands: impl Iterator<Item = Band>) -> Self {
        let mut counts = [0usize; 3];
        for band in bands {
            counts[band as usize] += 1;
        }
        let total: usize = counts.iter().sum();
        let bands = Band::ALL
            .iter()
            .map(|&band| {
                let count = counts[band as usize];
                let share = if total == 0 { 0.0 } else { count as f64 / total as f64 };
                BandShare { band, count, share }
            })
            .collect();
        BandDistribution { total, bands }
    }

    /// Buckets the products that have a finite margin.
    pub fn margins(products: &[Product]) -> Self {
        Self::from_bands(
            products
                .iter()
                .filter_map(|p| p.margin)
                .filter(|m| m.is_finite())
                .map(Band::for_margin),
        )
    }

    /// Buckets the products that have a popularity level.
    pub fn popularity(products: &[Product]) -> Self {
        Self::from_bands(products.iter().filter_map(|p| p.popularity_level).map(Band::for_popularity))
    }

    pub fn count(&self, band: Band) -> usize {
        self.bands
            .iter()
            .find(|entry| entry.band == band)
            .map_or(0, |entry| entry.count)
    }
}

// =============================================================================
// Product Indicators
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MarginLeader {
    pub product_id: String,
    pub name: String,
    pub margin: f64,
}

impl MarginLeader {
    fn of(product: &Product, margin: f64) -> Self {
        MarginLeader {
            product_id: product.id.clone(),
            name: product.name.clone(),
            margin,
        }
    }
}

/// The products at both ends of the margin range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductIndicators {
    pub highest_margin: Option<MarginLeader>,
    /// Lowest margin above zero; loss-making products are left out.
    pub lowest_positive_margin: Option<MarginLeader>,
}

impl ProductIndicators {
    /// On ties the first product in `products` wins.
    pub fn from_products(products: &[Product]) -> Self {
        let mut indicators = ProductIndicators::default();
        for product in products {
            let Some(margin) = product.margin.filter(|m| m.is_finite()) else {
                continue;
            };
            if indicators.highest_margin.as_ref().map_or(true, |best| margin > best.margin) {
                indicators.highest_margin = Some(MarginLeader::of(product, margin));
            }
            if margin > 0.0
                && indicators
                    .lowest_positive_margin
                    .as_ref()
                    .map_or(true, |worst| margin < worst.margin)
            {
                indicators.lowest_positive_margin = Some(MarginLeader::of(product, margin));
            }
        }
        indicators
    }
}

/// Everything the dashboard shows at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuDashboard {
    pub stats: MenuStats,
    pub margin_bands: BandDistribution,
    pub popularity_bands: BandDistribution,
    pub indicators: ProductIndicators,
}

impl MenuDashboard {
    pub fn new(stats: MenuStats, products: &[Product]) -> Self {
        MenuDashboard {
            stats,
            margin_bands: BandDistribution::margins(products),
            popularity_bands: BandDistribution::popularity(products),
            indicators: ProductIndicators::from_products(products),
        }
    }
}
