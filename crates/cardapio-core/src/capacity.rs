//! Productive capacity and hourly costs.
//!
//! Informational metrics only: they are displayed next to the markup
//! configuration but never feed the markup formulas.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::expenses::ExpenseSummary;
use crate::money::Money;
use crate::types::ProductiveCapacity;

/// `employees × hours_per_day × days_per_month × productivity_factor`
pub fn productive_hours(
    employees: i64,
    hours_per_day: f64,
    days_per_month: f64,
    productivity_factor: f64,
) -> f64 {
    let hours = employees as f64 * hours_per_day * days_per_month * productivity_factor;
    if hours.is_finite() {
        hours
    } else {
        0.0
    }
}

impl ProductiveCapacity {
    /// Productive hours per month.
    pub fn productive_hours(&self) -> f64 {
        productive_hours(
            self.employees,
            self.hours_per_day,
            self.days_per_month,
            self.productivity_factor,
        )
    }

    /// Checks the premises before they are stored.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.employees < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "employees".to_string(),
            });
        }
        for (field, value, max) in [
            ("hours_per_day", self.hours_per_day, 24.0),
            ("days_per_month", self.days_per_month, 31.0),
            ("productivity_factor", self.productivity_factor, 1.0),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NotFinite {
                    field: field.to_string(),
                });
            }
            if !(0.0..=max).contains(&value) {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 0.0,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Monthly cost spread over one productive hour, or `None` with no hours.
pub fn cost_per_hour(monthly_cost: Money, productive_hours: f64) -> Option<Money> {
    if !productive_hours.is_finite() || productive_hours <= 0.0 {
        return None;
    }
    Some(monthly_cost.multiply_quantity(1.0 / productive_hours))
}

/// Hourly view of the fixed expenses (custo hora).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HourlyCost {
    pub productive_hours: f64,
    /// Staff expenses per productive hour.
    pub cost_per_hour: Option<Money>,
    /// All fixed expenses per productive hour.
    pub fixed_cost_per_hour: Option<Money>,
}

impl HourlyCost {
    pub fn compute(capacity: &ProductiveCapacity, expenses: &ExpenseSummary) -> Self {
        let hours = capacity.productive_hours();
        HourlyCost {
            productive_hours: hours,
            cost_per_hour: cost_per_hour(expenses.staff_total(), hours),
            fixed_cost_per_hour: cost_per_hour(expenses.total, hours),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExpenseCategory, FixedExpense};
    use chrono::Utc;

    fn capacity(employees: i64) -> ProductiveCapacity {
        ProductiveCapacity {
            employees,
            hours_per_day: 8.0,
            days_per_month: 25.0,
            productivity_factor: 0.8,
            ..ProductiveCapacity::default()
        }
    }

    fn expense(category: ExpenseCategory, cents: i64) -> FixedExpense {
        FixedExpense {
            id: uuid::Uuid::new_v4().to_string(),
            name: format!("{:?}", category),
            category,
            monthly_value_cents: cents,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_productive_hours() {
        assert_eq!(capacity(2).productive_hours(), 320.0);
        assert_eq!(capacity(0).productive_hours(), 0.0);
    }

    #[test]
    fn test_hourly_costs() {
        let expenses = ExpenseSummary::from_expenses(&[
            expense(ExpenseCategory::Staff, 640_000),
            expense(ExpenseCategory::Occupancy, 320_000),
        ]);
        let hourly = HourlyCost::compute(&capacity(2), &expenses);
        // R$ 6.400,00 / 320 h
        assert_eq!(hourly.cost_per_hour, Some(Money::from_cents(2000)));
        // R$ 9.600,00 / 320 h
        assert_eq!(hourly.fixed_cost_per_hour, Some(Money::from_cents(3000)));
    }

    #[test]
    fn test_no_hours_means_no_hourly_cost() {
        let expenses = ExpenseSummary::from_expenses(&[expense(ExpenseCategory::Staff, 100_000)]);
        let hourly = HourlyCost::compute(&capacity(0), &expenses);
        assert_eq!(hourly.cost_per_hour, None);
        assert_eq!(hourly.fixed_cost_per_hour, None);
        assert_eq!(cost_per_hour(Money::from_cents(100), f64::NAN), None);
    }

    #[test]
    fn test_validate_capacity() {
        assert!(capacity(3).validate().is_ok());
        assert!(capacity(-1).validate().is_err());
        let overworked = ProductiveCapacity {
            hours_per_day: 30.0,
            ..capacity(1)
        };
        assert!(matches!(
            overworked.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }
}
