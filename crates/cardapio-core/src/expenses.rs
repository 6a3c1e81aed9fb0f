//! Fixed expense totals and per-category breakdown.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ExpenseCategory, FixedExpense};

/// Sum of all monthly fixed expenses.
pub fn total_fixed_expenses(expenses: &[FixedExpense]) -> Money {
    expenses.iter().map(FixedExpense::monthly_value).sum()
}

/// One category's slice of the fixed expenses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub total: Money,
    /// Share of all fixed expenses (0 when the total is 0).
    pub share: f64,
    pub count: usize,
}

/// Fixed expenses grouped by category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseSummary {
    pub total: Money,
    /// Every category, in [`ExpenseCategory::ALL`] order, empty ones included.
    pub by_category: Vec<CategoryTotal>,
}

impl ExpenseSummary {
    pub fn from_expenses(expenses: &[FixedExpense]) -> Self {
        let total = total_fixed_expenses(expenses);
        let by_category = ExpenseCategory::ALL
            .iter()
            .map(|&category| {
                let in_category = expenses.iter().filter(|e| e.category == category);
                let count = in_category.clone().count();
                let category_total: Money = in_category.map(FixedExpense::monthly_value).sum();
                CategoryTotal {
                    category,
                    total: category_total,
                    share: category_total.ratio_of(total),
                    count,
                }
            })
            .collect();

        ExpenseSummary { total, by_category }
    }

    /// Total of one category.
    pub fn category_total(&self, category: ExpenseCategory) -> Money {
        self.by_category
            .iter()
            .find(|entry| entry.category == category)
            .map(|entry| entry.total)
            .unwrap_or_default()
    }

    /// Salaries and labor charges.
    #[inline]
    pub fn staff_total(&self) -> Money {
        self.category_total(ExpenseCategory::Staff)
    }
}
