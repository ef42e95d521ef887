//! Conversion display derived from the most recent rate table.

use crate::model::RateTable;

/// Codes shown in the currency section, in display order.
pub const TARGET_CURRENCIES: &[&str] = &["EUR", "GBP", "JPY", "CAD", "AUD"];

pub const DEFAULT_AMOUNT: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub code: String,
    pub value: f64,
}

impl std::fmt::Display for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {:.4}", self.code, self.value)
    }
}

/// `amount` converted into every target code present in `table`.
/// Codes missing from the table are left out.
pub fn recompute(amount: f64, table: &RateTable) -> Vec<Conversion> {
    TARGET_CURRENCIES
        .iter()
        .filter_map(|code| {
            table.rate(code).map(|rate| Conversion {
                code: (*code).to_string(),
                value: amount * rate,
            })
        })
        .collect()
}

/// Parse user input. Blank, non-numeric, negative or non-finite input is rejected.
pub fn parse_amount(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

/// Holds the rate table of the current search and the amount being edited.
#[derive(Debug, Clone)]
pub struct CurrencyRecalculator {
    table: Option<RateTable>,
    amount: f64,
    conversions: Vec<Conversion>,
}

impl Default for CurrencyRecalculator {
    fn default() -> Self {
        Self {
            table: None,
            amount: DEFAULT_AMOUNT,
            conversions: Vec::new(),
        }
    }
}

impl CurrencyRecalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> Option<&RateTable> {
        self.table.as_ref()
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn conversions(&self) -> &[Conversion] {
        &self.conversions
    }

    /// Replace the rate table and recompute with the current amount.
    pub fn set_table(&mut self, table: RateTable) -> &[Conversion] {
        self.table = Some(table);
        self.refresh()
    }

    /// Drop the table of a previous search.
    pub fn clear(&mut self) {
        self.table = None;
        self.conversions.clear();
    }

    /// Handle an edit of the amount field. Invalid input clears the display
    /// until a valid amount is entered; the table is kept.
    pub fn on_amount_change(&mut self, input: &str) -> &[Conversion] {
        match parse_amount(input) {
            Some(amount) => {
                self.amount = amount;
                self.refresh()
            }
            None => {
                self.conversions.clear();
                &self.conversions
            }
        }
    }

    fn refresh(&mut self) -> &[Conversion] {
        self.conversions = self
            .table
            .as_ref()
            .map(|table| recompute(self.amount, table))
            .unwrap_or_default();
        &self.conversions
    }
}
