//! Holiday rules and their static configuration.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// Who a rule applies to.
///
/// `System` rules apply to every scope; the others match exactly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleScope {
    System,
    Store,
    Warehouse,
    Supplier,
}

impl RuleScope {
    /// Whether a rule with this scope covers a query at `query` scope.
    pub fn covers(self, query: RuleScope) -> bool {
        self == RuleScope::System || self == query
    }
}

/// What a rule forbids on the days it matches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleEffect {
    NoOrder,
    NoReceipt,
    Both,
}

impl RuleEffect {
    pub fn blocks_order(self) -> bool {
        matches!(self, RuleEffect::NoOrder | RuleEffect::Both)
    }

    pub fn blocks_receipt(self) -> bool {
        matches!(self, RuleEffect::NoReceipt | RuleEffect::Both)
    }
}

/// Which days a rule matches.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// One specific day.
    Single(NaiveDate),
    /// Every day in an inclusive range.
    Range { from: NaiveDate, to: NaiveDate },
    /// The same month/day every year (e.g. a patron-saint day).
    FixedAnnual { month: u32, day: u32 },
}

/// A configured closure rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRule {
    pub name: String,
    pub scope: RuleScope,
    pub effect: RuleEffect,
    pub kind: RuleKind,
}

impl HolidayRule {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self.kind {
            RuleKind::Single(day) => date == day,
            RuleKind::Range { from, to } => from <= date && date <= to,
            RuleKind::FixedAnnual { month, day } => {
                date.month() == month && date.day() == day
            }
        }
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.name.trim().is_empty() {
            return Err(CalendarError::invalid_rule(
                "<unnamed>",
                "name cannot be empty",
            ));
        }
        match self.kind {
            RuleKind::Single(_) => Ok(()),
            RuleKind::Range { from, to } => {
                if from > to {
                    return Err(CalendarError::invalid_rule(
                        &self.name,
                        "range start is after range end",
                    ));
                }
                Ok(())
            }
            RuleKind::FixedAnnual { month, day } => {
                // Check against a leap year so Feb 29 is accepted.
                if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
                    return Err(CalendarError::invalid_rule(
                        &self.name,
                        "month/day is not a valid calendar date",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// The full rule set, loaded once at startup.
///
/// There is no reload path; changing the rules requires a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub rules: Vec<HolidayRule>,
}

impl CalendarConfig {
    pub fn new(rules: Vec<HolidayRule>) -> Self {
        Self { rules }
    }
}
