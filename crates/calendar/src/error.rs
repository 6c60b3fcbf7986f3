//! Calendar error model.

use chrono::NaiveDate;
use thiserror::Error;

/// Calendar-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// A configured rule is malformed (e.g. inverted range).
    #[error("invalid holiday rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    /// No eligible day exists within the bounded search window.
    ///
    /// Signals a misconfiguration (e.g. every day marked closed); fatal
    /// to the calling operation until the rule set is fixed.
    #[error("no eligible date found within {searched_days} days of {start}")]
    NoEligibleDateFound { start: NaiveDate, searched_days: u32 },
}

impl CalendarError {
    pub fn invalid_rule(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
