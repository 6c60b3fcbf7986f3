//! Engine-wide configuration supplied by the settings collaborator.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Ceiling on any averaging window, configured or per-call. The
/// out-of-stock scan walks the window day by day, so an unbounded
/// window turns a typo into an hours-long replay.
pub const MAX_LOOKBACK_DAYS: u32 = 365;

/// Global planner settings.
///
/// Passed explicitly at construction; there is no ambient global
/// configuration to reach for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Boost percent used when a SKU's boost is `Inherit`.
    pub global_oos_boost_percent: u8,
    /// Lookback window for the daily sales average, in calendar days.
    pub default_lookback_days: u32,
}

impl EngineSettings {
    pub fn validate(&self) -> DomainResult<()> {
        if self.global_oos_boost_percent > 100 {
            return Err(DomainError::validation(
                "global boost percent must be 0-100",
            ));
        }
        check_lookback(self.default_lookback_days)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            global_oos_boost_percent: 0,
            default_lookback_days: 30,
        }
    }
}

/// Bounds check applied to the configured default and to per-call
/// lookback overrides alike.
pub fn check_lookback(days: u32) -> DomainResult<()> {
    if days == 0 {
        return Err(DomainError::validation(
            "lookback window must be at least 1 day",
        ));
    }
    if days > MAX_LOOKBACK_DAYS {
        return Err(DomainError::validation(format!(
            "lookback window cannot exceed {MAX_LOOKBACK_DAYS} days"
        )));
    }
    Ok(())
}
