//! Inventory projection to a target receipt date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use restock_core::{DomainError, DomainResult};

/// A future receipt expected to land (typically an open order's
/// remaining quantity at its expected receipt date).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedReceipt {
    pub receipt_date: NaiveDate,
    pub qty: i64,
    /// When set, the lot is unusable for demand past this date.
    #[serde(default)]
    pub lot_expiry: Option<NaiveDate>,
}

/// Project `on_hand` forward from `asof` to `target`, draining the
/// daily forecast and landing expected receipts.
///
/// A receipt counts only if it lands on or before `target` and its lot
/// (when tracked) is still usable at `target`; a lot cannot satisfy
/// demand scheduled after its expiry. The fractional forecast drain is
/// floored away, which errs toward proposing more rather than less.
pub fn projected_inventory_position(
    on_hand: i64,
    asof: NaiveDate,
    target: NaiveDate,
    daily_forecast: f64,
    expected_receipts: &[ExpectedReceipt],
) -> DomainResult<i64> {
    if target < asof {
        return Err(DomainError::validation(
            "target date cannot precede the asof date",
        ));
    }

    let days = (target - asof).num_days();
    let landed: i64 = expected_receipts
        .iter()
        .filter(|receipt| {
            receipt.receipt_date <= target
                && receipt.lot_expiry.is_none_or(|expiry| expiry >= target)
        })
        .map(|receipt| receipt.qty)
        .sum();

    let projected = on_hand as f64 - days as f64 * daily_forecast + landed as f64;
    Ok(projected.floor() as i64)
}
