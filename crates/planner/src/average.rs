//! Calendar-based daily sales average with out-of-stock censoring.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use restock_core::SkuCode;
use restock_ledger::{days_out_of_stock, PostedTransaction, TxKind};

/// Result of a demand-average computation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesAverage {
    /// Average units sold per in-stock day.
    pub per_day: f64,
    pub window_days: u32,
    pub oos_days: u32,
    /// Set when the whole window was out of stock: there was no day the
    /// product could have sold, so `per_day` is `0.0` by construction
    /// and says nothing about demand.
    pub insufficient_data: bool,
}

/// Average daily sales for `sku` over the trailing `lookback_days`
/// calendar days ending at `asof` (inclusive).
///
/// Days where the product was out of stock are excluded from the
/// denominator: zero sales on a day the shelf was empty is censored
/// demand, not observed demand. Days with stock but no sales count as
/// genuine zero-sales days.
pub fn daily_sales_average(
    entries: &[PostedTransaction],
    sku: &SkuCode,
    asof: NaiveDate,
    lookback_days: u32,
) -> SalesAverage {
    let window_start = asof
        .checked_sub_days(Days::new(u64::from(lookback_days.saturating_sub(1))))
        .unwrap_or(NaiveDate::MIN);

    let sold: i64 = entries
        .iter()
        .filter(|tx| {
            tx.sku() == sku
                && tx.kind() == TxKind::Sale
                && tx.event_date() >= window_start
                && tx.event_date() <= asof
        })
        .map(PostedTransaction::qty)
        .sum();

    let oos_days = days_out_of_stock(entries, sku, window_start, asof).len() as u32;
    let selling_days = lookback_days.saturating_sub(oos_days);

    if selling_days == 0 {
        return SalesAverage {
            per_day: 0.0,
            window_days: lookback_days,
            oos_days,
            insufficient_data: true,
        };
    }

    SalesAverage {
        per_day: sold as f64 / f64::from(selling_days),
        window_days: lookback_days,
        oos_days,
        insufficient_data: false,
    }
}
