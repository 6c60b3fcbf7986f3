//! As-of replay of the ledger.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use restock_core::SkuCode;

use crate::transaction::{PostedTransaction, TxKind};

/// Data-integrity signal raised during replay.
///
/// Never clamped away: the derived value stays negative and the
/// anomaly rides along on the snapshot for the caller (and the store's
/// logging) to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayAnomaly {
    NegativeOnHand {
        event_date: NaiveDate,
        seq: u64,
        on_hand: i64,
    },
    NegativeOnOrder {
        event_date: NaiveDate,
        seq: u64,
        on_order: i64,
    },
}

impl core::fmt::Display for ReplayAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReplayAnomaly::NegativeOnHand {
                event_date,
                seq,
                on_hand,
            } => write!(
                f,
                "on_hand went negative ({on_hand}) at {event_date} (seq {seq})"
            ),
            ReplayAnomaly::NegativeOnOrder {
                event_date,
                seq,
                on_order,
            } => write!(
                f,
                "on_order went negative ({on_order}) at {event_date} (seq {seq})"
            ),
        }
    }
}

/// Point-in-time stock position, derived and ephemeral.
///
/// Recomputed per query; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub sku: SkuCode,
    pub asof: NaiveDate,
    pub on_hand: i64,
    pub on_order: i64,
    pub unfulfilled_qty: i64,
    pub anomalies: Vec<ReplayAnomaly>,
}

impl StockSnapshot {
    pub fn empty(sku: SkuCode, asof: NaiveDate) -> Self {
        Self {
            sku,
            asof,
            on_hand: 0,
            on_order: 0,
            unfulfilled_qty: 0,
            anomalies: Vec::new(),
        }
    }

    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }
}

/// Running position used by the fold.
#[derive(Debug, Default, Clone, Copy)]
struct Position {
    on_hand: i64,
    on_order: i64,
    unfulfilled: i64,
}

impl Position {
    fn apply(&mut self, tx: &PostedTransaction) {
        match tx.kind() {
            TxKind::Sale => self.on_hand -= tx.qty(),
            TxKind::Receipt => {
                self.on_hand += tx.qty();
                // Free-stock receipts have no order_placed to cancel.
                if tx.order_id().is_some() {
                    self.on_order -= tx.qty();
                }
            }
            TxKind::Adjustment => self.on_hand += tx.qty(),
            TxKind::OrderPlaced => self.on_order += tx.qty(),
            TxKind::Unfulfilled => self.unfulfilled += tx.qty(),
        }
    }
}

/// Transactions for `sku` with `event_date <= asof`, in replay order.
fn in_replay_order<'a>(
    entries: &'a [PostedTransaction],
    sku: &SkuCode,
    asof: NaiveDate,
) -> Vec<&'a PostedTransaction> {
    let mut relevant: Vec<&PostedTransaction> = entries
        .iter()
        .filter(|tx| tx.sku() == sku && tx.event_date() <= asof)
        .collect();
    relevant.sort_by_key(|tx| (tx.event_date(), tx.seq()));
    relevant
}

/// Derive the stock position of `sku` as of end-of-day `asof`.
///
/// Pure fold over the ledger in `(event_date, seq)` order; idempotent
/// and side-effect-free.
pub fn replay(entries: &[PostedTransaction], sku: &SkuCode, asof: NaiveDate) -> StockSnapshot {
    let mut snapshot = StockSnapshot::empty(sku.clone(), asof);
    let mut position = Position::default();

    for tx in in_replay_order(entries, sku, asof) {
        let before = position;
        position.apply(tx);
        if position.on_hand < 0 && before.on_hand >= 0 {
            snapshot.anomalies.push(ReplayAnomaly::NegativeOnHand {
                event_date: tx.event_date(),
                seq: tx.seq(),
                on_hand: position.on_hand,
            });
        }
        if position.on_order < 0 && before.on_order >= 0 {
            snapshot.anomalies.push(ReplayAnomaly::NegativeOnOrder {
                event_date: tx.event_date(),
                seq: tx.seq(),
                on_order: position.on_order,
            });
        }
    }

    snapshot.on_hand = position.on_hand;
    snapshot.on_order = position.on_order;
    snapshot.unfulfilled_qty = position.unfulfilled;
    snapshot
}

/// Calendar days in `from..=to` where `sku` ends the day with
/// `on_hand + on_order == 0`.
///
/// Used to censor out-of-stock days from demand averaging.
pub fn days_out_of_stock(
    entries: &[PostedTransaction],
    sku: &SkuCode,
    from: NaiveDate,
    to: NaiveDate,
) -> BTreeSet<NaiveDate> {
    let mut days = BTreeSet::new();
    if from > to {
        return days;
    }

    let ordered = in_replay_order(entries, sku, to);
    let mut position = Position::default();
    let mut idx = 0;

    // Opening position: everything strictly before the window.
    while idx < ordered.len() && ordered[idx].event_date() < from {
        position.apply(ordered[idx]);
        idx += 1;
    }

    for day in from.iter_days() {
        if day > to {
            break;
        }
        while idx < ordered.len() && ordered[idx].event_date() == day {
            position.apply(ordered[idx]);
            idx += 1;
        }
        if position.on_hand + position.on_order == 0 {
            days.insert(day);
        }
    }

    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::DraftTransaction;
    use chrono::{Days, Utc};
    use proptest::prelude::*;
    use restock_core::OrderId;

    fn test_sku() -> SkuCode {
        SkuCode::new("WIDGET-01").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn posted(draft: DraftTransaction, seq: u64) -> PostedTransaction {
        PostedTransaction::post(draft, seq, Utc::now()).unwrap()
    }

    #[test]
    fn fold_applies_each_kind() {
        let sku = test_sku();
        let order = OrderId::new();
        let entries = vec![
            posted(
                DraftTransaction::new(sku.clone(), TxKind::OrderPlaced, 40, date(2024, 1, 2))
                    .with_order(order),
                1,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 40, date(2024, 1, 5))
                    .with_order(order),
                2,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Sale, 12, date(2024, 1, 6)),
                3,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Adjustment, -3, date(2024, 1, 7)),
                4,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Unfulfilled, 2, date(2024, 1, 8)),
                5,
            ),
        ];

        let snapshot = replay(&entries, &sku, date(2024, 1, 31));
        assert_eq!(snapshot.on_hand, 25);
        assert_eq!(snapshot.on_order, 0);
        assert_eq!(snapshot.unfulfilled_qty, 2);
        assert!(!snapshot.has_anomalies());
    }

    #[test]
    fn unlinked_receipt_leaves_on_order_alone() {
        let sku = test_sku();
        let entries = vec![posted(
            DraftTransaction::new(sku.clone(), TxKind::Receipt, 10, date(2024, 1, 5)),
            1,
        )];

        let snapshot = replay(&entries, &sku, date(2024, 1, 31));
        assert_eq!(snapshot.on_hand, 10);
        assert_eq!(snapshot.on_order, 0);
        assert!(!snapshot.has_anomalies());
    }

    #[test]
    fn asof_excludes_later_events() {
        let sku = test_sku();
        let entries = vec![
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 10, date(2024, 1, 5)),
                1,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Sale, 4, date(2024, 1, 20)),
                2,
            ),
        ];

        let snapshot = replay(&entries, &sku, date(2024, 1, 10));
        assert_eq!(snapshot.on_hand, 10);
    }

    #[test]
    fn other_skus_do_not_contribute() {
        let sku = test_sku();
        let other = SkuCode::new("GADGET-02").unwrap();
        let entries = vec![
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 10, date(2024, 1, 5)),
                1,
            ),
            posted(
                DraftTransaction::new(other, TxKind::Receipt, 99, date(2024, 1, 5)),
                2,
            ),
        ];

        let snapshot = replay(&entries, &sku, date(2024, 1, 31));
        assert_eq!(snapshot.on_hand, 10);
    }

    #[test]
    fn same_day_ties_break_by_insertion_sequence() {
        let sku = test_sku();
        // Sale posted before the covering receipt on the same day: the
        // position dips negative mid-day and that crossing is recorded.
        let entries = vec![
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Sale, 5, date(2024, 1, 5)),
                1,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 5, date(2024, 1, 5)),
                2,
            ),
        ];

        let snapshot = replay(&entries, &sku, date(2024, 1, 5));
        assert_eq!(snapshot.on_hand, 0);
        assert_eq!(
            snapshot.anomalies,
            vec![ReplayAnomaly::NegativeOnHand {
                event_date: date(2024, 1, 5),
                seq: 1,
                on_hand: -5,
            }]
        );
    }

    #[test]
    fn negative_on_hand_is_surfaced_not_clamped() {
        let sku = test_sku();
        let entries = vec![posted(
            DraftTransaction::new(sku.clone(), TxKind::Sale, 7, date(2024, 1, 5)),
            1,
        )];

        let snapshot = replay(&entries, &sku, date(2024, 1, 31));
        assert_eq!(snapshot.on_hand, -7);
        assert!(snapshot.has_anomalies());
    }

    #[test]
    fn oos_days_require_zero_on_hand_and_on_order() {
        let sku = test_sku();
        let order = OrderId::new();
        let entries = vec![
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 5, date(2024, 1, 1)),
                1,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Sale, 5, date(2024, 1, 3)),
                2,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::OrderPlaced, 10, date(2024, 1, 6))
                    .with_order(order),
                3,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 10, date(2024, 1, 8))
                    .with_order(order),
                4,
            ),
        ];

        let days = days_out_of_stock(&entries, &sku, date(2024, 1, 1), date(2024, 1, 10));
        let expected: BTreeSet<NaiveDate> =
            [date(2024, 1, 3), date(2024, 1, 4), date(2024, 1, 5)]
                .into_iter()
                .collect();
        assert_eq!(days, expected);
    }

    #[test]
    fn oos_window_sees_opening_position_from_before() {
        let sku = test_sku();
        // Sold out before the window opens; restocked on the 4th.
        let entries = vec![
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 3, date(2023, 12, 1)),
                1,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Sale, 3, date(2023, 12, 20)),
                2,
            ),
            posted(
                DraftTransaction::new(sku.clone(), TxKind::Receipt, 8, date(2024, 1, 4)),
                3,
            ),
        ];

        let days = days_out_of_stock(&entries, &sku, date(2024, 1, 1), date(2024, 1, 6));
        let expected: BTreeSet<NaiveDate> =
            [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)]
                .into_iter()
                .collect();
        assert_eq!(days, expected);
    }

    #[test]
    fn inverted_range_yields_no_days() {
        let sku = test_sku();
        let days = days_out_of_stock(&[], &sku, date(2024, 1, 10), date(2024, 1, 1));
        assert!(days.is_empty());
    }

    fn arb_entries() -> impl Strategy<Value = Vec<PostedTransaction>> {
        prop::collection::vec(
            (0u8..5, 1i64..100, 0u64..30, any::<bool>()),
            0..40,
        )
        .prop_map(|raw| {
            let sku = test_sku();
            let base = date(2024, 1, 1);
            raw.into_iter()
                .enumerate()
                .map(|(seq, (kind_sel, qty, day_offset, flag))| {
                    let event_date = base
                        .checked_add_days(Days::new(day_offset))
                        .unwrap();
                    let draft = match kind_sel {
                        0 => DraftTransaction::new(sku.clone(), TxKind::Sale, qty, event_date),
                        1 => {
                            let draft = DraftTransaction::new(
                                sku.clone(),
                                TxKind::Receipt,
                                qty,
                                event_date,
                            );
                            if flag {
                                draft.with_order(OrderId::new())
                            } else {
                                draft
                            }
                        }
                        2 => DraftTransaction::new(
                            sku.clone(),
                            TxKind::Adjustment,
                            if flag { qty } else { -qty },
                            event_date,
                        ),
                        3 => DraftTransaction::new(
                            sku.clone(),
                            TxKind::OrderPlaced,
                            qty,
                            event_date,
                        )
                        .with_order(OrderId::new()),
                        _ => DraftTransaction::new(
                            sku.clone(),
                            TxKind::Unfulfilled,
                            qty,
                            event_date,
                        ),
                    };
                    posted(draft, seq as u64)
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: replay is a pure function of the persisted entries;
        /// running it twice yields identical snapshots.
        #[test]
        fn replay_is_deterministic(entries in arb_entries()) {
            let sku = test_sku();
            let asof = date(2024, 2, 15);
            let first = replay(&entries, &sku, asof);
            let second = replay(&entries, &sku, asof);
            prop_assert_eq!(first, second);
        }

        /// Property: replay order comes from (event_date, seq), so the
        /// physical order of the entries slice is irrelevant.
        #[test]
        fn replay_ignores_physical_entry_order(entries in arb_entries()) {
            let sku = test_sku();
            let asof = date(2024, 2, 15);
            let forward = replay(&entries, &sku, asof);

            let mut reversed = entries;
            reversed.reverse();
            let backward = replay(&reversed, &sku, asof);

            prop_assert_eq!(forward, backward);
        }
    }
}
