//! Purchase proposal derivation.

use serde::{Deserialize, Serialize};

use restock_core::{SkuCode, SkuRecord};

use crate::average::SalesAverage;

/// Everything the proposal formula needs, gathered by the caller.
#[derive(Debug, Clone, Copy)]
pub struct ProposalInputs<'a> {
    pub sku: &'a SkuRecord,
    pub on_hand: i64,
    pub on_order: i64,
    pub average: SalesAverage,
    pub global_boost_percent: u8,
}

/// A proposed order quantity with every intermediate stage exposed,
/// so presentation callers can explain the number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalBreakdown {
    pub sku: SkuCode,
    pub daily_sales_avg: f64,
    /// Boost percent actually applied; `None` when no out-of-stock days
    /// were observed in the averaging window.
    pub boost_percent_applied: Option<u8>,
    /// Demand forecast over lead time + review period, boost included.
    pub forecast: f64,
    /// Forecast plus safety stock.
    pub order_up_to_level: f64,
    /// Shortfall against the current position, floored at zero.
    pub base_requirement: f64,
    pub pack_rounded: i64,
    pub after_moq: i64,
    pub proposed_qty: i64,
    /// The max-stock cap reduced the quantity. A capped quantity may
    /// break pack alignment; it is clamped, not re-rounded.
    pub capped: bool,
    pub insufficient_data: bool,
}

/// Smallest multiple of `pack_size` at or above `units`. Both operands
/// are positive by the time this runs.
fn next_pack_multiple(units: i64, pack_size: i64) -> i64 {
    (units + pack_size - 1) / pack_size * pack_size
}

/// Round a fractional requirement up to a whole number of packs.
fn round_up_to_pack(requirement: f64, pack_size: i64) -> i64 {
    if requirement <= 0.0 {
        return 0;
    }
    next_pack_multiple(requirement.ceil() as i64, pack_size)
}

/// Derive the proposed order quantity.
///
/// Stages: forecast demand over lead time + review period, boost it
/// when out-of-stock days censored the average, add safety stock,
/// subtract the current position, round up to whole packs, lift to the
/// MOQ (kept pack-aligned), and finally cap against max stock.
pub fn generate_proposal(inputs: ProposalInputs<'_>) -> ProposalBreakdown {
    let sku = inputs.sku;
    // Catalog inserts enforce pack_size >= 1; hand-built records may
    // not, and the rounding below divides by it.
    let pack_size = sku.pack_size.max(1);
    let position = inputs.on_hand + inputs.on_order;

    let horizon = f64::from(sku.lead_time_days) + f64::from(sku.review_period_days);
    let mut forecast = inputs.average.per_day * horizon;

    let boost_percent_applied = if inputs.average.oos_days > 0 {
        let percent = sku.oos_boost.effective_percent(inputs.global_boost_percent);
        forecast *= 1.0 + f64::from(percent) / 100.0;
        Some(percent)
    } else {
        None
    };

    let order_up_to_level = forecast + sku.safety_stock as f64;
    let base_requirement = (order_up_to_level - position as f64).max(0.0);

    let pack_rounded = round_up_to_pack(base_requirement, pack_size);

    let after_moq = if pack_rounded > 0 && pack_rounded < sku.moq {
        // Smallest pack multiple satisfying the MOQ; a zero proposal
        // stays zero.
        next_pack_multiple(sku.moq, pack_size)
    } else {
        pack_rounded
    };

    let proposed_qty = if position + after_moq > sku.max_stock {
        (sku.max_stock - position).max(0)
    } else {
        after_moq
    };

    ProposalBreakdown {
        sku: sku.code.clone(),
        daily_sales_avg: inputs.average.per_day,
        boost_percent_applied,
        forecast,
        order_up_to_level,
        base_requirement,
        pack_rounded,
        after_moq,
        proposed_qty,
        capped: proposed_qty != after_moq,
        insufficient_data: inputs.average.insufficient_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use restock_core::{Boost, DemandVariability, SupplierId};

    fn test_sku() -> SkuRecord {
        SkuRecord {
            code: SkuCode::new("WIDGET-01").unwrap(),
            description: "test product".to_owned(),
            ean: None,
            moq: 12,
            pack_size: 6,
            lead_time_days: 7,
            review_period_days: 14,
            safety_stock: 20,
            max_stock: 200,
            reorder_point: 0,
            supplier: SupplierId::new(),
            demand_variability: DemandVariability::Medium,
            oos_boost: Boost::Inherit,
        }
    }

    fn average(per_day: f64, oos_days: u32) -> SalesAverage {
        SalesAverage {
            per_day,
            window_days: 30,
            oos_days,
            insufficient_data: false,
        }
    }

    #[test]
    fn reference_scenario_proposes_sixty() {
        let sku = test_sku();
        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 30,
            on_order: 40,
            average: average(5.0, 0),
            global_boost_percent: 0,
        });

        assert_eq!(breakdown.forecast, 105.0);
        assert_eq!(breakdown.order_up_to_level, 125.0);
        assert_eq!(breakdown.base_requirement, 55.0);
        assert_eq!(breakdown.pack_rounded, 60);
        assert_eq!(breakdown.after_moq, 60);
        assert_eq!(breakdown.proposed_qty, 60);
        assert!(!breakdown.capped);
        assert_eq!(breakdown.boost_percent_applied, None);
    }

    #[test]
    fn boost_applies_only_when_oos_days_observed() {
        let sku = test_sku();
        let boosted = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 0,
            on_order: 0,
            average: average(5.0, 3),
            global_boost_percent: 20,
        });
        assert_eq!(boosted.boost_percent_applied, Some(20));
        assert_eq!(boosted.forecast, 126.0);

        let calm = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 0,
            on_order: 0,
            average: average(5.0, 0),
            global_boost_percent: 20,
        });
        assert_eq!(calm.boost_percent_applied, None);
        assert_eq!(calm.forecast, 105.0);
    }

    #[test]
    fn per_sku_override_beats_the_global_boost() {
        let mut sku = test_sku();
        sku.oos_boost = Boost::Override(50);

        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 0,
            on_order: 0,
            average: average(4.0, 1),
            global_boost_percent: 10,
        });
        assert_eq!(breakdown.boost_percent_applied, Some(50));
        assert_eq!(breakdown.forecast, 126.0);
    }

    #[test]
    fn explicit_zero_override_suppresses_the_global_boost() {
        let mut sku = test_sku();
        sku.oos_boost = Boost::Override(0);

        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 0,
            on_order: 0,
            average: average(4.0, 1),
            global_boost_percent: 10,
        });
        assert_eq!(breakdown.boost_percent_applied, Some(0));
        assert_eq!(breakdown.forecast, 84.0);
    }

    #[test]
    fn covered_position_proposes_zero() {
        let sku = test_sku();
        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 100,
            on_order: 100,
            average: average(5.0, 0),
            global_boost_percent: 0,
        });
        assert_eq!(breakdown.base_requirement, 0.0);
        assert_eq!(breakdown.proposed_qty, 0);
        assert!(!breakdown.capped);
    }

    #[test]
    fn small_requirements_are_lifted_to_the_moq() {
        let sku = test_sku();
        // S = 20 (safety stock only, no demand); position 14 -> base 6.
        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 14,
            on_order: 0,
            average: average(0.0, 0),
            global_boost_percent: 0,
        });
        assert_eq!(breakdown.pack_rounded, 6);
        assert_eq!(breakdown.after_moq, 12);
        assert_eq!(breakdown.proposed_qty, 12);
    }

    #[test]
    fn moq_lift_stays_pack_aligned() {
        let mut sku = test_sku();
        sku.moq = 13;

        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 14,
            on_order: 0,
            average: average(0.0, 0),
            global_boost_percent: 0,
        });
        // 13 rounded up to the next multiple of 6.
        assert_eq!(breakdown.after_moq, 18);
        assert_eq!(breakdown.proposed_qty % sku.pack_size, 0);
    }

    #[test]
    fn exact_pack_multiples_are_left_alone() {
        let sku = test_sku();
        // S = 20, position 8 -> base 12, already two whole packs.
        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 8,
            on_order: 0,
            average: average(0.0, 0),
            global_boost_percent: 0,
        });
        assert_eq!(breakdown.pack_rounded, 12);
        assert_eq!(breakdown.proposed_qty, 12);
    }

    #[test]
    fn unvalidated_pack_size_rounds_as_single_units() {
        let mut sku = test_sku();
        sku.pack_size = 0;

        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 14,
            on_order: 0,
            average: average(0.0, 0),
            global_boost_percent: 0,
        });
        assert_eq!(breakdown.pack_rounded, 6);
        assert_eq!(breakdown.after_moq, 12);
        assert_eq!(breakdown.proposed_qty, 12);
    }

    #[test]
    fn cap_clamps_without_re_rounding() {
        let mut sku = test_sku();
        sku.max_stock = 100;

        // base 55 -> pack-rounded 60, but only 30 fit under the cap.
        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 30,
            on_order: 40,
            average: average(5.0, 0),
            global_boost_percent: 0,
        });
        assert_eq!(breakdown.pack_rounded, 60);
        assert_eq!(breakdown.proposed_qty, 30);
        assert!(breakdown.capped);
    }

    #[test]
    fn cap_never_goes_below_zero() {
        let mut sku = test_sku();
        sku.max_stock = 50;

        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 60,
            on_order: 0,
            average: average(5.0, 0),
            global_boost_percent: 0,
        });
        assert_eq!(breakdown.proposed_qty, 0);
        assert!(breakdown.capped);
    }

    #[test]
    fn insufficient_data_flag_rides_along() {
        let sku = test_sku();
        let breakdown = generate_proposal(ProposalInputs {
            sku: &sku,
            on_hand: 0,
            on_order: 0,
            average: SalesAverage {
                per_day: 0.0,
                window_days: 30,
                oos_days: 30,
                insufficient_data: true,
            },
            global_boost_percent: 0,
        });
        assert!(breakdown.insufficient_data);
        // Safety stock still drives a proposal; the flag is advisory.
        assert_eq!(breakdown.proposed_qty, 24);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the proposal is non-negative, never busts the
        /// max-stock cap, and stays pack-aligned and MOQ-respecting
        /// whenever the cap did not clamp it.
        #[test]
        fn proposal_invariants_hold(
            pack_size in 1i64..20,
            moq in 0i64..40,
            lead_time_days in 0u32..30,
            review_period_days in 0u32..30,
            safety_stock in 0i64..50,
            headroom in 0i64..300,
            on_hand in -50i64..200,
            on_order in 0i64..200,
            per_day in 0.0f64..20.0,
            oos_days in 0u32..10,
        ) {
            let sku = SkuRecord {
                code: SkuCode::new("PROP-SKU").unwrap(),
                description: "property sku".to_owned(),
                ean: None,
                moq,
                pack_size,
                lead_time_days,
                review_period_days,
                safety_stock,
                max_stock: moq + headroom,
                reorder_point: 0,
                supplier: SupplierId::new(),
                demand_variability: DemandVariability::High,
                oos_boost: Boost::Inherit,
            };
            let breakdown = generate_proposal(ProposalInputs {
                sku: &sku,
                on_hand,
                on_order,
                average: SalesAverage {
                    per_day,
                    window_days: 30,
                    oos_days,
                    insufficient_data: false,
                },
                global_boost_percent: 15,
            });

            prop_assert!(breakdown.proposed_qty >= 0);
            if breakdown.proposed_qty > 0 {
                prop_assert!(on_hand + on_order + breakdown.proposed_qty <= sku.max_stock);
            }
            if !breakdown.capped {
                prop_assert_eq!(breakdown.proposed_qty % pack_size, 0);
                if breakdown.proposed_qty > 0 {
                    prop_assert!(breakdown.proposed_qty >= moq);
                }
            }
        }
    }
}
