//! Eligibility resolution against rules and national defaults.

use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{Datelike, NaiveDate};

use crate::error::CalendarError;
use crate::national::national_holidays;
use crate::rule::{CalendarConfig, RuleScope};

/// Search direction for [`Calendar::next_eligible_date`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Which kind of eligibility is being asked about.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Order,
    Delivery,
}

/// Bound on the day-walk. Exceeding it means the rule set closes
/// everything in reach, which is a configuration defect.
pub const MAX_SEARCH_DAYS: u32 = 60;

/// Calendar resolver.
///
/// Owns the validated rule set and a per-year cache of the national
/// holiday defaults (the movable dates are computed once per year).
#[derive(Debug)]
pub struct Calendar {
    config: CalendarConfig,
    national: RwLock<HashMap<i32, BTreeSet<NaiveDate>>>,
}

impl Calendar {
    /// Build a resolver, validating every configured rule.
    pub fn new(config: CalendarConfig) -> Result<Self, CalendarError> {
        for rule in &config.rules {
            rule.validate()?;
        }
        Ok(Self {
            config,
            national: RwLock::new(HashMap::new()),
        })
    }

    /// Whether an order may be placed on `date` at `scope`.
    pub fn is_order_day(&self, date: NaiveDate, scope: RuleScope) -> bool {
        !self.blocked(date, scope, Eligibility::Order)
    }

    /// Whether goods may be received on `date` at `scope`.
    pub fn is_delivery_day(&self, date: NaiveDate, scope: RuleScope) -> bool {
        !self.blocked(date, scope, Eligibility::Delivery)
    }

    /// Walk from `start` (inclusive) until an eligible day is found.
    ///
    /// Bounded at [`MAX_SEARCH_DAYS`] steps; exceeding the bound fails
    /// with `NoEligibleDateFound`.
    pub fn next_eligible_date(
        &self,
        start: NaiveDate,
        direction: Direction,
        eligibility: Eligibility,
        scope: RuleScope,
    ) -> Result<NaiveDate, CalendarError> {
        let mut current = start;
        for _ in 0..=MAX_SEARCH_DAYS {
            if !self.blocked(current, scope, eligibility) {
                return Ok(current);
            }
            let next = match direction {
                Direction::Forward => current.succ_opt(),
                Direction::Backward => current.pred_opt(),
            };
            match next {
                Some(day) => current = day,
                None => break,
            }
        }
        Err(CalendarError::NoEligibleDateFound {
            start,
            searched_days: MAX_SEARCH_DAYS,
        })
    }

    /// Explicit rules matching `date`+`scope` override the national
    /// defaults for that date; the defaults carry effect `Both`.
    fn blocked(&self, date: NaiveDate, scope: RuleScope, eligibility: Eligibility) -> bool {
        let mut any_explicit = false;
        for rule in &self.config.rules {
            if !rule.scope.covers(scope) || !rule.matches(date) {
                continue;
            }
            any_explicit = true;
            let blocks = match eligibility {
                Eligibility::Order => rule.effect.blocks_order(),
                Eligibility::Delivery => rule.effect.blocks_receipt(),
            };
            if blocks {
                return true;
            }
        }
        if any_explicit {
            return false;
        }
        self.is_national_holiday(date)
    }

    fn is_national_holiday(&self, date: NaiveDate) -> bool {
        let year = date.year();
        if let Ok(cache) = self.national.read() {
            if let Some(days) = cache.get(&year) {
                return days.contains(&date);
            }
        }
        let days = national_holidays(year);
        let hit = days.contains(&date);
        if let Ok(mut cache) = self.national.write() {
            cache.insert(year, days);
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{HolidayRule, RuleEffect, RuleKind};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn empty_calendar() -> Calendar {
        Calendar::new(CalendarConfig::default()).unwrap()
    }

    #[test]
    fn national_default_blocks_order_and_delivery() {
        let cal = empty_calendar();
        let christmas = date(2024, 12, 25);
        assert!(!cal.is_order_day(christmas, RuleScope::Supplier));
        assert!(!cal.is_delivery_day(christmas, RuleScope::Warehouse));
        assert!(cal.is_order_day(date(2024, 12, 27), RuleScope::Supplier));
    }

    #[test]
    fn easter_monday_is_blocked_by_default() {
        let cal = empty_calendar();
        assert!(!cal.is_delivery_day(date(2024, 4, 1), RuleScope::Warehouse));
    }

    #[test]
    fn explicit_rule_overrides_national_default() {
        // A receipt-only closure on Christmas: the default (Both) is
        // suppressed, so ordering becomes possible again.
        let cal = Calendar::new(CalendarConfig::new(vec![HolidayRule {
            name: "skeleton crew".to_owned(),
            scope: RuleScope::System,
            effect: RuleEffect::NoReceipt,
            kind: RuleKind::Single(date(2024, 12, 25)),
        }]))
        .unwrap();

        assert!(cal.is_order_day(date(2024, 12, 25), RuleScope::Supplier));
        assert!(!cal.is_delivery_day(date(2024, 12, 25), RuleScope::Warehouse));
    }

    #[test]
    fn scoped_rule_leaves_other_scopes_open() {
        let cal = Calendar::new(CalendarConfig::new(vec![HolidayRule {
            name: "store closed".to_owned(),
            scope: RuleScope::Store,
            effect: RuleEffect::Both,
            kind: RuleKind::Single(date(2024, 7, 10)),
        }]))
        .unwrap();

        assert!(!cal.is_order_day(date(2024, 7, 10), RuleScope::Store));
        assert!(cal.is_order_day(date(2024, 7, 10), RuleScope::Supplier));
    }

    #[test]
    fn walk_skips_closed_days_forward() {
        let cal = empty_calendar();
        // Christmas + St. Stephen closed, the 27th open.
        let found = cal
            .next_eligible_date(
                date(2024, 12, 25),
                Direction::Forward,
                Eligibility::Order,
                RuleScope::Supplier,
            )
            .unwrap();
        assert_eq!(found, date(2024, 12, 27));
    }

    #[test]
    fn walk_returns_start_when_already_eligible() {
        let cal = empty_calendar();
        let start = date(2024, 7, 9);
        let found = cal
            .next_eligible_date(start, Direction::Forward, Eligibility::Order, RuleScope::Supplier)
            .unwrap();
        assert_eq!(found, start);
    }

    #[test]
    fn walk_backward_finds_previous_open_day() {
        let cal = empty_calendar();
        let found = cal
            .next_eligible_date(
                date(2024, 12, 26),
                Direction::Backward,
                Eligibility::Delivery,
                RuleScope::Warehouse,
            )
            .unwrap();
        assert_eq!(found, date(2024, 12, 24));
    }

    #[test]
    fn fully_closed_window_reports_no_eligible_date() {
        let cal = Calendar::new(CalendarConfig::new(vec![HolidayRule {
            name: "long shutdown".to_owned(),
            scope: RuleScope::System,
            effect: RuleEffect::Both,
            kind: RuleKind::Range {
                from: date(2024, 1, 1),
                to: date(2024, 12, 31),
            },
        }]))
        .unwrap();

        let err = cal
            .next_eligible_date(
                date(2024, 6, 1),
                Direction::Forward,
                Eligibility::Order,
                RuleScope::Supplier,
            )
            .unwrap_err();
        assert!(matches!(err, CalendarError::NoEligibleDateFound { .. }));
    }

    #[test]
    fn invalid_rule_is_rejected_at_construction() {
        let result = Calendar::new(CalendarConfig::new(vec![HolidayRule {
            name: "bad".to_owned(),
            scope: RuleScope::System,
            effect: RuleEffect::Both,
            kind: RuleKind::Range {
                from: date(2024, 2, 2),
                to: date(2024, 1, 1),
            },
        }]));
        assert!(result.is_err());
    }
}
