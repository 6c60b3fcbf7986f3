//! `restock-calendar` — order/delivery-day eligibility.
//!
//! Answers "can we place an order on date D" and "can goods arrive on
//! date D" given a static set of holiday rules plus the automatic
//! national-holiday defaults. Pure date logic; no engine state.

pub mod error;
pub mod national;
pub mod resolver;
pub mod rule;

pub use error::CalendarError;
pub use resolver::{Calendar, Direction, Eligibility};
pub use rule::{CalendarConfig, HolidayRule, RuleEffect, RuleKind, RuleScope};
