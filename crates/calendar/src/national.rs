//! Automatic national-holiday defaults.
//!
//! Fixed civil holidays plus the movable paschal pair (Easter Sunday
//! and Easter Monday). These act as the baseline closure set; an
//! explicit rule matching the same date overrides them.

use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Fixed national holidays as (month, day).
const FIXED_HOLIDAYS: [(u32, u32); 10] = [
    (1, 1),   // New Year's Day
    (1, 6),   // Epiphany
    (4, 25),  // Liberation Day
    (5, 1),   // Labour Day
    (6, 2),   // Republic Day
    (8, 15),  // Assumption
    (11, 1),  // All Saints
    (12, 8),  // Immaculate Conception
    (12, 25), // Christmas
    (12, 26), // St. Stephen
];

/// Easter Sunday for `year`, by the Meeus/Jones/Butcher algorithm.
///
/// `None` only when the result falls outside chrono's representable
/// range, which no reachable query year does.
pub fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// All national holidays for `year`, movable dates included.
pub fn national_holidays(year: i32) -> BTreeSet<NaiveDate> {
    let mut days: BTreeSet<NaiveDate> = FIXED_HOLIDAYS
        .iter()
        .filter_map(|&(month, day)| NaiveDate::from_ymd_opt(year, month, day))
        .collect();

    if let Some(sunday) = easter_sunday(year) {
        days.insert(sunday);
        if let Some(monday) = sunday.succ_opt() {
            days.insert(monday);
        }
    }

    days
}
