//! Date arithmetic for recurring transactions.
//!
//! Monthly rules are ordinary transaction rows reused as templates: on the first day of each
//! month the materializer copies every active template into a concrete `once` row dated in the
//! current month. Annual rows are never copied; their date is rolled forward in place.

use chrono::{Datelike, Months, NaiveDate};

use crate::models::transaction::{RepeatType, Transaction};

/// Legacy rows have no repeat type and are treated as monthly.
pub fn is_monthly_recurring(repeat_type: Option<RepeatType>) -> bool {
    repeat_type.map_or(true, |r| r.is_monthly())
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    last_day_of_month(year, month).map_or(28, |d| d.day())
}

pub fn first_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first = first_day_of_month(year, month)?;
    first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.pred_opt())
}

/// Builds a date, clamping `day` to the length of the month (31 becomes 30 in April, etc).
pub fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// End date for limited-duration rules created without one. The template's own month counts
/// as the first occurrence, so a 3-month rule starting in January ends in March.
pub fn default_end_date(repeat_type: RepeatType, start: NaiveDate) -> Option<NaiveDate> {
    let months = repeat_type.limited_months()?;
    add_months(start, months - 1)
}

pub fn should_run_today(today: NaiveDate) -> bool {
    today.day() == 1
}

/// The date of this month's occurrence of a monthly template.
pub fn occurrence_date(template_date: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    clamped_date(today.year(), today.month(), template_date.day())
}

/// A template spawns an occurrence this month if its rule has started and not yet ended.
pub fn template_is_active(template: &Transaction, today: NaiveDate) -> bool {
    if let Some(end_date) = template.end_date {
        if today > end_date {
            return false;
        }
    }

    match last_day_of_month(today.year(), today.month()) {
        Some(month_end) => template.date <= month_end,
        None => false,
    }
}

/// Next renewal date for an annual row whose renewal month has passed, or `None` if the stored
/// date is still current.
pub fn annual_rollover_date(stored: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    let year_behind = stored.year() < today.year();
    let month_passed = today.month() > stored.month();

    if !(year_behind || (stored.year() == today.year() && month_passed)) {
        return None;
    }

    let target_year = if month_passed {
        today.year() + 1
    } else {
        today.year()
    };

    clamped_date(target_year, stored.month(), stored.day())
}
