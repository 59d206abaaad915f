use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::categories::{CategoryIndex, ResolvedCategory};
use crate::models::category::CategoryType;
use crate::models::transaction::{RepeatType, Transaction};
use crate::money;
use crate::recurrence;

// Rows written by the old recurrence implementation carry one of these markers
pub const LEGACY_DESCRIPTION_MARKERS: [&str; 2] = ["(Monthly Budget)", "(Annual Renewal)"];

/// First and last day of a month given as a 0-indexed month (0 is January).
pub fn month_bounds(year: i32, month0: u32) -> Option<(NaiveDate, NaiveDate)> {
    let month = month0.checked_add(1)?;
    let first = recurrence::first_day_of_month(year, month)?;
    let last = recurrence::last_day_of_month(year, month)?;
    Some((first, last))
}

/// Whether a transaction belongs to a month's view. Annual rows appear in their renewal month
/// of every year; everything else has to be dated within the month.
pub fn in_monthly_set(transaction: &Transaction, year: i32, month0: u32) -> bool {
    if transaction.repeat_type == Some(RepeatType::Annual) {
        return transaction.date.month0() == month0;
    }

    transaction.date.year() == year && transaction.date.month0() == month0
}

pub fn is_legacy_residue(description: &str) -> bool {
    LEGACY_DESCRIPTION_MARKERS
        .iter()
        .any(|marker| description.contains(marker))
}

/// The partner's private rows are counted but their category is not disclosed.
pub fn is_hidden_from(transaction: &Transaction, viewer: Uuid) -> bool {
    transaction.is_private && transaction.created_by != viewer
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Balance {
    #[serde(with = "money::as_decimal")]
    pub balance: i64,
    #[serde(with = "money::as_decimal")]
    pub income: i64,
    #[serde(with = "money::as_decimal")]
    pub expenses: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub category: ResolvedCategory,
    #[serde(with = "money::as_decimal")]
    pub total: i64,
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub balance: Balance,
    pub category_breakdown: Vec<BreakdownEntry>,
}

/// Totals a month's transactions as seen by `viewer`. Transactions whose category no longer
/// resolves are left out of every total.
pub fn summarize<'a, I>(transactions: I, categories: &CategoryIndex, viewer: Uuid) -> MonthlySummary
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut balance = Balance::default();
    let mut breakdown: HashMap<Uuid, BreakdownEntry> = HashMap::new();

    for transaction in transactions {
        if is_legacy_residue(&transaction.description) {
            continue;
        }

        let Some(category) = categories.get(transaction.category_id) else {
            continue;
        };

        match category.category_type {
            CategoryType::Income => balance.income += transaction.amount_cents,
            CategoryType::Expense => {
                balance.expenses += transaction.amount_cents;

                let bucket = if is_hidden_from(transaction, viewer) {
                    ResolvedCategory::private()
                } else {
                    category.clone()
                };

                let entry = breakdown.entry(bucket.id).or_insert_with(|| BreakdownEntry {
                    category: bucket,
                    total: 0,
                    count: 0,
                });

                entry.total += transaction.amount_cents;
                entry.count += 1;
            }
        }
    }

    balance.balance = balance.income - balance.expenses;

    let mut category_breakdown: Vec<BreakdownEntry> = breakdown.into_values().collect();
    category_breakdown.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| b.count.cmp(&a.count))
            .then_with(|| a.category.name.cmp(&b.category.name))
    });

    MonthlySummary {
        balance,
        category_breakdown,
    }
}
