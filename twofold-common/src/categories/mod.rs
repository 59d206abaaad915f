use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::category::{Category, CategoryType};

pub const UNKNOWN_CATEGORY_KEY: &str = "categories.unknown";
pub const PRIVATE_CATEGORY_KEY: &str = "categories.private";

const NEUTRAL_COLOR: &str = "#9E9E9E";

pub struct DefaultCategory {
    pub id: Uuid,
    pub key: &'static str,
    pub category_type: CategoryType,
    pub color: &'static str,
}

const fn default_category(
    id: u128,
    key: &'static str,
    category_type: CategoryType,
    color: &'static str,
) -> DefaultCategory {
    DefaultCategory {
        id: Uuid::from_u128(id),
        key,
        category_type,
        color,
    }
}

pub const OTHER_EXPENSE_CATEGORY_ID: Uuid = Uuid::from_u128(0x1FF);
pub const OTHER_INCOME_CATEGORY_ID: Uuid = Uuid::from_u128(0x2FF);

// Synthetic ids for the placeholder categories. They never match a stored row.
pub const UNKNOWN_CATEGORY_ID: Uuid = Uuid::from_u128(0xF00);
pub const PRIVATE_CATEGORY_ID: Uuid = Uuid::from_u128(0xF01);

// Ids are part of the API contract. Never renumber an existing entry.
pub static DEFAULT_CATEGORIES: &[DefaultCategory] = &[
    default_category(0x101, "categories.groceries", CategoryType::Expense, "#4CAF50"),
    default_category(0x102, "categories.rent", CategoryType::Expense, "#795548"),
    default_category(0x103, "categories.utilities", CategoryType::Expense, "#FFC107"),
    default_category(0x104, "categories.transport", CategoryType::Expense, "#2196F3"),
    default_category(0x105, "categories.dining", CategoryType::Expense, "#FF5722"),
    default_category(0x106, "categories.entertainment", CategoryType::Expense, "#9C27B0"),
    default_category(0x107, "categories.health", CategoryType::Expense, "#E91E63"),
    default_category(0x108, "categories.shopping", CategoryType::Expense, "#00BCD4"),
    default_category(0x109, "categories.travel", CategoryType::Expense, "#3F51B5"),
    default_category(0x10A, "categories.subscriptions", CategoryType::Expense, "#673AB7"),
    default_category(0x10B, "categories.insurance", CategoryType::Expense, "#607D8B"),
    default_category(0x10C, "categories.education", CategoryType::Expense, "#8BC34A"),
    default_category(0x1FF, "categories.otherExpense", CategoryType::Expense, NEUTRAL_COLOR),
    default_category(0x201, "categories.salary", CategoryType::Income, "#2E7D32"),
    default_category(0x202, "categories.freelance", CategoryType::Income, "#00897B"),
    default_category(0x203, "categories.investments", CategoryType::Income, "#1565C0"),
    default_category(0x204, "categories.gifts", CategoryType::Income, "#AD1457"),
    default_category(0x2FF, "categories.otherIncome", CategoryType::Income, NEUTRAL_COLOR),
];

pub fn find_default_category(id: Uuid) -> Option<&'static DefaultCategory> {
    DEFAULT_CATEGORIES.iter().find(|c| c.id == id)
}

pub fn is_default_category(id: Uuid) -> bool {
    find_default_category(id).is_some()
}

/// A category as clients see it, regardless of whether it is built in or stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCategory {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub color: String,
    pub is_custom: bool,
}

impl ResolvedCategory {
    pub fn from_default(category: &DefaultCategory) -> Self {
        Self {
            id: category.id,
            user_id: None,
            created_by: None,
            name: String::from(category.key),
            category_type: category.category_type,
            color: String::from(category.color),
            is_custom: false,
        }
    }

    pub fn from_custom(category: Category) -> Self {
        Self {
            id: category.id,
            user_id: Some(category.user_id),
            created_by: Some(category.created_by),
            name: category.name,
            category_type: category.category_type,
            color: category.color,
            is_custom: true,
        }
    }

    pub fn unknown() -> Self {
        Self::placeholder(UNKNOWN_CATEGORY_ID, UNKNOWN_CATEGORY_KEY)
    }

    pub fn private() -> Self {
        Self::placeholder(PRIVATE_CATEGORY_ID, PRIVATE_CATEGORY_KEY)
    }

    fn placeholder(id: Uuid, key: &str) -> Self {
        Self {
            id,
            user_id: None,
            created_by: None,
            name: String::from(key),
            category_type: CategoryType::Expense,
            color: String::from(NEUTRAL_COLOR),
            is_custom: false,
        }
    }
}

/// Built-in categories carry a translation key as their name; custom names are shown as stored.
pub fn display_name<F>(category: &ResolvedCategory, translate: F) -> String
where
    F: Fn(&str) -> String,
{
    if category.is_custom {
        category.name.clone()
    } else {
        translate(&category.name)
    }
}

/// Merges the built-in categories with the custom ones visible to a user, sorted by name.
pub fn merge_categories(custom: Vec<Category>) -> Vec<ResolvedCategory> {
    let mut merged: Vec<ResolvedCategory> = DEFAULT_CATEGORIES
        .iter()
        .map(ResolvedCategory::from_default)
        .chain(custom.into_iter().map(ResolvedCategory::from_custom))
        .collect();

    merged.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });

    merged
}

pub struct CategoryIndex {
    categories: HashMap<Uuid, ResolvedCategory>,
}

impl CategoryIndex {
    pub fn new(custom: Vec<Category>) -> Self {
        let categories = DEFAULT_CATEGORIES
            .iter()
            .map(ResolvedCategory::from_default)
            .chain(custom.into_iter().map(ResolvedCategory::from_custom))
            .map(|c| (c.id, c))
            .collect();

        Self { categories }
    }

    pub fn get(&self, id: Uuid) -> Option<&ResolvedCategory> {
        self.categories.get(&id)
    }

    /// Like `get`, but stale references fall back to the unknown category instead of failing.
    pub fn resolve(&self, id: Uuid) -> ResolvedCategory {
        self.get(id).cloned().unwrap_or_else(ResolvedCategory::unknown)
    }
}
