use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::category::CategoryType;
use crate::models::transaction::RepeatType;
use crate::validators::{self, Validity};
use crate::{money, recurrence};

/// A rejected input field, reported back to the client as `{field, message}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn check(errors: &mut Vec<FieldError>, field: &'static str, validity: Validity) {
    if let Validity::Invalid(message) = validity {
        errors.push(FieldError::new(field, message));
    }
}

fn into_result(errors: Vec<FieldError>) -> Result<(), Vec<FieldError>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn price_cents(
    errors: &mut Vec<FieldError>,
    field: &'static str,
    price: Option<f64>,
) -> Option<i64> {
    let price = price?;
    let cents = money::cents_from_decimal(price);

    if cents.is_none() {
        errors.push(FieldError::new(field, "Price must be a positive amount."));
    }

    cents
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialPair {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub currency: Option<String>,
}

impl InputRegistration {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        check(&mut errors, "name", validators::validate_name(&self.name));
        check(
            &mut errors,
            "email",
            validators::validate_email_address(&self.email),
        );
        check(
            &mut errors,
            "password",
            validators::validate_password(&self.password),
        );

        if let Some(currency) = &self.currency {
            check(&mut errors, "currency", validators::validate_currency(currency));
        }

        into_result(errors)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputUserUpdate {
    pub name: String,
    pub currency: String,
}

impl InputUserUpdate {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        check(&mut errors, "name", validators::validate_name(&self.name));
        check(
            &mut errors,
            "currency",
            validators::validate_currency(&self.currency),
        );

        into_result(errors)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: CategoryType,
    pub color: String,
}

impl InputCategory {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        check(&mut errors, "name", validators::validate_name(&self.name));
        check(&mut errors, "color", validators::validate_hex_color(&self.color));

        into_result(errors)
    }
}

/// `month` is 0-indexed. Both default to the current month when absent.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputMonth {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputTransactionQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub annual: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTransaction {
    /// The financially responsible user: the caller or their partner. Defaults to the caller.
    pub user_id: Option<Uuid>,
    pub category_id: Uuid,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub is_fixed: bool,
    pub repeat_type: Option<RepeatType>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub is_private: bool,
}

/// A transaction input that passed validation, with the amount in cents and the end date
/// settled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidTransaction {
    pub amount_cents: i64,
    pub is_fixed: bool,
    pub end_date: Option<NaiveDate>,
}

impl InputTransaction {
    pub fn validate(&self) -> Result<ValidTransaction, Vec<FieldError>> {
        let mut errors = Vec::new();

        check(
            &mut errors,
            "description",
            validators::validate_description(&self.description),
        );

        let amount_cents = money::cents_from_decimal(self.amount);
        if amount_cents.is_none() {
            errors.push(FieldError::new("amount", "Amount must be a positive amount."));
        }

        let repeat_type = self.repeat_type.unwrap_or(RepeatType::Once);

        let end_date = match (repeat_type, self.end_date) {
            (RepeatType::Until, None) => {
                errors.push(FieldError::new(
                    "endDate",
                    "An end date is required for transactions repeating until a date.",
                ));
                None
            }
            (RepeatType::Once | RepeatType::Annual, _) => None,
            (rt, None) => recurrence::default_end_date(rt, self.date),
            (_, Some(end_date)) => Some(end_date),
        };

        if let Some(end_date) = end_date {
            if end_date < self.date {
                errors.push(FieldError::new(
                    "endDate",
                    "End date cannot be before the transaction date.",
                ));
            }
        }

        // Monthly repeating rows are templates for the materializer
        let is_fixed = self.is_fixed || repeat_type.is_monthly();

        match amount_cents {
            Some(amount_cents) if errors.is_empty() => Ok(ValidTransaction {
                amount_cents,
                is_fixed,
                end_date,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputList {
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub is_shared: bool,
}

impl InputList {
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        check(&mut errors, "title", validators::validate_name(&self.title));
        check(&mut errors, "color", validators::validate_hex_color(&self.color));

        into_result(errors)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputListItem {
    pub name: String,
    pub estimated_price: Option<f64>,
    pub actual_price: Option<f64>,
    pub category_id: Option<Uuid>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidListItemPrices {
    pub estimated_price_cents: Option<i64>,
    pub actual_price_cents: Option<i64>,
}

impl InputListItem {
    pub fn validate(&self) -> Result<ValidListItemPrices, Vec<FieldError>> {
        let mut errors = Vec::new();

        check(&mut errors, "name", validators::validate_name(&self.name));
        let estimated_price_cents = price_cents(&mut errors, "estimatedPrice", self.estimated_price);
        let actual_price_cents = price_cents(&mut errors, "actualPrice", self.actual_price);

        into_result(errors)?;

        Ok(ValidListItemPrices {
            estimated_price_cents,
            actual_price_cents,
        })
    }
}

/// Absent `checked` toggles the item.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputCheck {
    pub checked: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPartnerInvite {
    pub to_user_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputInvitationToken {
    pub token: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputInvitationId {
    pub invitation_id: Uuid,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputSearchQuery {
    pub q: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputHealthEndpointKey {
    pub key: String,
}
