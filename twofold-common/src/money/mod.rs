//! Amounts are stored as integer cents and exchanged with clients as decimal numbers.

pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Converts a client-supplied decimal amount to cents. Returns `None` for amounts that are not
/// finite, not positive, or out of range.
pub fn cents_from_decimal(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }

    let cents = (amount * 100.0).round();
    if cents < 1.0 || cents > MAX_AMOUNT_CENTS as f64 {
        return None;
    }

    Some(cents as i64)
}

pub fn decimal_from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Serde adapter for `i64` cent fields that travel as decimal numbers.
pub mod as_decimal {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(cents: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(super::decimal_from_cents(*cents))
    }
}

pub mod option_as_decimal {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(
        cents: &Option<i64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match cents {
            Some(c) => serializer.serialize_some(&super::decimal_from_cents(*c)),
            None => serializer.serialize_none(),
        }
    }
}
