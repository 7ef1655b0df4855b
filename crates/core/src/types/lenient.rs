//! Lenient deserializers for records written by loosely-typed clients.
//!
//! Stored carts and order payloads may carry numbers as strings
//! (`"500"`) or booleans as strings (`"true"`). These helpers accept both
//! forms and hand back real numeric and boolean values.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagLike {
    Bool(bool),
    Int(i64),
    Text(String),
}

fn number_to_decimal<E: serde::de::Error>(value: NumberLike) -> Result<Decimal, E> {
    match value {
        NumberLike::Int(i) => Ok(Decimal::from(i)),
        NumberLike::Float(f) => Decimal::try_from(f).map_err(E::custom),
        NumberLike::Text(s) => Decimal::from_str(s.trim()).map_err(E::custom),
    }
}

/// Deserialize a decimal from a JSON number or numeric string.
pub fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    number_to_decimal(NumberLike::deserialize(deserializer)?)
}

/// Deserialize an optional decimal; `null` and missing map to `None`.
pub fn optional_decimal<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Decimal>, D::Error> {
    Option::<NumberLike>::deserialize(deserializer)?
        .map(number_to_decimal)
        .transpose()
}

/// Deserialize an optional integer count; fractional values are rejected.
pub fn optional_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<i64>, D::Error> {
    let Some(value) = Option::<NumberLike>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let decimal = number_to_decimal::<D::Error>(value)?;
    if !decimal.fract().is_zero() {
        return Err(D::Error::custom(format!("expected a whole number, got {decimal}")));
    }
    i64::try_from(decimal).map(Some).map_err(D::Error::custom)
}

/// Deserialize a boolean flag from `true`/`false`, `0`/`1` or their string
/// forms; `null` and missing are `false`.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match Option::<FlagLike>::deserialize(deserializer)? {
        None => Ok(false),
        Some(FlagLike::Bool(b)) => Ok(b),
        Some(FlagLike::Int(i)) => Ok(i != 0),
        Some(FlagLike::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(D::Error::custom(format!("invalid boolean: {other}"))),
        },
    }
}
