//! Decimal amounts and their JSON encoding.
//!
//! Amounts are exact decimals. On the wire they are plain JSON numbers:
//! integral values carry no fraction (`100`, not `100.0`) and fractional
//! values use the shortest form that reads back to the same number (`12.5`).
//! The signing message and the merkle leaf both depend on this rendering.

use rust_decimal::prelude::ToPrimitive;
pub use rust_decimal::Decimal;
use std::str::FromStr;

/// Canonical text form of an amount, without trailing zeros.
pub fn format_amount(amount: &Decimal) -> String {
    amount.normalize().to_string()
}

/// Parse an amount from text such as `"30"` or `"12.5"`.
pub fn parse_amount(s: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s.trim()).map(|d| d.normalize())
}

/// Serde adapter writing a [`Decimal`] as a JSON number.
///
/// Use with `#[serde(with = "crate::amount::json_number")]`.
pub mod json_number {
    use super::*;
    use serde::de::{self, Visitor};
    use serde::{ser, Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        let value = value.normalize();
        if value.scale() == 0 {
            if let Some(n) = value.to_i64() {
                return serializer.serialize_i64(n);
            }
        }
        match value.to_f64() {
            Some(f) => serializer.serialize_f64(f),
            None => Err(ser::Error::custom(format!("amount {} is not representable", value))),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = Decimal;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal number or numeric string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
            Ok(Decimal::from(v))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
            // f64 Display is the shortest round-tripping form
            parse_amount(&v.to_string()).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
            parse_amount(v).map_err(E::custom)
        }
    }
}
