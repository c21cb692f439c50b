//! Kubernetes resource quantity parsing
//!
//! Accepts the API server's grammar: an optionally signed decimal number
//! (`1`, `1.5`, `.5`, `+1`, `-2`) followed by a binary suffix (`Ki`..`Ei`),
//! a decimal suffix (`n`, `u`, `m`, `k`..`E`) or an exponent (`e6`, `E-3`).
//! Fractional values are rounded up to a whole unit, matching the API
//! server's `Value()` semantics.

use crate::error::{OperatorError, Result};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// One gibibyte in bytes
pub const GIB: i64 = 1024 * 1024 * 1024;

/// Parse a quantity into an integer number of units (bytes for memory)
pub fn parse_quantity(quantity: &Quantity) -> Result<i64> {
    parse_str(&quantity.0)
}

fn parse_str(raw: &str) -> Result<i64> {
    let value = raw.trim();
    let invalid = || OperatorError::InvalidQuantity(raw.to_string());

    let (negative, unsigned) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let split = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(split);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(invalid());
    }

    // value = digits * multiplier * 10^exponent / 10^fraction.len()
    let (multiplier, exponent): (u128, i32) = match suffix {
        "" => (1, 0),
        "Ki" => (1 << 10, 0),
        "Mi" => (1 << 20, 0),
        "Gi" => (1 << 30, 0),
        "Ti" => (1 << 40, 0),
        "Pi" => (1 << 50, 0),
        "Ei" => (1 << 60, 0),
        "n" => (1, -9),
        "u" => (1, -6),
        "m" => (1, -3),
        "k" => (1, 3),
        "M" => (1, 6),
        "G" => (1, 9),
        "T" => (1, 12),
        "P" => (1, 15),
        "E" => (1, 18),
        s if s.starts_with('e') || s.starts_with('E') => {
            let exp: i32 = s[1..].parse().map_err(|_| invalid())?;
            (1, exp)
        }
        _ => return Err(invalid()),
    };

    let digits: u128 = format!("{}{}", whole, fraction)
        .parse()
        .map_err(|_| invalid())?;
    let scale = i32::try_from(fraction.len()).map_err(|_| invalid())? - exponent;
    let pow10 = |n: i32| 10u128.checked_pow(n.unsigned_abs()).ok_or_else(invalid);

    let numerator = digits.checked_mul(multiplier).ok_or_else(invalid)?;
    let units = if scale >= 0 {
        numerator.div_ceil(pow10(scale)?)
    } else {
        numerator.checked_mul(pow10(scale)?).ok_or_else(invalid)?
    };

    let units = i64::try_from(units).map_err(|_| invalid())?;
    Ok(if negative { -units } else { units })
}
