//! Display conversions shared by the gateway, history and view layers.
//!
//! Token amounts travel as integers in the smallest unit ("wei") and are shown
//! with a fixed 18-decimal scaling. Dates are unix seconds shown in local time.

use alloy::primitives::U256;
use alloy::primitives::utils::{ParseUnits, format_units, parse_units};
use chrono::{Local, TimeZone};

pub const TOKEN_DECIMALS: u8 = 18;

/// `toLocaleString`-style layout: `11/14/2023, 10:13:20 PM`.
pub const DATE_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UnitsError {
    #[error("invalid wei amount '{0}'")]
    InvalidWei(String),
    #[error("invalid decimal amount '{0}': {1}")]
    InvalidDecimal(String, String),
    #[error("negative amount '{0}'")]
    Negative(String),
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("timestamp {0} is out of range")]
    TimestampOutOfRange(i64),
}

/// Smallest-unit integer string to a trimmed decimal string (`"1500..."` → `"1.5"`).
pub fn to_decimal(wei: &str) -> Result<String, UnitsError> {
    let trimmed = wei.trim();
    let value = U256::from_str_radix(trimmed, 10)
        .map_err(|_| UnitsError::InvalidWei(trimmed.to_owned()))?;
    Ok(u256_to_decimal(value))
}

pub fn u256_to_decimal(value: U256) -> String {
    // format_units only fails for an invalid unit.
    let formatted = format_units(value, TOKEN_DECIMALS).unwrap_or_else(|_| value.to_string());
    trim_fraction(&formatted)
}

/// Decimal string to smallest-unit integer (`"0.01"` → `10000000000000000`).
pub fn to_wei(decimal: &str) -> Result<U256, UnitsError> {
    let trimmed = decimal.trim();
    match parse_units(trimmed, TOKEN_DECIMALS) {
        Ok(ParseUnits::U256(value)) => Ok(value),
        Ok(ParseUnits::I256(_)) => Err(UnitsError::Negative(trimmed.to_owned())),
        Err(err) => Err(UnitsError::InvalidDecimal(trimmed.to_owned(), err.to_string())),
    }
}

/// Local-time rendering of a unix timestamp given in seconds.
pub fn format_local_date(unix_seconds: i64) -> Result<String, UnitsError> {
    let millis = unix_seconds
        .checked_mul(1000)
        .ok_or(UnitsError::TimestampOutOfRange(unix_seconds))?;
    let date = Local
        .timestamp_millis_opt(millis)
        .single()
        .ok_or(UnitsError::TimestampOutOfRange(unix_seconds))?;
    Ok(date.format(DATE_FORMAT).to_string())
}

/// `0xABCDEF…7890` → `0xABC...7890` (first five, last four).
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 9 {
        return address.to_owned();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

fn trim_fraction(formatted: &str) -> String {
    if !formatted.contains('.') {
        return formatted.to_owned();
    }
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_token_displays_as_one() {
        assert_eq!(to_decimal("1000000000000000000").unwrap(), "1");
        assert_eq!(to_decimal("500000000000000000").unwrap(), "0.5");
        assert_eq!(to_decimal("0").unwrap(), "0");
        assert_eq!(to_decimal("1").unwrap(), "0.000000000000000001");
        assert_eq!(to_decimal("12340000000000000000000").unwrap(), "12340");
    }

    #[test]
    fn decimal_roundtrip_is_exact() {
        for wei in [
            "0",
            "1",
            "10",
            "2000000000000000",
            "10000000000000000",
            "123456789012345678901234567890",
        ] {
            let shown = to_decimal(wei).unwrap();
            let back = to_wei(&shown).unwrap();
            assert_eq!(to_decimal(&back.to_string()).unwrap(), shown, "wei {wei}");
        }
    }

    #[test]
    fn default_amounts_parse_to_expected_wei() {
        assert_eq!(to_wei("0.01").unwrap(), U256::from(10_000_000_000_000_000u64));
        assert_eq!(to_wei("0.002").unwrap(), U256::from(2_000_000_000_000_000u64));
        assert_eq!(to_wei("0").unwrap(), U256::ZERO);
    }

    #[test]
    fn rejects_garbage_and_negative_amounts() {
        assert!(matches!(to_decimal("0x10"), Err(UnitsError::InvalidWei(_))));
        assert!(matches!(to_decimal("1.5"), Err(UnitsError::InvalidWei(_))));
        assert!(matches!(to_wei("-1"), Err(UnitsError::Negative(_))));
        assert!(matches!(to_wei("abc"), Err(UnitsError::InvalidDecimal(..))));
    }

    #[test]
    fn date_matches_local_rendering_of_millis() {
        let t = 1_700_000_000_i64;
        let expected = Local
            .timestamp_millis_opt(t * 1000)
            .single()
            .unwrap()
            .format(DATE_FORMAT)
            .to_string();
        assert_eq!(format_local_date(t).unwrap(), expected);
        assert!(format_local_date(i64::MAX).is_err());
    }

    #[test]
    fn shortens_long_addresses_only() {
        assert_eq!(
            shorten_address("0xABCDEF0123456789abcdef0123456789ABCD7890"),
            "0xABC...7890"
        );
        assert_eq!(shorten_address("0x1234"), "0x1234");
    }
}
