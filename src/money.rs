//! Parsing and validation for decimal amounts crossing the API boundary.
//!
//! Amounts are [Decimal] everywhere inside the crate and canonical text in
//! the database. The helpers here are the only place stored text is turned
//! back into numbers, so a corrupt column surfaces as an error instead of
//! being read as zero.

use std::str::FromStr;

use rusqlite::{Row, types::Type};
use rust_decimal::Decimal;

use crate::Error;

/// Parse a string from outside the API boundary as a monetary amount.
///
/// Accepts plain decimal notation with at most two fractional digits.
/// Negative amounts are allowed here; operations that require a positive
/// amount check that separately.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if the string cannot be parsed as a decimal,
/// - or [Error::AmountPrecision] if it has more than two decimal places.
pub fn parse_amount(raw: &str) -> Result<Decimal, Error> {
    let amount =
        Decimal::from_str(raw.trim()).map_err(|_| Error::InvalidAmount(raw.to_owned()))?;
    check_precision(amount)?;

    Ok(amount)
}

/// Validate a transaction amount.
///
/// Transaction amounts are magnitudes, so they must be strictly positive and
/// have at most two fractional digits.
///
/// # Errors
/// This function will return a:
/// - [Error::NonPositiveAmount] if the amount is zero or negative,
/// - or [Error::AmountPrecision] if it has more than two decimal places.
pub fn validate_amount(amount: Decimal) -> Result<(), Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::NonPositiveAmount(amount));
    }

    check_precision(amount)
}

/// Check that an amount has at most two fractional digits.
pub(crate) fn check_precision(amount: Decimal) -> Result<(), Error> {
    if amount != amount.round_dp(2) {
        return Err(Error::AmountPrecision(amount));
    }

    Ok(())
}

/// Read a TEXT column back into a [Decimal].
pub(crate) fn decimal_column(row: &Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let raw: String = row.get(index)?;

    Decimal::from_str(&raw).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}

/// Read a nullable TEXT column back into an optional [Decimal].
pub(crate) fn optional_decimal_column(
    row: &Row,
    index: usize,
) -> Result<Option<Decimal>, rusqlite::Error> {
    let raw: Option<String> = row.get(index)?;

    match raw {
        Some(text) => Decimal::from_str(&text).map(Some).map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
        }),
        None => Ok(None),
    }
}


#[cfg(test)]
mod validate_amount_tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::{Error, money::validate_amount};

    #[test]
    fn accepts_positive_two_decimal_amount() {
        assert_eq!(validate_amount(dec!(19.99)), Ok(()));
    }

    #[test]
    fn rejects_zero() {
        assert_eq!(
            validate_amount(Decimal::ZERO),
            Err(Error::NonPositiveAmount(Decimal::ZERO))
        );
    }

    #[test]
    fn rejects_negative_amount() {
        assert_eq!(
            validate_amount(dec!(-5)),
            Err(Error::NonPositiveAmount(dec!(-5)))
        );
    }

    #[test]
    fn rejects_sub_cent_precision() {
        assert_eq!(
            validate_amount(dec!(0.001)),
            Err(Error::AmountPrecision(dec!(0.001)))
        );
    }

    #[test]
    fn accepts_trailing_zeroes_beyond_two_places() {
        assert_eq!(validate_amount(dec!(1.2300)), Ok(()));
    }
}
