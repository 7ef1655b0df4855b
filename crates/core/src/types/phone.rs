//! Mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input contains no digits at all.
    #[error("phone number cannot be empty")]
    Empty,
    /// The digit count is outside the accepted range.
    #[error("phone number must have {min}-{max} digits, got {count}")]
    DigitCount {
        /// Number of digits found in the input.
        count: usize,
        /// Minimum accepted digit count.
        min: usize,
        /// Maximum accepted digit count.
        max: usize,
    },
    /// The subscriber number does not start with 6, 7, 8 or 9.
    #[error("phone number must start with 6, 7, 8 or 9")]
    InvalidPrefix,
}

/// A 10-digit mobile number in the local numbering plan.
///
/// Parsing strips every non-digit character, accepts 10 to 13 digits (so
/// country codes such as `+91` or a trunk `0` are tolerated), keeps the
/// last ten digits and requires the first of those to be 6-9.
///
/// ```
/// use counsel_core::Phone;
///
/// assert_eq!(Phone::parse("+91 98765 43210").unwrap().as_str(), "9876543210");
/// assert!(Phone::parse("12345").is_err());
/// assert!(Phone::parse("5123456789").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Number of digits kept after normalization.
    pub const DIGITS: usize = 10;
    /// Largest digit count accepted before normalization.
    pub const MAX_INPUT_DIGITS: usize = 13;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input has no digits, has fewer than 10 or
    /// more than 13 digits, or its last ten digits do not start with 6-9.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();

        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        let count = digits.len();
        if !(Self::DIGITS..=Self::MAX_INPUT_DIGITS).contains(&count) {
            return Err(PhoneError::DigitCount {
                count,
                min: Self::DIGITS,
                max: Self::MAX_INPUT_DIGITS,
            });
        }

        // ASCII digits only, so byte slicing is on char boundaries.
        let local = digits.get(count - Self::DIGITS..).unwrap_or_default();
        if !matches!(local.as_bytes().first(), Some(b'6'..=b'9')) {
            return Err(PhoneError::InvalidPrefix);
        }

        Ok(Self(local.to_owned()))
    }

    /// Returns the normalized ten-digit number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_country_code() {
        assert_eq!(Phone::parse("+91 9876543210").unwrap().as_str(), "9876543210");
        assert_eq!(Phone::parse("091-98765-43210").unwrap().as_str(), "9876543210");
    }

    #[test]
    fn test_accepts_plain_ten_digits() {
        for first in ['6', '7', '8', '9'] {
            let raw = format!("{first}123456789");
            assert_eq!(Phone::parse(&raw).unwrap().as_str(), raw);
        }
    }

    #[test]
    fn test_too_short() {
        assert!(matches!(
            Phone::parse("12345"),
            Err(PhoneError::DigitCount { count: 5, .. })
        ));
    }

    #[test]
    fn test_too_long() {
        assert!(matches!(
            Phone::parse("98765432101234"),
            Err(PhoneError::DigitCount { count: 14, .. })
        ));
    }

    #[test]
    fn test_invalid_leading_digit() {
        assert_eq!(Phone::parse("5123456789"), Err(PhoneError::InvalidPrefix));
        // last ten digits decide, not the first ones
        assert_eq!(Phone::parse("915123456789"), Err(PhoneError::InvalidPrefix));
    }

    #[test]
    fn test_empty() {
        assert_eq!(Phone::parse("call me"), Err(PhoneError::Empty));
    }
}
