use std::{fmt, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A normalized Russian mobile number: `7` followed by exactly ten digits.
///
/// Free-text input is normalized before validation: every non-digit character is stripped, and a leading `8` is
/// rewritten to `7`. Anything that does not end up as an 11-digit `7xxxxxxxxxx` string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phone(String);

#[derive(Debug, Clone, Error)]
#[error("'{0}' is not a valid mobile phone number")]
pub struct PhoneError(pub String);

impl Phone {
    /// Normalizes raw user input into a canonical 11-digit number, or fails if the input cannot be normalized.
    pub fn normalize(raw: &str) -> Result<Self, PhoneError> {
        let mut digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.starts_with('8') {
            digits.replace_range(0..1, "7");
        }
        let valid = digits.len() == 11 && digits.starts_with('7');
        if valid {
            Ok(Self(digits))
        } else {
            Err(PhoneError(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_punctuation_and_leading_eight() {
        let phone = Phone::normalize("8 (921) 123-45-67").unwrap();
        assert_eq!(phone.as_str(), "79211234567");
    }

    #[test]
    fn accepts_plus_seven_format() {
        let phone = Phone::normalize("+7 921 123 45 67").unwrap();
        assert_eq!(phone.as_str(), "79211234567");
    }

    #[test]
    fn keeps_already_normal_numbers() {
        let phone = Phone::normalize("79211234567").unwrap();
        assert_eq!(phone.as_str(), "79211234567");
    }

    #[test]
    fn rejects_short_and_foreign_numbers() {
        assert!(Phone::normalize("12345").is_err());
        assert!(Phone::normalize("+1 555 123 4567").is_err());
        assert!(Phone::normalize("not a phone").is_err());
    }
}
