//! Canonical E.164 form of a phone number.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{PhoneError, Result};

/// E.164 caps a full number at 15 digits.
pub const MAX_DIGITS: usize = 15;

/// A validated phone number split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalNumber {
    /// The two inputs as entered, trimmed and concatenated.
    pub raw: String,
    /// `+<country_code><national_number>`.
    pub e164: String,
    pub country_code: String,
    pub national_number: String,
}

fn country_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[1-9][0-9]{0,2}$").expect("Invalid regex pattern"))
}

fn national_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{4,14}$").expect("Invalid regex pattern"))
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '.' | '(' | ')')
}

/// Validates and normalizes a country code and national number.
///
/// The country code may carry a leading `+`. The national number may
/// contain spaces, dashes, dots and parentheses; they are dropped.
pub fn canonicalize(country_code: &str, national_number: &str) -> Result<CanonicalNumber> {
    let cc_input = country_code.trim();
    let national_input = national_number.trim();

    let cc = cc_input.strip_prefix('+').unwrap_or(cc_input);
    if !country_code_pattern().is_match(cc) {
        return Err(PhoneError::InvalidCountryCode(country_code.to_string()));
    }

    let national: String = national_input.chars().filter(|c| !is_separator(*c)).collect();
    if !national_number_pattern().is_match(&national) {
        return Err(PhoneError::InvalidNationalNumber(national_number.to_string()));
    }

    let digits = cc.len() + national.len();
    if digits > MAX_DIGITS {
        return Err(PhoneError::TooLong { digits });
    }

    Ok(CanonicalNumber {
        raw: format!("{}{}", cc_input, national_input),
        e164: format!("+{}{}", cc, national),
        country_code: cc.to_string(),
        national_number: national,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_strips_separators() {
        let number = canonicalize("+1", "(555) 123-4567").unwrap();
        assert_eq!(number.e164, "+15551234567");
        assert_eq!(number.country_code, "1");
        assert_eq!(number.national_number, "5551234567");
        assert_eq!(number.raw, "+1(555) 123-4567");
    }

    #[test]
    fn test_different_inputs_same_e164() {
        let a = canonicalize("44", "20 7946 0958").unwrap();
        let b = canonicalize(" +44 ", "20.7946.0958").unwrap();
        assert_eq!(a.e164, b.e164);
        assert_ne!(a.raw, b.raw);
    }

    #[test]
    fn test_country_code_rules() {
        assert!(canonicalize("353", "871234567").is_ok());
        assert!(matches!(
            canonicalize("0", "5551234567"),
            Err(PhoneError::InvalidCountryCode(_))
        ));
        assert!(matches!(
            canonicalize("1234", "5551234567"),
            Err(PhoneError::InvalidCountryCode(_))
        ));
        assert!(matches!(
            canonicalize("", "5551234567"),
            Err(PhoneError::InvalidCountryCode(_))
        ));
        assert!(matches!(
            canonicalize("++1", "5551234567"),
            Err(PhoneError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn test_national_number_rules() {
        assert!(canonicalize("1", "1234").is_ok());
        assert!(matches!(
            canonicalize("1", "123"),
            Err(PhoneError::InvalidNationalNumber(_))
        ));
        assert!(matches!(
            canonicalize("1", "555-CALL-NOW"),
            Err(PhoneError::InvalidNationalNumber(_))
        ));
        // Non-ASCII digits are not accepted.
        assert!(matches!(
            canonicalize("1", "５５５１２３４"),
            Err(PhoneError::InvalidNationalNumber(_))
        ));
    }

    #[test]
    fn test_total_length_limit() {
        assert!(canonicalize("1", "12345678901234").is_ok());
        assert!(matches!(
            canonicalize("44", "12345678901234"),
            Err(PhoneError::TooLong { digits: 16 })
        ));
    }
}
