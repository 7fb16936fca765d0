//! Caller-side input validation.
//!
//! Forms are checked here before any request is attempted, so a malformed
//! value never reaches the backend.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be a non-negative number (got \"{value}\")")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} has an unsupported value \"{value}\"")]
    InvalidChoice { field: &'static str, value: String },

    #[error("{0}")]
    Message(String),
}

/// Require a non-blank field, returning it trimmed.
pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(trimmed)
    }
}

/// Parse a required non-negative number.
pub fn parse_non_negative(field: &'static str, value: &str) -> Result<f64, ValidationError> {
    let trimmed = require(field, value)?;
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(ValidationError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}

/// Parse an optional non-negative number; blank means absent.
pub fn parse_optional_non_negative(
    field: &'static str,
    value: &str,
) -> Result<Option<f64>, ValidationError> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_non_negative(field, value).map(Some)
    }
}

/// Parse a required whole number of days.
pub fn parse_days(field: &'static str, value: &str) -> Result<u32, ValidationError> {
    let trimmed = require(field, value)?;
    trimmed.parse::<u32>().map_err(|_| ValidationError::InvalidNumber {
        field,
        value: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert_eq!(require("Name", "  Ada "), Ok("Ada"));
        assert_eq!(require("Name", "   "), Err(ValidationError::Required("Name")));
    }

    #[test]
    fn test_parse_non_negative() {
        assert_eq!(parse_non_negative("Age", "12"), Ok(12.0));
        assert_eq!(parse_non_negative("Weight", " 70.5 "), Ok(70.5));
        assert!(matches!(
            parse_non_negative("Age", "-1"),
            Err(ValidationError::InvalidNumber { field: "Age", .. })
        ));
        assert!(matches!(
            parse_non_negative("Age", "NaN"),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert_eq!(parse_non_negative("Age", ""), Err(ValidationError::Required("Age")));
    }

    #[test]
    fn test_parse_optional_non_negative() {
        assert_eq!(parse_optional_non_negative("Max weekly IU", ""), Ok(None));
        assert_eq!(parse_optional_non_negative("Max weekly IU", "3000"), Ok(Some(3000.0)));
    }

    #[test]
    fn test_parse_days() {
        assert_eq!(parse_days("Min interval", "2"), Ok(2));
        assert!(parse_days("Min interval", "2.5").is_err());
    }
}
