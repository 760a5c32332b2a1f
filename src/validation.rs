//! Display-name and argument validation for chat input.
//!
//! Sender ids come from the transport and are trusted; everything else in a
//! command line is player-typed and gets checked here before it reaches the
//! engine.

use thiserror::Error;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 24;
pub const MAX_QUANTITY: u32 = 1_000_000;

/// Display-name validation errors with player-facing messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name is too short (minimum {MIN_NAME_LENGTH} characters)")]
    TooShort,

    #[error("name is too long (maximum {MAX_NAME_LENGTH} characters)")]
    TooLong,

    #[error("name contains control characters")]
    ControlCharacters,

    #[error("name is reserved")]
    Reserved,
}

const RESERVED_NAMES: &[&str] = &["admin", "system", "bot", "moderator", "everyone"];

/// Validate a player display name and return its trimmed form.
pub fn validate_display_name(raw: &str) -> Result<String, NameError> {
    let name = raw.trim();
    let count = name.chars().count();
    if count < MIN_NAME_LENGTH {
        return Err(NameError::TooShort);
    }
    if count > MAX_NAME_LENGTH {
        return Err(NameError::TooLong);
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(NameError::ControlCharacters);
    }
    if RESERVED_NAMES
        .iter()
        .any(|r| name.eq_ignore_ascii_case(r))
    {
        return Err(NameError::Reserved);
    }
    Ok(name.to_string())
}

/// Parse a quantity argument: a positive integer with a sanity cap.
pub fn parse_quantity(raw: &str) -> Result<u32, String> {
    match raw.parse::<u32>() {
        Ok(0) => Err("quantity must be at least 1".to_string()),
        Ok(n) if n > MAX_QUANTITY => Err(format!("quantity too large (max {})", MAX_QUANTITY)),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("not a number: {}", raw)),
    }
}

/// Parse a money amount argument: a positive integer.
pub fn parse_amount(raw: &str) -> Result<i64, String> {
    match raw.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err("amount must be positive".to_string()),
        Err(_) => Err(format!("not a number: {}", raw)),
    }
}

/// Normalize an item or identifier argument to catalog form: lowercase with
/// spaces collapsed to underscores.
pub fn normalize_id(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_names() {
        assert_eq!(validate_display_name("  Alice  ").unwrap(), "Alice");
        assert_eq!(validate_display_name("Bob the Brave").unwrap(), "Bob the Brave");
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(validate_display_name("x").unwrap_err(), NameError::TooShort);
        assert_eq!(
            validate_display_name(&"y".repeat(30)).unwrap_err(),
            NameError::TooLong
        );
        assert_eq!(
            validate_display_name("bad\nname").unwrap_err(),
            NameError::ControlCharacters
        );
        assert_eq!(validate_display_name("ADMIN").unwrap_err(), NameError::Reserved);
    }

    #[test]
    fn quantity_parsing_bounds() {
        assert_eq!(parse_quantity("5").unwrap(), 5);
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("lots").is_err());
        assert!(parse_quantity("99999999").is_err());
    }

    #[test]
    fn ids_normalize_to_catalog_form() {
        assert_eq!(normalize_id("Iron Sword"), "iron_sword");
        assert_eq!(normalize_id("  WOOD "), "wood");
    }
}
