//! Internal helpers for validation and conversion.
//!
//! These utilities are **not** part of the public API.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Longest account id accepted.
const MAX_ACCOUNT_ID_LEN: usize = 64;

/// Trims and validates an account id: non-empty, at most 64 characters of
/// ASCII letters, digits, `-`, `_` or `.`.
pub(crate) fn normalize_account_id(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::KeyNotFound(
            "account id must not be empty".to_string(),
        ));
    }
    let valid = trimmed.len() <= MAX_ACCOUNT_ID_LEN
        && trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !valid {
        return Err(EngineError::KeyNotFound(format!("invalid account id {trimmed}")));
    }
    Ok(trimmed.to_string())
}

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidData(format!("invalid {label} id {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_ids_are_trimmed_and_checked() {
        assert_eq!(normalize_account_id("  main-desk ").unwrap(), "main-desk");
        assert!(normalize_account_id("").is_err());
        assert!(normalize_account_id("a b").is_err());
        assert!(normalize_account_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn parse_uuid_labels_errors() {
        let err = parse_uuid("nope", "operation").unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidData("invalid operation id nope".to_string())
        );
    }
}
