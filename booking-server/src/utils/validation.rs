//! Input validation helpers
//!
//! The document store has no built-in length enforcement. Payload structs
//! carry `validator` derives; these helpers cover free text that enters
//! outside a derived payload (owner notes on accept).

use crate::utils::AppError;

/// Free text: reservation messages, owner notes
pub const MAX_NOTE_LEN: usize = 500;

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_notes_are_rejected() {
        let too_long = Some("x".repeat(MAX_NOTE_LEN + 1));
        assert!(validate_optional_text(&too_long, "notes", MAX_NOTE_LEN).is_err());
        assert!(validate_optional_text(&None, "notes", MAX_NOTE_LEN).is_ok());
        let fine = Some("table by the window".to_string());
        assert!(validate_optional_text(&fine, "notes", MAX_NOTE_LEN).is_ok());
    }
}
