//! Input validation for MyNote Core.
//!
//! All user-supplied fields pass through here before they hit the database.
//! All validators return `MyNoteError::Validation` on failure; the store never
//! coerces a validation failure into a silent no-op.

use crate::error::{MyNoteError, MyNoteResult};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_BODY_LENGTH: usize = 100_000; // 100KB of text
pub const MAX_COLOR_LENGTH: usize = 50;
pub const MAX_ITEM_TEXT_LENGTH: usize = 1_000;

/// Validate a note or list title: required, non-blank, bounded length.
pub fn validate_title(title: &str) -> MyNoteResult<()> {
    if title.trim().is_empty() {
        return Err(MyNoteError::validation("title", "title cannot be empty"));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(MyNoteError::validation(
            "title",
            format!("title cannot exceed {} bytes", MAX_TITLE_LENGTH),
        ));
    }
    Ok(())
}

/// Validate a note body or list description. Empty is allowed.
pub fn validate_body(body: &str, field_name: &str) -> MyNoteResult<()> {
    if body.len() > MAX_BODY_LENGTH {
        return Err(MyNoteError::validation(
            field_name,
            format!("{} cannot exceed {} bytes", field_name, MAX_BODY_LENGTH),
        ));
    }
    Ok(())
}

/// Validate an opaque color label. The core does not interpret the value,
/// it only bounds it.
pub fn validate_color(color: Option<&str>) -> MyNoteResult<()> {
    if let Some(color) = color {
        if color.len() > MAX_COLOR_LENGTH {
            return Err(MyNoteError::validation(
                "color",
                format!("color label cannot exceed {} bytes", MAX_COLOR_LENGTH),
            ));
        }
    }
    Ok(())
}

/// Validate a checklist item's text: required, non-blank, bounded length.
pub fn validate_item_text(text: &str) -> MyNoteResult<()> {
    if text.trim().is_empty() {
        return Err(MyNoteError::validation("text", "item text cannot be empty"));
    }
    if text.len() > MAX_ITEM_TEXT_LENGTH {
        return Err(MyNoteError::validation(
            "text",
            format!("item text cannot exceed {} bytes", MAX_ITEM_TEXT_LENGTH),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_title() {
        assert!(validate_title("Pay bills").is_ok());
    }

    #[test]
    fn test_empty_title_rejected() {
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title("\t\n").is_err());
    }

    #[test]
    fn test_title_length_boundary() {
        let at_limit = "a".repeat(MAX_TITLE_LENGTH);
        assert!(validate_title(&at_limit).is_ok());
        let over_limit = "a".repeat(MAX_TITLE_LENGTH + 1);
        assert!(validate_title(&over_limit).is_err());
    }

    #[test]
    fn test_empty_body_allowed() {
        assert!(validate_body("", "body").is_ok());
    }

    #[test]
    fn test_body_length_boundary() {
        let over_limit = "a".repeat(MAX_BODY_LENGTH + 1);
        let err = validate_body(&over_limit, "description").unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_color_optional() {
        assert!(validate_color(None).is_ok());
        assert!(validate_color(Some("amber")).is_ok());
        assert!(validate_color(Some(&"x".repeat(MAX_COLOR_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_item_text() {
        assert!(validate_item_text("milk").is_ok());
        assert!(validate_item_text(" ").is_err());
        assert!(validate_item_text(&"x".repeat(MAX_ITEM_TEXT_LENGTH + 1)).is_err());
    }
}
