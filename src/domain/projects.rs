//! Project field rules.

use super::error::DomainError;
use super::tasks::{optional_text, required_text};

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;
pub const COLOR_MAX_CHARS: usize = 20;
pub const DEFAULT_COLOR: &str = "#3B82F6";

pub fn project_name(raw: &str) -> Result<String, DomainError> {
    required_text(raw, "name", NAME_MAX_CHARS)
}

pub fn project_description(raw: Option<String>) -> Result<Option<String>, DomainError> {
    optional_text(raw, "description", DESCRIPTION_MAX_CHARS)
}

pub fn project_color(raw: Option<String>) -> Result<String, DomainError> {
    Ok(optional_text(raw, "color", COLOR_MAX_CHARS)?.unwrap_or_else(|| DEFAULT_COLOR.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_defaults_when_missing() {
        assert_eq!(project_color(None).expect("default color"), DEFAULT_COLOR);
        assert_eq!(
            project_color(Some(" #10B981 ".into())).expect("explicit color"),
            "#10B981"
        );
        assert!(project_color(Some("#".repeat(21))).is_err());
    }

    #[test]
    fn name_is_required() {
        assert!(project_name("").is_err());
        assert_eq!(project_name(" Work ").expect("valid name"), "Work");
    }
}
