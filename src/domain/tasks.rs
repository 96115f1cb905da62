//! Task field rules and the completion timestamp invariant.

use time::OffsetDateTime;

use super::error::DomainError;
use super::types::TaskStatus;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const ASSIGNEE_MAX_CHARS: usize = 100;

/// Trim and bound a required text field.
pub fn required_text(raw: &str, field: &str, max_chars: usize) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    ensure_max_chars(trimmed, field, max_chars)?;
    Ok(trimmed.to_string())
}

/// Trim an optional text field, collapsing blank input to `None`.
pub fn optional_text(
    raw: Option<String>,
    field: &str,
    max_chars: usize,
) -> Result<Option<String>, DomainError> {
    let Some(value) = raw else {
        return Ok(None);
    };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    ensure_max_chars(trimmed, field, max_chars)?;
    Ok(Some(trimmed.to_string()))
}

/// Trim tags and drop blanks, keeping the caller's order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Timestamp to stamp into `completed_at` when it is still unset.
///
/// Stores apply it as `completed_at = completed_at.or(candidate)`, so a task keeps the
/// time of its first transition into `Done` across later updates.
pub fn completion_candidate(status: TaskStatus, now: OffsetDateTime) -> Option<OffsetDateTime> {
    (status == TaskStatus::Done).then_some(now)
}

/// Apply a completion candidate to a previously stored value.
pub fn apply_completion(
    previous: Option<OffsetDateTime>,
    candidate: Option<OffsetDateTime>,
) -> Option<OffsetDateTime> {
    previous.or(candidate)
}

fn ensure_max_chars(value: &str, field: &str, max_chars: usize) -> Result<(), DomainError> {
    let length = value.chars().count();
    if length > max_chars {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_chars} characters (got {length})"
        )));
    }
    Ok(())
}
