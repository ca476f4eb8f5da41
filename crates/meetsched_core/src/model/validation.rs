//! Input validation helpers shared by the model constructors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+$").expect("valid email regex"));

/// A required field is empty or malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Field is empty after trimming.
    Empty(&'static str),
    /// Field has content but not in the expected shape.
    Malformed { field: &'static str, value: String },
    /// Identifier is zero or negative.
    InvalidId(&'static str),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty(field) => write!(f, "`{field}` must not be empty"),
            Self::Malformed { field, value } => write!(f, "`{field}` is malformed: `{value}`"),
            Self::InvalidId(field) => write!(f, "`{field}` must be a positive id"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and rejects blank input.
pub fn required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    Ok(trimmed.to_string())
}

/// Validates an optional email address.
///
/// `None` stays unset; `Some` must be non-blank and look like `local@domain`.
pub fn optional_email(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let trimmed = required_text(field, value)?;
    if !EMAIL_RE.is_match(&trimmed) {
        return Err(ValidationError::Malformed {
            field,
            value: trimmed,
        });
    }
    Ok(Some(trimmed))
}

/// Rejects ids that a store could never have issued.
pub fn positive_id(field: &'static str, id: i64) -> Result<i64, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidId(field));
    }
    Ok(id)
}
