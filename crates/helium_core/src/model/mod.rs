//! Domain records persisted by Helium core.
//!
//! # Responsibility
//! - Define plain data records for subscribers, subscriber metadata and
//!   newsletter campaigns.
//! - Own field-level validation shared by every write path.
//!
//! # Invariants
//! - Identifiers are system-assigned; `None` means "not persisted yet".
//! - Timestamps are epoch milliseconds supplied by the caller.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod newsletter;
pub mod subscriber;
pub mod subscriber_meta;

/// Field-level validation failure for any Helium record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trimming.
    EmptyField(&'static str),
    /// Text field exceeds its storage limit (counted in chars).
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },
    /// Email address is not `local@domain`.
    InvalidEmail(String),
    /// Slug is not lowercase alphanumeric groups joined by `-`.
    InvalidSlug(String),
    /// Scheduled newsletters need a delivery time.
    MissingDeliveryTime,
    /// Subscriber meta must be attached to a subscriber before persistence.
    MissingSubscriber,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "{field} cannot be empty"),
            Self::FieldTooLong { field, max, actual } => {
                write!(f, "{field} must be at most {max} characters, got {actual}")
            }
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::InvalidSlug(value) => write!(f, "invalid slug `{value}`"),
            Self::MissingDeliveryTime => {
                write!(f, "scheduled newsletters require a delivery time")
            }
            Self::MissingSubscriber => write!(f, "subscriber meta has no owning subscriber"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::FieldTooLong { field, max, actual });
    }
    Ok(())
}
