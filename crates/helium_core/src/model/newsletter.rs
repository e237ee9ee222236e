//! Newsletter campaign record.
//!
//! # Responsibility
//! - Define delivery status/type vocabularies and their storage strings.
//! - Guard the delivery status lifecycle against backwards moves.
//!
//! # Invariants
//! - `slug` is unique and URL-safe.
//! - `delivery_time` is set whenever `delivery_type == Scheduled`.
//! - Status only moves forward: `ON_HOLD -> PENDING -> IN_PROGRESS -> FINISHED`.

use crate::model::{require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// System-assigned newsletter identifier.
pub type NewsletterId = i64;

const NAME_MAX_CHARS: usize = 255;
const SLUG_MAX_CHARS: usize = 60;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

/// Campaign delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// Saved but not queued for delivery.
    OnHold,
    /// Queued; waiting for the delivery worker.
    Pending,
    /// Delivery worker is sending.
    InProgress,
    /// All messages handed off.
    Finished,
}

impl DeliveryStatus {
    pub const ALL: [Self; 4] = [Self::OnHold, Self::Pending, Self::InProgress, Self::Finished];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnHold => "ON_HOLD",
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ON_HOLD" => Some(Self::OnHold),
            "PENDING" => Some(Self::Pending),
            "IN_PROGRESS" => Some(Self::InProgress),
            "FINISHED" => Some(Self::Finished),
            _ => None,
        }
    }

    /// Returns whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// Staying on the same status is allowed. `ON_HOLD` may skip `PENDING`,
    /// but only `IN_PROGRESS` may finish.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::OnHold, Self::OnHold | Self::Pending | Self::InProgress)
                | (Self::Pending, Self::Pending | Self::InProgress)
                | (Self::InProgress, Self::InProgress | Self::Finished)
                | (Self::Finished, Self::Finished)
        )
    }
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a campaign is meant to go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryType {
    Draft,
    Now,
    Scheduled,
}

impl DeliveryType {
    pub const ALL: [Self; 3] = [Self::Draft, Self::Now, Self::Scheduled];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Now => "NOW",
            Self::Scheduled => "SCHEDULED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "NOW" => Some(Self::Now),
            "SCHEDULED" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

impl Display for DeliveryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Newsletter campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    pub id: Option<NewsletterId>,
    pub name: String,
    /// Unique public key, used in URLs.
    pub slug: String,
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    /// Message body as authored (markdown/HTML is opaque here).
    pub content: String,
    pub delivery_status: DeliveryStatus,
    pub delivery_type: DeliveryType,
    /// Epoch ms of the planned (scheduled) or requested (now) send.
    pub delivery_time: Option<i64>,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Newsletter {
    /// Creates an unpersisted draft (`ON_HOLD` + `DRAFT`) with a generated slug.
    pub fn new(name: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            slug: generate_slug(),
            sender_name: String::new(),
            sender_email: String::new(),
            subject: String::new(),
            content: String::new(),
            delivery_status: DeliveryStatus::OnHold,
            delivery_type: DeliveryType::Draft,
            delivery_time: None,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, NAME_MAX_CHARS)?;
        if self.slug.chars().count() > SLUG_MAX_CHARS || !SLUG_RE.is_match(&self.slug) {
            return Err(ValidationError::InvalidSlug(self.slug.clone()));
        }
        if self.delivery_type == DeliveryType::Scheduled && self.delivery_time.is_none() {
            return Err(ValidationError::MissingDeliveryTime);
        }
        Ok(())
    }
}

/// Generates a random URL-safe slug.
pub fn generate_slug() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::{generate_slug, DeliveryStatus, DeliveryType, Newsletter};
    use crate::model::ValidationError;

    #[test]
    fn generated_slugs_are_valid_and_distinct() {
        let first = Newsletter::new("Weekly", 0);
        let second = Newsletter::new("Weekly", 0);
        assert!(first.validate().is_ok());
        assert_ne!(first.slug, second.slug);
        assert_ne!(generate_slug(), generate_slug());
    }

    #[test]
    fn validate_rejects_bad_slugs() {
        for slug in ["", "Upper", "double--dash", "-lead", "trail-", "under_score"] {
            let mut newsletter = Newsletter::new("Weekly", 0);
            newsletter.slug = slug.to_string();
            assert_eq!(
                newsletter.validate(),
                Err(ValidationError::InvalidSlug(slug.to_string()))
            );
        }

        let mut newsletter = Newsletter::new("Weekly", 0);
        newsletter.slug = "a".repeat(60);
        assert!(newsletter.validate().is_ok());

        let too_long = "a".repeat(61);
        newsletter.slug = too_long.clone();
        assert_eq!(
            newsletter.validate(),
            Err(ValidationError::InvalidSlug(too_long))
        );
    }

    #[test]
    fn scheduled_newsletter_requires_delivery_time() {
        let mut newsletter = Newsletter::new("Weekly", 0);
        newsletter.delivery_type = DeliveryType::Scheduled;
        assert_eq!(
            newsletter.validate(),
            Err(ValidationError::MissingDeliveryTime)
        );

        newsletter.delivery_time = Some(1_000);
        assert!(newsletter.validate().is_ok());
    }

    #[test]
    fn status_transitions_never_go_backwards() {
        use DeliveryStatus::*;

        assert!(OnHold.can_transition_to(Pending));
        assert!(OnHold.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Finished));
        assert!(Finished.can_transition_to(Finished));

        assert!(!OnHold.can_transition_to(Finished));
        assert!(!Pending.can_transition_to(OnHold));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Finished.can_transition_to(InProgress));
    }

    #[test]
    fn storage_strings_round_trip() {
        for status in DeliveryStatus::ALL {
            assert_eq!(DeliveryStatus::parse(status.as_str()), Some(status));
        }
        for kind in DeliveryType::ALL {
            assert_eq!(DeliveryType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(DeliveryStatus::parse("on_hold"), None);
    }
}
