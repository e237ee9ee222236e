//! Subscriber record.
//!
//! Subscribers own metadata rows (`he_subscriber_meta`); removing one removes
//! its metadata as well.

use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

/// System-assigned subscriber identifier.
pub type SubscriberId = i64;

const EMAIL_MAX_CHARS: usize = 255;

/// Subscription lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriberStatus {
    Unverified,
    Verified,
    Unsubscribed,
}

impl SubscriberStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unverified => "UNVERIFIED",
            Self::Verified => "VERIFIED",
            Self::Unsubscribed => "UNSUBSCRIBED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "UNVERIFIED" => Some(Self::Unverified),
            "VERIFIED" => Some(Self::Verified),
            "UNSUBSCRIBED" => Some(Self::Unsubscribed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Option<SubscriberId>,
    pub email: String,
    pub status: SubscriberStatus,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Subscriber {
    /// Creates an unpersisted, unverified subscriber.
    pub fn new(email: impl Into<String>, now_ms: i64) -> Self {
        let email: String = email.into();
        Self {
            id: None,
            email: email.trim().to_string(),
            status: SubscriberStatus::Unverified,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("email", &self.email, EMAIL_MAX_CHARS)?;
        match self.email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(())
            }
            _ => Err(ValidationError::InvalidEmail(self.email.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Subscriber, SubscriberStatus};
    use crate::model::ValidationError;

    #[test]
    fn new_subscriber_starts_unverified_with_trimmed_email() {
        let subscriber = Subscriber::new("  ada@example.com ", 10);
        assert_eq!(subscriber.email, "ada@example.com");
        assert_eq!(subscriber.status, SubscriberStatus::Unverified);
        assert_eq!(subscriber.id, None);
    }

    #[test]
    fn validate_rejects_malformed_emails() {
        for email in ["plain", "@example.com", "ada@", "a@b@c"] {
            let err = Subscriber::new(email, 0).validate().unwrap_err();
            assert_eq!(err, ValidationError::InvalidEmail(email.to_string()));
        }
    }
}
