//! Subscriber metadata record.
//!
//! # Responsibility
//! - Hold one free-form `name -> value` attribute of a subscriber.
//! - Build records from loosely typed field maps (form/API payloads).
//!
//! # Invariants
//! - A record belongs to at most one subscriber. The owner may be unset only
//!   until the record is persisted.
//! - `created_at`/`updated_at` are caller-managed; nothing here stamps them.

use crate::model::subscriber::SubscriberId;
use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// System-assigned subscriber meta identifier.
pub type SubscriberMetaId = i64;

const NAME_MAX_CHARS: usize = 255;

/// Keys that `SubscriberMeta::from_map` requires, even when their value is null.
pub const SUBSCRIBER_META_FIELDS: [&str; 5] =
    ["name", "value", "subscriber", "createdAt", "updatedAt"];

/// Failure while building a `SubscriberMeta` from a field map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberMetaError {
    /// A required key is absent from the map.
    MissingField(&'static str),
    /// A key is present but holds a value of the wrong shape.
    InvalidField(String),
    /// Fields decoded but violate record rules.
    Validation(ValidationError),
}

impl Display for SubscriberMetaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(key) => write!(f, "missing subscriber meta field `{key}`"),
            Self::InvalidField(message) => write!(f, "invalid subscriber meta field: {message}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SubscriberMetaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for SubscriberMetaError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriberMetaFields {
    name: String,
    value: Option<String>,
    subscriber: Option<SubscriberId>,
    created_at: i64,
    updated_at: i64,
}

/// One `name -> value` attribute attached to a subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberMeta {
    id: Option<SubscriberMetaId>,
    name: String,
    value: Option<String>,
    #[serde(rename = "subscriber")]
    subscriber_id: Option<SubscriberId>,
    created_at: i64,
    updated_at: i64,
}

impl SubscriberMeta {
    /// Creates an unpersisted record with both timestamps set to `now_ms`.
    pub fn new(
        subscriber_id: SubscriberId,
        name: impl Into<String>,
        value: Option<String>,
        now_ms: i64,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            value,
            subscriber_id: Some(subscriber_id),
            created_at: now_ms,
            updated_at: now_ms,
        }
    }

    /// Builds a record from a field map.
    ///
    /// All of `name`, `value`, `subscriber`, `createdAt` and `updatedAt` must
    /// be present; `value` and `subscriber` may be `null`. Each timestamp is
    /// taken from its own key.
    ///
    /// # Errors
    /// - `MissingField` for the first absent key.
    /// - `InvalidField` when a value has the wrong JSON type.
    /// - `Validation` when the name is empty or too long.
    pub fn from_map(data: &Map<String, Value>) -> Result<Self, SubscriberMetaError> {
        if let Some(missing) = SUBSCRIBER_META_FIELDS
            .iter()
            .find(|key| !data.contains_key(**key))
        {
            return Err(SubscriberMetaError::MissingField(*missing));
        }

        let fields: SubscriberMetaFields = serde_json::from_value(Value::Object(data.clone()))
            .map_err(|err| SubscriberMetaError::InvalidField(err.to_string()))?;

        let mut meta = Self::default();
        meta.set_name(fields.name)
            .set_value(fields.value)
            .set_subscriber_id(fields.subscriber)
            .set_created_at(fields.created_at)
            .set_updated_at(fields.updated_at);
        require_text("name", &meta.name, NAME_MAX_CHARS)?;
        Ok(meta)
    }

    pub fn id(&self) -> Option<SubscriberMetaId> {
        self.id
    }

    /// Assigned by the repository after insert.
    pub(crate) fn set_id(&mut self, id: SubscriberMetaId) -> &mut Self {
        self.id = Some(id);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) -> &mut Self {
        self.value = value;
        self
    }

    pub fn subscriber_id(&self) -> Option<SubscriberId> {
        self.subscriber_id
    }

    pub fn set_subscriber_id(&mut self, subscriber_id: Option<SubscriberId>) -> &mut Self {
        self.subscriber_id = subscriber_id;
        self
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn set_created_at(&mut self, created_at: i64) -> &mut Self {
        self.created_at = created_at;
        self
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    pub fn set_updated_at(&mut self, updated_at: i64) -> &mut Self {
        self.updated_at = updated_at;
        self
    }

    /// Checks write-path rules: non-empty bounded name and an owner.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, NAME_MAX_CHARS)?;
        if self.subscriber_id.is_none() {
            return Err(ValidationError::MissingSubscriber);
        }
        Ok(())
    }
}
