//! Subscriber and subscriber-meta use-case service.
//!
//! `set_meta` treats `(subscriber, name)` as the logical key: a second write
//! with the same name replaces the value and bumps only `updated_at`.

use crate::model::subscriber::{Subscriber, SubscriberId};
use crate::model::subscriber_meta::SubscriberMeta;
use crate::repo::subscriber_meta_repo::SubscriberMetaRepository;
use crate::repo::subscriber_repo::SubscriberRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for subscriber use-cases.
#[derive(Debug)]
pub enum SubscriberServiceError {
    SubscriberNotFound(SubscriberId),
    MetaNotFound {
        subscriber_id: SubscriberId,
        name: String,
    },
    Repo(RepoError),
}

impl Display for SubscriberServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubscriberNotFound(id) => write!(f, "subscriber not found: {id}"),
            Self::MetaNotFound {
                subscriber_id,
                name,
            } => write!(f, "subscriber {subscriber_id} has no meta `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SubscriberServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SubscriberServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "subscriber",
                id,
            } => Self::SubscriberNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub struct SubscriberService<S: SubscriberRepository, M: SubscriberMetaRepository> {
    subscribers: S,
    metas: M,
}

impl<S: SubscriberRepository, M: SubscriberMetaRepository> SubscriberService<S, M> {
    pub fn new(subscribers: S, metas: M) -> Self {
        Self { subscribers, metas }
    }

    /// Stores a new unverified subscriber.
    ///
    /// Duplicate emails surface as `RepoError::Conflict`.
    pub fn register(
        &self,
        email: &str,
        now_ms: i64,
    ) -> Result<Subscriber, SubscriberServiceError> {
        let mut subscriber = Subscriber::new(email, now_ms);
        let id = self.subscribers.save(&mut subscriber)?;
        info!("event=subscriber_register module=service status=ok subscriber_id={id}");
        Ok(subscriber)
    }

    /// Creates or replaces the meta `name` of a subscriber.
    pub fn set_meta(
        &self,
        subscriber_id: SubscriberId,
        name: &str,
        value: Option<String>,
        now_ms: i64,
    ) -> Result<SubscriberMeta, SubscriberServiceError> {
        self.ensure_subscriber(subscriber_id)?;
        let name = name.trim();

        let mut meta = match self
            .metas
            .find_one_by_subscriber_and_name(subscriber_id, name)?
        {
            Some(mut existing) => {
                existing.set_value(value).set_updated_at(now_ms);
                existing
            }
            None => SubscriberMeta::new(subscriber_id, name, value, now_ms),
        };
        let meta_id = self.metas.save(&mut meta)?;
        info!(
            "event=subscriber_meta_set module=service status=ok subscriber_id={subscriber_id} meta_id={meta_id}"
        );
        Ok(meta)
    }

    /// Lists all metas of a subscriber ordered by name.
    pub fn metas(
        &self,
        subscriber_id: SubscriberId,
    ) -> Result<Vec<SubscriberMeta>, SubscriberServiceError> {
        self.ensure_subscriber(subscriber_id)?;
        Ok(self.metas.find_by_subscriber(subscriber_id)?)
    }

    pub fn remove_meta(
        &self,
        subscriber_id: SubscriberId,
        name: &str,
    ) -> Result<(), SubscriberServiceError> {
        let name = name.trim();
        let meta = self
            .metas
            .find_one_by_subscriber_and_name(subscriber_id, name)?
            .ok_or_else(|| SubscriberServiceError::MetaNotFound {
                subscriber_id,
                name: name.to_string(),
            })?;
        if let Some(id) = meta.id() {
            self.metas.remove(id)?;
        }
        Ok(())
    }

    /// Removes a subscriber together with its metas.
    pub fn unregister(&self, subscriber_id: SubscriberId) -> Result<(), SubscriberServiceError> {
        self.subscribers.remove(subscriber_id)?;
        info!("event=subscriber_remove module=service status=ok subscriber_id={subscriber_id}");
        Ok(())
    }

    fn ensure_subscriber(&self, subscriber_id: SubscriberId) -> Result<(), SubscriberServiceError> {
        match self.subscribers.find_one_by_id(subscriber_id)? {
            Some(_) => Ok(()),
            None => Err(SubscriberServiceError::SubscriberNotFound(subscriber_id)),
        }
    }
}
