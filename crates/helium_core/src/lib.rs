//! Persistence core for Helium, a newsletter management application.
//!
//! Records for subscribers, subscriber metadata and newsletter campaigns, typed
//! SQLite repositories over them, and the use-case services built on top.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::newsletter::{DeliveryStatus, DeliveryType, Newsletter, NewsletterId};
pub use model::subscriber::{Subscriber, SubscriberId, SubscriberStatus};
pub use model::subscriber_meta::{SubscriberMeta, SubscriberMetaError, SubscriberMetaId};
pub use model::ValidationError;
pub use repo::newsletter_repo::{
    DailySendCount, NewsletterOrderField, NewsletterRepository, SqliteNewsletterRepository,
    DEFAULT_SENT_OUT_WINDOW_DAYS, MAX_SENT_OUT_WINDOW_DAYS,
};
pub use repo::subscriber_meta_repo::{SqliteSubscriberMetaRepository, SubscriberMetaRepository};
pub use repo::subscriber_repo::{SqliteSubscriberRepository, SubscriberRepository};
pub use repo::{RepoError, RepoResult, SortDirection};
pub use service::newsletter_service::{
    DeliveryStats, DraftRequest, NewsletterService, NewsletterServiceError,
};
pub use service::subscriber_service::{SubscriberService, SubscriberServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
