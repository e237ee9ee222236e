//! Newsletter use-case service.
//!
//! # Responsibility
//! - Create drafts and queue them for immediate or scheduled delivery.
//! - Advance delivery status on behalf of the delivery worker.
//! - Aggregate dashboard statistics.
//!
//! # Invariants
//! - Delivery status never moves backwards (`DeliveryStatus::can_transition_to`).
//! - Every successful mutation stamps `updated_at` with the caller's clock.

use crate::model::newsletter::{DeliveryStatus, DeliveryType, Newsletter, NewsletterId};
use crate::repo::newsletter_repo::{DailySendCount, NewsletterRepository};
use crate::repo::{RepoError, RepoResult};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for newsletter use-cases.
#[derive(Debug)]
pub enum NewsletterServiceError {
    /// Target newsletter does not exist.
    NotFound(NewsletterId),
    /// Requested status change would move the lifecycle backwards.
    InvalidTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
    /// Scheduled delivery time is earlier than the current time.
    ScheduleInPast { delivery_time: i64, now_ms: i64 },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for NewsletterServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "newsletter not found: {id}"),
            Self::InvalidTransition { from, to } => {
                write!(f, "newsletter cannot move from {from} to {to}")
            }
            Self::ScheduleInPast {
                delivery_time,
                now_ms,
            } => write!(
                f,
                "delivery time {delivery_time} is before current time {now_ms}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NewsletterServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for NewsletterServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "newsletter",
                id,
            } => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Input for a new draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftRequest {
    pub name: String,
    pub sender_name: String,
    pub sender_email: String,
    pub subject: String,
    pub content: String,
}

/// Newsletter counts per delivery status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub on_hold: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub finished: u64,
    pub total: u64,
}

/// Newsletter service facade over repository implementations.
pub struct NewsletterService<R: NewsletterRepository> {
    repo: R,
}

impl<R: NewsletterRepository> NewsletterService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Persists a new `ON_HOLD` draft with a generated slug.
    pub fn create_draft(
        &self,
        request: &DraftRequest,
        now_ms: i64,
    ) -> Result<Newsletter, NewsletterServiceError> {
        let mut newsletter = Newsletter::new(request.name.as_str(), now_ms);
        newsletter.sender_name = request.sender_name.clone();
        newsletter.sender_email = request.sender_email.clone();
        newsletter.subject = request.subject.clone();
        newsletter.content = request.content.clone();

        let id = self.repo.save(&mut newsletter)?;
        info!("event=newsletter_create module=service status=ok newsletter_id={id}");
        Ok(newsletter)
    }

    /// Queues a newsletter for immediate delivery (`NOW` + `PENDING`).
    pub fn send_now(
        &self,
        id: NewsletterId,
        now_ms: i64,
    ) -> Result<Newsletter, NewsletterServiceError> {
        self.queue(id, DeliveryType::Now, now_ms, now_ms)
    }

    /// Queues a newsletter for delivery at `delivery_time` (`SCHEDULED` + `PENDING`).
    pub fn schedule(
        &self,
        id: NewsletterId,
        delivery_time: i64,
        now_ms: i64,
    ) -> Result<Newsletter, NewsletterServiceError> {
        if delivery_time < now_ms {
            return Err(NewsletterServiceError::ScheduleInPast {
                delivery_time,
                now_ms,
            });
        }
        self.queue(id, DeliveryType::Scheduled, delivery_time, now_ms)
    }

    /// Moves a newsletter to `next` if the lifecycle allows it.
    pub fn advance_status(
        &self,
        id: NewsletterId,
        next: DeliveryStatus,
        now_ms: i64,
    ) -> Result<Newsletter, NewsletterServiceError> {
        let mut newsletter = self.load(id)?;
        let previous = newsletter.delivery_status;
        ensure_transition(previous, next)?;

        newsletter.delivery_status = next;
        newsletter.updated_at = now_ms;
        self.repo.save(&mut newsletter)?;
        info!(
            "event=newsletter_status module=service status=ok newsletter_id={id} from={previous} to={next}"
        );
        Ok(newsletter)
    }

    pub fn get_by_slug(&self, slug: &str) -> RepoResult<Option<Newsletter>> {
        self.repo.find_one_by_slug(slug)
    }

    /// Counts newsletters per delivery status.
    pub fn delivery_stats(&self) -> RepoResult<DeliveryStats> {
        Ok(DeliveryStats {
            on_hold: self.repo.count_all(Some(DeliveryStatus::OnHold), None)?,
            pending: self.repo.count_all(Some(DeliveryStatus::Pending), None)?,
            in_progress: self.repo.count_all(Some(DeliveryStatus::InProgress), None)?,
            finished: self.repo.count_all(Some(DeliveryStatus::Finished), None)?,
            total: self.repo.count_all(None, None)?,
        })
    }

    pub fn sent_out_over_time(&self, days: u32) -> RepoResult<Vec<DailySendCount>> {
        self.repo.newsletters_sent_out_over_time(days)
    }

    fn queue(
        &self,
        id: NewsletterId,
        delivery_type: DeliveryType,
        delivery_time: i64,
        now_ms: i64,
    ) -> Result<Newsletter, NewsletterServiceError> {
        let mut newsletter = self.load(id)?;
        ensure_transition(newsletter.delivery_status, DeliveryStatus::Pending)?;

        newsletter.delivery_status = DeliveryStatus::Pending;
        newsletter.delivery_type = delivery_type;
        newsletter.delivery_time = Some(delivery_time);
        newsletter.updated_at = now_ms;
        self.repo.save(&mut newsletter)?;
        info!(
            "event=newsletter_queue module=service status=ok newsletter_id={id} delivery_type={delivery_type} delivery_time={delivery_time}"
        );
        Ok(newsletter)
    }

    fn load(&self, id: NewsletterId) -> Result<Newsletter, NewsletterServiceError> {
        self.repo
            .find_one_by_id(id)?
            .ok_or(NewsletterServiceError::NotFound(id))
    }
}

fn ensure_transition(
    from: DeliveryStatus,
    to: DeliveryStatus,
) -> Result<(), NewsletterServiceError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(NewsletterServiceError::InvalidTransition { from, to })
    }
}
