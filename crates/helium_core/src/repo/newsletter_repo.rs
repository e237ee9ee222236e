//! Newsletter repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/save/remove/count APIs over `he_newsletter`.
//! - Aggregate finished deliveries per calendar day for dashboards.
//!
//! # Invariants
//! - Write paths call `Newsletter::validate()` before SQL mutations.
//! - Read paths reject invalid persisted enum strings instead of masking them.
//! - Caller-ordered listings always end with `id ASC` so pages are stable.

use crate::model::newsletter::{DeliveryStatus, DeliveryType, Newsletter, NewsletterId};
use crate::repo::schema_guard::ensure_table_ready;
use crate::repo::{count_to_u64, map_write_error, RepoError, RepoResult, SortDirection};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

/// Trailing window used by dashboards for sent-out statistics.
pub const DEFAULT_SENT_OUT_WINDOW_DAYS: u32 = 7;

/// Largest accepted window. `date('now', '-N days')` is NULL once it leaves
/// SQLite's 0000-9999 calendar, which would silently drop every row.
pub const MAX_SENT_OUT_WINDOW_DAYS: u32 = 365_000;

const NEWSLETTER_TABLE: &str = "he_newsletter";
const NEWSLETTER_COLUMNS: [&str; 12] = [
    "id",
    "name",
    "slug",
    "sender_name",
    "sender_email",
    "subject",
    "content",
    "delivery_status",
    "delivery_type",
    "delivery_time",
    "created_at",
    "updated_at",
];

const NEWSLETTER_SELECT_SQL: &str = "SELECT
    id,
    name,
    slug,
    sender_name,
    sender_email,
    subject,
    content,
    delivery_status,
    delivery_type,
    delivery_time,
    created_at,
    updated_at
FROM he_newsletter";

/// Columns a caller may order `find_many` by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsletterOrderField {
    Id,
    Name,
    Slug,
    DeliveryStatus,
    DeliveryType,
    DeliveryTime,
    CreatedAt,
    UpdatedAt,
}

impl NewsletterOrderField {
    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Slug => "slug",
            Self::DeliveryStatus => "delivery_status",
            Self::DeliveryType => "delivery_type",
            Self::DeliveryTime => "delivery_time",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

/// Number of finished newsletters created on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySendCount {
    /// `YYYY-MM-DD`.
    pub date: String,
    pub count: u64,
}

/// Repository interface for newsletter persistence.
pub trait NewsletterRepository {
    /// Inserts when `id` is unset (and assigns it), updates otherwise.
    fn save(&self, newsletter: &mut Newsletter) -> RepoResult<NewsletterId>;
    /// Deletes one newsletter.
    fn remove(&self, id: NewsletterId) -> RepoResult<()>;
    fn find_one_by_id(&self, id: NewsletterId) -> RepoResult<Option<Newsletter>>;
    fn find_one_by_slug(&self, slug: &str) -> RepoResult<Option<Newsletter>>;
    /// Returns one page in caller-specified order.
    fn find_many(
        &self,
        order: &[(NewsletterOrderField, SortDirection)],
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Newsletter>>;
    /// Counts rows, optionally filtered by status, type, or both.
    fn count_all(
        &self,
        delivery_status: Option<DeliveryStatus>,
        delivery_type: Option<DeliveryType>,
    ) -> RepoResult<u64>;
    /// Per-day counts of `FINISHED` newsletters created in the trailing
    /// `days` window (from UTC midnight `days` days ago), oldest day first.
    /// Windows above `MAX_SENT_OUT_WINDOW_DAYS` are `RepoError::WindowTooLarge`.
    fn newsletters_sent_out_over_time(&self, days: u32) -> RepoResult<Vec<DailySendCount>>;
}

/// SQLite-backed newsletter repository.
pub struct SqliteNewsletterRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNewsletterRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, NEWSLETTER_TABLE, &NEWSLETTER_COLUMNS)?;
        Ok(Self { conn })
    }

    fn insert(&self, newsletter: &Newsletter) -> RepoResult<NewsletterId> {
        self.conn
            .execute(
                "INSERT INTO he_newsletter (
                    name,
                    slug,
                    sender_name,
                    sender_email,
                    subject,
                    content,
                    delivery_status,
                    delivery_type,
                    delivery_time,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
                params![
                    newsletter.name,
                    newsletter.slug,
                    newsletter.sender_name,
                    newsletter.sender_email,
                    newsletter.subject,
                    newsletter.content,
                    newsletter.delivery_status.as_str(),
                    newsletter.delivery_type.as_str(),
                    newsletter.delivery_time,
                    newsletter.created_at,
                    newsletter.updated_at,
                ],
            )
            .map_err(|err| map_write_error(err, "newsletter slug already exists"))?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: NewsletterId, newsletter: &Newsletter) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE he_newsletter
                 SET
                    name = ?1,
                    slug = ?2,
                    sender_name = ?3,
                    sender_email = ?4,
                    subject = ?5,
                    content = ?6,
                    delivery_status = ?7,
                    delivery_type = ?8,
                    delivery_time = ?9,
                    created_at = ?10,
                    updated_at = ?11
                 WHERE id = ?12;",
                params![
                    newsletter.name,
                    newsletter.slug,
                    newsletter.sender_name,
                    newsletter.sender_email,
                    newsletter.subject,
                    newsletter.content,
                    newsletter.delivery_status.as_str(),
                    newsletter.delivery_type.as_str(),
                    newsletter.delivery_time,
                    newsletter.created_at,
                    newsletter.updated_at,
                    id,
                ],
            )
            .map_err(|err| map_write_error(err, "newsletter slug already exists"))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "newsletter",
                id,
            });
        }
        Ok(())
    }
}

impl NewsletterRepository for SqliteNewsletterRepository<'_> {
    fn save(&self, newsletter: &mut Newsletter) -> RepoResult<NewsletterId> {
        newsletter.validate()?;

        match newsletter.id {
            Some(id) => {
                self.update(id, newsletter)?;
                Ok(id)
            }
            None => {
                let id = self.insert(newsletter)?;
                newsletter.id = Some(id);
                Ok(id)
            }
        }
    }

    fn remove(&self, id: NewsletterId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM he_newsletter WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "newsletter",
                id,
            });
        }
        Ok(())
    }

    fn find_one_by_id(&self, id: NewsletterId) -> RepoResult<Option<Newsletter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NEWSLETTER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_newsletter_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_one_by_slug(&self, slug: &str) -> RepoResult<Option<Newsletter>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NEWSLETTER_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_newsletter_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_many(
        &self,
        order: &[(NewsletterOrderField, SortDirection)],
        limit: u32,
        offset: u32,
    ) -> RepoResult<Vec<Newsletter>> {
        let mut order_terms: Vec<String> = order
            .iter()
            .map(|(field, direction)| format!("{} {}", field.column(), direction.as_sql()))
            .collect();
        if !order
            .iter()
            .any(|(field, _)| *field == NewsletterOrderField::Id)
        {
            order_terms.push("id ASC".to_string());
        }

        let sql = format!(
            "{NEWSLETTER_SELECT_SQL} ORDER BY {} LIMIT ?1 OFFSET ?2;",
            order_terms.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![i64::from(limit), i64::from(offset)])?;
        let mut newsletters = Vec::new();
        while let Some(row) = rows.next()? {
            newsletters.push(parse_newsletter_row(row)?);
        }
        Ok(newsletters)
    }

    fn count_all(
        &self,
        delivery_status: Option<DeliveryStatus>,
        delivery_type: Option<DeliveryType>,
    ) -> RepoResult<u64> {
        let count: i64 = match (delivery_status, delivery_type) {
            (Some(status), Some(kind)) => self.conn.query_row(
                "SELECT COUNT(id) FROM he_newsletter
                 WHERE delivery_status = ?1 AND delivery_type = ?2;",
                params![status.as_str(), kind.as_str()],
                |row| row.get(0),
            )?,
            (Some(status), None) => self.conn.query_row(
                "SELECT COUNT(id) FROM he_newsletter WHERE delivery_status = ?1;",
                [status.as_str()],
                |row| row.get(0),
            )?,
            (None, Some(kind)) => self.conn.query_row(
                "SELECT COUNT(id) FROM he_newsletter WHERE delivery_type = ?1;",
                [kind.as_str()],
                |row| row.get(0),
            )?,
            (None, None) => {
                self.conn
                    .query_row("SELECT COUNT(id) FROM he_newsletter;", [], |row| row.get(0))?
            }
        };
        count_to_u64(count)
    }

    fn newsletters_sent_out_over_time(&self, days: u32) -> RepoResult<Vec<DailySendCount>> {
        if days > MAX_SENT_OUT_WINDOW_DAYS {
            return Err(RepoError::WindowTooLarge {
                days,
                max: MAX_SENT_OUT_WINDOW_DAYS,
            });
        }

        let mut stmt = self.conn.prepare(
            "SELECT
                date(created_at / 1000, 'unixepoch') AS day,
                COUNT(*) AS count
             FROM he_newsletter
             WHERE created_at >= CAST(strftime('%s', date('now', ?1)) AS INTEGER) * 1000
               AND delivery_status = ?2
             GROUP BY day
             ORDER BY day ASC;",
        )?;
        let window = format!("-{days} days");
        let mut rows = stmt.query(params![window, DeliveryStatus::Finished.as_str()])?;
        let mut series = Vec::new();
        while let Some(row) = rows.next()? {
            series.push(DailySendCount {
                date: row.get("day")?,
                count: count_to_u64(row.get("count")?)?,
            });
        }
        Ok(series)
    }
}

fn parse_newsletter_row(row: &Row<'_>) -> RepoResult<Newsletter> {
    let status_text: String = row.get("delivery_status")?;
    let delivery_status = DeliveryStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid delivery status `{status_text}` in he_newsletter.delivery_status"
        ))
    })?;

    let type_text: String = row.get("delivery_type")?;
    let delivery_type = DeliveryType::parse(&type_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid delivery type `{type_text}` in he_newsletter.delivery_type"
        ))
    })?;

    Ok(Newsletter {
        id: Some(row.get("id")?),
        name: row.get("name")?,
        slug: row.get("slug")?,
        sender_name: row.get("sender_name")?,
        sender_email: row.get("sender_email")?,
        subject: row.get("subject")?,
        content: row.get("content")?,
        delivery_status,
        delivery_type,
        delivery_time: row.get("delivery_time")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
