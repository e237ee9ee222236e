//! Subscriber repository contracts and SQLite implementation.
//!
//! Removing a subscriber cascades to its `he_subscriber_meta` rows through the
//! foreign key, so connections must come from `db::open_db*`.

use crate::model::subscriber::{Subscriber, SubscriberId, SubscriberStatus};
use crate::repo::schema_guard::ensure_table_ready;
use crate::repo::{count_to_u64, map_write_error, RepoError, RepoResult};
use rusqlite::{params, Connection, Row, ToSql};

const SUBSCRIBER_TABLE: &str = "he_subscriber";
const SUBSCRIBER_COLUMNS: [&str; 5] = ["id", "email", "status", "created_at", "updated_at"];

const SUBSCRIBER_SELECT_SQL: &str = "SELECT
    id,
    email,
    status,
    created_at,
    updated_at
FROM he_subscriber";

/// Repository interface for subscriber persistence.
pub trait SubscriberRepository {
    /// Inserts when `id` is unset (and assigns it), updates otherwise.
    fn save(&self, subscriber: &mut Subscriber) -> RepoResult<SubscriberId>;
    fn remove(&self, id: SubscriberId) -> RepoResult<()>;
    fn find_one_by_id(&self, id: SubscriberId) -> RepoResult<Option<Subscriber>>;
    /// Case-insensitive email lookup.
    fn find_one_by_email(&self, email: &str) -> RepoResult<Option<Subscriber>>;
    fn count_all(&self, status: Option<SubscriberStatus>) -> RepoResult<u64>;
}

/// SQLite-backed subscriber repository.
pub struct SqliteSubscriberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubscriberRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, SUBSCRIBER_TABLE, &SUBSCRIBER_COLUMNS)?;
        Ok(Self { conn })
    }

    fn find_one_where(&self, clause: &str, key: &dyn ToSql) -> RepoResult<Option<Subscriber>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUBSCRIBER_SELECT_SQL} WHERE {clause};"))?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_subscriber_row(row)?)),
            None => Ok(None),
        }
    }
}

impl SubscriberRepository for SqliteSubscriberRepository<'_> {
    fn save(&self, subscriber: &mut Subscriber) -> RepoResult<SubscriberId> {
        subscriber.validate()?;

        if let Some(id) = subscriber.id {
            let changed = self
                .conn
                .execute(
                    "UPDATE he_subscriber
                     SET
                        email = ?1,
                        status = ?2,
                        created_at = ?3,
                        updated_at = ?4
                     WHERE id = ?5;",
                    params![
                        subscriber.email,
                        subscriber.status.as_str(),
                        subscriber.created_at,
                        subscriber.updated_at,
                        id,
                    ],
                )
                .map_err(|err| map_write_error(err, "subscriber email already exists"))?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "subscriber",
                    id,
                });
            }
            return Ok(id);
        }

        self.conn
            .execute(
                "INSERT INTO he_subscriber (email, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    subscriber.email,
                    subscriber.status.as_str(),
                    subscriber.created_at,
                    subscriber.updated_at,
                ],
            )
            .map_err(|err| map_write_error(err, "subscriber email already exists"))?;
        let id = self.conn.last_insert_rowid();
        subscriber.id = Some(id);
        Ok(id)
    }

    fn remove(&self, id: SubscriberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM he_subscriber WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "subscriber",
                id,
            });
        }
        Ok(())
    }

    fn find_one_by_id(&self, id: SubscriberId) -> RepoResult<Option<Subscriber>> {
        self.find_one_where("id = ?1", &id)
    }

    fn find_one_by_email(&self, email: &str) -> RepoResult<Option<Subscriber>> {
        self.find_one_where("email = ?1 COLLATE NOCASE", &email.trim())
    }

    fn count_all(&self, status: Option<SubscriberStatus>) -> RepoResult<u64> {
        let count: i64 = match status {
            Some(status) => self.conn.query_row(
                "SELECT COUNT(id) FROM he_subscriber WHERE status = ?1;",
                [status.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(id) FROM he_subscriber;", [], |row| row.get(0))?,
        };
        count_to_u64(count)
    }
}

fn parse_subscriber_row(row: &Row<'_>) -> RepoResult<Subscriber> {
    let status_text: String = row.get("status")?;
    let status = SubscriberStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid subscriber status `{status_text}` in he_subscriber.status"
        ))
    })?;

    Ok(Subscriber {
        id: Some(row.get("id")?),
        email: row.get("email")?,
        status,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
