//! Subscriber meta repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Only records with an existing owning subscriber are persisted.
//! - Timestamps are written exactly as the record carries them.
//! - Per-subscriber listings are ordered by `name ASC, id ASC`.

use crate::model::subscriber::SubscriberId;
use crate::model::subscriber_meta::{SubscriberMeta, SubscriberMetaId};
use crate::model::ValidationError;
use crate::repo::schema_guard::ensure_table_ready;
use crate::repo::{count_to_u64, map_write_error, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const META_TABLE: &str = "he_subscriber_meta";
const META_COLUMNS: [&str; 6] = [
    "id",
    "name",
    "value",
    "subscriber_id",
    "created_at",
    "updated_at",
];

const META_SELECT_SQL: &str = "SELECT
    id,
    name,
    value,
    subscriber_id,
    created_at,
    updated_at
FROM he_subscriber_meta";

/// Repository interface for subscriber meta persistence.
pub trait SubscriberMetaRepository {
    /// Inserts when `id` is unset (and assigns it), updates otherwise.
    fn save(&self, meta: &mut SubscriberMeta) -> RepoResult<SubscriberMetaId>;
    fn remove(&self, id: SubscriberMetaId) -> RepoResult<()>;
    fn find_one_by_id(&self, id: SubscriberMetaId) -> RepoResult<Option<SubscriberMeta>>;
    fn find_by_subscriber(&self, subscriber_id: SubscriberId) -> RepoResult<Vec<SubscriberMeta>>;
    /// Returns the oldest record with `name` for the subscriber.
    fn find_one_by_subscriber_and_name(
        &self,
        subscriber_id: SubscriberId,
        name: &str,
    ) -> RepoResult<Option<SubscriberMeta>>;
    fn count_by_subscriber(&self, subscriber_id: SubscriberId) -> RepoResult<u64>;
}

/// SQLite-backed subscriber meta repository.
pub struct SqliteSubscriberMetaRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubscriberMetaRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, META_TABLE, &META_COLUMNS)?;
        Ok(Self { conn })
    }

    fn subscriber_exists(&self, subscriber_id: SubscriberId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT id FROM he_subscriber WHERE id = ?1;",
                [subscriber_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

impl SubscriberMetaRepository for SqliteSubscriberMetaRepository<'_> {
    fn save(&self, meta: &mut SubscriberMeta) -> RepoResult<SubscriberMetaId> {
        meta.validate()?;
        let subscriber_id = meta
            .subscriber_id()
            .ok_or(RepoError::Validation(ValidationError::MissingSubscriber))?;
        if !self.subscriber_exists(subscriber_id)? {
            return Err(RepoError::NotFound {
                entity: "subscriber",
                id: subscriber_id,
            });
        }

        if let Some(id) = meta.id() {
            let changed = self
                .conn
                .execute(
                    "UPDATE he_subscriber_meta
                     SET
                        name = ?1,
                        value = ?2,
                        subscriber_id = ?3,
                        created_at = ?4,
                        updated_at = ?5
                     WHERE id = ?6;",
                    params![
                        meta.name(),
                        meta.value(),
                        subscriber_id,
                        meta.created_at(),
                        meta.updated_at(),
                        id,
                    ],
                )
                .map_err(|err| map_write_error(err, "subscriber meta rejected"))?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "subscriber meta",
                    id,
                });
            }
            return Ok(id);
        }

        self.conn
            .execute(
                "INSERT INTO he_subscriber_meta (
                    name,
                    value,
                    subscriber_id,
                    created_at,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5);",
                params![
                    meta.name(),
                    meta.value(),
                    subscriber_id,
                    meta.created_at(),
                    meta.updated_at(),
                ],
            )
            .map_err(|err| map_write_error(err, "subscriber meta rejected"))?;
        let id = self.conn.last_insert_rowid();
        meta.set_id(id);
        Ok(id)
    }

    fn remove(&self, id: SubscriberMetaId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM he_subscriber_meta WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "subscriber meta",
                id,
            });
        }
        Ok(())
    }

    fn find_one_by_id(&self, id: SubscriberMetaId) -> RepoResult<Option<SubscriberMeta>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{META_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_meta_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_by_subscriber(&self, subscriber_id: SubscriberId) -> RepoResult<Vec<SubscriberMeta>> {
        let mut stmt = self.conn.prepare(&format!(
            "{META_SELECT_SQL}
             WHERE subscriber_id = ?1
             ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([subscriber_id])?;
        let mut metas = Vec::new();
        while let Some(row) = rows.next()? {
            metas.push(parse_meta_row(row)?);
        }
        Ok(metas)
    }

    fn find_one_by_subscriber_and_name(
        &self,
        subscriber_id: SubscriberId,
        name: &str,
    ) -> RepoResult<Option<SubscriberMeta>> {
        let mut stmt = self.conn.prepare(&format!(
            "{META_SELECT_SQL}
             WHERE subscriber_id = ?1
               AND name = ?2
             ORDER BY id ASC
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![subscriber_id, name])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_meta_row(row)?)),
            None => Ok(None),
        }
    }

    fn count_by_subscriber(&self, subscriber_id: SubscriberId) -> RepoResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(id) FROM he_subscriber_meta WHERE subscriber_id = ?1;",
            [subscriber_id],
            |row| row.get(0),
        )?;
        count_to_u64(count)
    }
}

fn parse_meta_row(row: &Row<'_>) -> RepoResult<SubscriberMeta> {
    let id: SubscriberMetaId = row.get("id")?;
    let mut meta = SubscriberMeta::default();
    meta.set_id(id)
        .set_name(row.get::<_, String>("name")?)
        .set_value(row.get("value")?)
        .set_subscriber_id(row.get("subscriber_id")?)
        .set_created_at(row.get("created_at")?)
        .set_updated_at(row.get("updated_at")?);
    Ok(meta)
}
