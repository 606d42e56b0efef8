//! On-device SQLite store.
//!
//! # Responsibility
//! - Persist the intervention collection in a durable local slot.
//! - Emit committed mutations on an in-process change feed so engines
//!   sharing this store observe each other's writes.
//!
//! # Invariants
//! - Only migrated connections are accepted.
//! - `create` never overwrites an existing row; a retry returns the stored row.
//! - Events are emitted only for statements that changed a row.

use super::change_feed::{ChangeFeed, Subscription};
use super::{PushEvent, Store, StoreError, StoreResult};
use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::intervention::Intervention;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::mpsc::Sender;
use uuid::Uuid;

const INTERVENTION_SELECT_SQL: &str = "SELECT
    id,
    date,
    brand,
    model,
    serial_number,
    meter_reading,
    fault,
    resolution,
    comment
FROM interventions";

/// SQLite-backed implementation of [`Store`].
pub struct LocalStore {
    conn: Connection,
    feed: ChangeFeed,
}

impl LocalStore {
    /// Opens (or creates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Wraps an already opened connection.
    ///
    /// # Errors
    /// - `DbError::SchemaNotReady` when migrations have not been applied.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        let db_version = current_user_version(&conn)?;
        let expected = latest_version();
        if db_version != expected {
            return Err(DbError::SchemaNotReady {
                db_version,
                expected,
            }
            .into());
        }

        Ok(Self {
            conn,
            feed: ChangeFeed::new(),
        })
    }

    /// Feed carrying this store's committed mutations.
    pub fn change_feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Loads one row by id.
    pub fn get(&self, id: &str) -> StoreResult<Option<Intervention>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INTERVENTION_SELECT_SQL} WHERE id = ?1;"))?;
        let record = stmt.query_row([id], parse_intervention_row).optional()?;
        Ok(record)
    }
}

impl Store for LocalStore {
    fn create(&self, record: &Intervention) -> StoreResult<Intervention> {
        let mut persisted = record.clone();
        if persisted.id.is_empty() {
            persisted.id = Uuid::new_v4().to_string();
        }

        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO interventions (
                id,
                date,
                brand,
                model,
                serial_number,
                meter_reading,
                fault,
                resolution,
                comment
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                persisted.id,
                persisted.date,
                persisted.brand,
                persisted.model,
                persisted.serial_number,
                persisted.meter_reading,
                persisted.fault,
                persisted.resolution,
                persisted.comment,
            ],
        )?;

        if changed == 0 {
            debug!(
                "event=store_create module=local_store status=duplicate id={}",
                persisted.id
            );
            return self
                .get(&persisted.id)?
                .ok_or(StoreError::NotFound(persisted.id));
        }

        let delivered = self.feed.emit(PushEvent::Inserted(persisted.clone()));
        debug!(
            "event=store_create module=local_store status=ok id={} subscribers={delivered}",
            persisted.id
        );
        Ok(persisted)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM interventions WHERE id = ?1;", [id])?;

        if changed > 0 {
            let delivered = self.feed.emit(PushEvent::Deleted(id.to_string()));
            debug!(
                "event=store_delete module=local_store status=ok id={id} subscribers={delivered}"
            );
        } else {
            debug!("event=store_delete module=local_store status=absent id={id}");
        }
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Intervention>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{INTERVENTION_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let records = stmt
            .query_map([], parse_intervention_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn subscribe(&self, sink: Sender<PushEvent>) -> StoreResult<Option<Subscription>> {
        Ok(Some(self.feed.subscribe(sink)))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}

fn parse_intervention_row(row: &Row<'_>) -> rusqlite::Result<Intervention> {
    Ok(Intervention {
        id: row.get("id")?,
        date: row.get("date")?,
        brand: row.get("brand")?,
        model: row.get("model")?,
        serial_number: row.get("serial_number")?,
        meter_reading: row.get("meter_reading")?,
        fault: row.get("fault")?,
        resolution: row.get("resolution")?,
        comment: row.get("comment")?,
    })
}
