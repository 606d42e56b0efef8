//! Ordered schema steps for the interventions database.
//!
//! # Invariants
//! - Step numbers start at 1 and grow by one.
//! - `PRAGMA user_version` holds the last step applied.
//! - All outstanding steps commit together or not at all.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

struct SchemaStep {
    number: u32,
    script: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    number: 1,
    script: include_str!("0001_interventions.sql"),
}];

/// Highest schema step this build can apply.
pub fn latest_version() -> u32 {
    SCHEMA_STEPS.len() as u32
}

/// Brings `conn` up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file was written by a newer build.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let on_disk = current_user_version(conn)?;
    let pending = pending_steps(on_disk)?;
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.script)?;
        tx.pragma_update(None, "user_version", step.number)?;
        info!(
            "event=db_migrate module=db status=ok step={}",
            step.number
        );
    }
    tx.commit()?;
    Ok(())
}

/// Reads `PRAGMA user_version`.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

fn pending_steps(on_disk: u32) -> DbResult<&'static [SchemaStep]> {
    let latest = latest_version();
    if on_disk > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: on_disk,
            latest_supported: latest,
        });
    }
    Ok(&SCHEMA_STEPS[on_disk as usize..])
}
