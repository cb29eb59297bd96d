//! Ontology schema versions.
//!
//! The database holds one ontology snapshot in two tables: `kinds` (one row
//! per kind, with its parent and pre-order `position`) and `kind_properties`
//! (one row per kind/property pair, cascading on kind delete). Each schema
//! revision is one `NNNN_<name>.sql` script registered below.
//!
//! # Invariants
//! - Script versions start at 1 and increase by one per revision.
//! - `PRAGMA user_version` always equals the last script applied.
//! - A database stamped with a version newer than this build is left as is.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct SchemaScript {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_SCRIPTS: &[SchemaScript] = &[SchemaScript {
    version: 1,
    name: "ontology",
    sql: include_str!("0001_ontology.sql"),
}];

/// Schema version a fully migrated ontology database carries.
pub fn latest_version() -> u32 {
    SCHEMA_SCRIPTS.last().map_or(0, |script| script.version)
}

/// Brings the ontology schema up to [`latest_version`].
///
/// All pending scripts run in a single transaction; on failure the database
/// keeps its previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let to_version = latest_version();
    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }

    let mut pending = SCHEMA_SCRIPTS
        .iter()
        .skip_while(|script| script.version <= from_version)
        .peekable();
    if pending.peek().is_none() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for script in pending {
        tx.execute_batch(script.sql)?;
        tx.pragma_update(None, "user_version", script.version)?;
        debug!(
            "event=db_migrate_step module=db status=ok version={} name={}",
            script.version, script.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={to_version}");
    Ok(())
}

/// Schema version stamped in the database header; 0 for a fresh file.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
