use rusqlite::{Connection, Transaction};
use tracing::info;

use super::VisitError;

const CURRENT_SCHEMA_VERSION: i32 = 1;

pub fn run_migrations(conn: &mut Connection) -> Result<(), VisitError> {
    let mut version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(VisitError::Schema(format!(
            "database version ({}) is newer than supported schema ({})",
            version, CURRENT_SCHEMA_VERSION
        )));
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;

    while version < CURRENT_SCHEMA_VERSION {
        let next_version = version + 1;
        apply_migration(&tx, next_version)?;
        version = next_version;
    }

    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;

    info!(version = CURRENT_SCHEMA_VERSION, "Visit log schema migrated");
    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<(), VisitError> {
    match version {
        1 => {
            tx.execute_batch(include_str!("schema_v1.sql"))?;
            Ok(())
        }
        _ => Err(VisitError::Schema(format!(
            "unknown migration target version: {}",
            version
        ))),
    }
}
