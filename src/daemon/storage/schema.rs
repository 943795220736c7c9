use rusqlite::{Connection, Transaction};
use tracing::info;

use super::StoreError;

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS app_usage (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    date             TEXT NOT NULL,
    app_name         TEXT NOT NULL,
    duration_seconds INTEGER NOT NULL CHECK (duration_seconds >= 0),
    last_updated     TEXT NOT NULL,
    UNIQUE(date, app_name)
);

CREATE TABLE IF NOT EXISTS day_summary (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    date          TEXT NOT NULL UNIQUE,
    total_seconds INTEGER NOT NULL DEFAULT 0 CHECK (total_seconds >= 0),
    app_count     INTEGER NOT NULL DEFAULT 0,
    last_updated  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_app_usage_date ON app_usage(date);
CREATE INDEX IF NOT EXISTS idx_app_usage_app ON app_usage(app_name);
"#;

/// Brings the schema up to [CURRENT_SCHEMA_VERSION]. Versions are tracked in `user_version`.
pub fn run_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let mut version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::SchemaTooNew {
            found: version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if version == CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let tx = conn.transaction()?;
    while version < CURRENT_SCHEMA_VERSION {
        version += 1;
        apply_migration(&tx, version)?;
        info!("Applied schema migration {version}");
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}

fn apply_migration(tx: &Transaction<'_>, version: i32) -> Result<(), StoreError> {
    match version {
        1 => tx.execute_batch(SCHEMA_V1)?,
        _ => unreachable!("no migration for schema version {version}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{run_migrations, CURRENT_SCHEMA_VERSION};
    use crate::daemon::storage::StoreError;

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn schema_matches_data_model() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        assert_eq!(
            table_columns(&conn, "app_usage"),
            ["id", "date", "app_name", "duration_seconds", "last_updated"]
        );
        assert_eq!(
            table_columns(&conn, "day_summary"),
            ["id", "date", "total_seconds", "app_count", "last_updated"]
        );
        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
    }

    #[test]
    fn newer_schema_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION + 1)
            .unwrap();
        assert!(matches!(
            run_migrations(&mut conn),
            Err(StoreError::SchemaTooNew { .. })
        ));
    }
}
