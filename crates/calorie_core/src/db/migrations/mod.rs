//! Calorie schema migrations.
//!
//! # Invariants
//! - Versions start at 1 and increase by exactly one per step; the registry
//!   is checked before anything touches the database.
//! - An upgrade runs in one transaction: either every pending step lands and
//!   `user_version` moves to the latest, or nothing changes.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: include_str!("0001_init.sql"),
    },
    Migration {
        version: 2,
        sql: include_str!("0002_timeline_index.sql"),
    },
];

/// Latest schema version this build can read.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Upgrades the calorie schema on `conn` to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_registry(conn, MIGRATIONS)
}

fn apply_registry(conn: &mut Connection, registry: &[Migration]) -> DbResult<()> {
    check_order(registry)?;
    let latest = registry.last().map_or(0, |migration| migration.version);
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;

    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in &registry[current as usize..] {
        tx.execute_batch(migration.sql)
            .and_then(|()| {
                tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
            })
            .map_err(|source| DbError::Migration {
                version: migration.version,
                source,
            })?;
        debug!(
            "event=db_migrate_step module=db status=ok version={}",
            migration.version
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={current} to_version={latest}");
    Ok(())
}

/// Versions must read 1, 2, 3, ... so `user_version` indexes the registry.
fn check_order(registry: &[Migration]) -> DbResult<()> {
    let mut previous = 0;
    for migration in registry {
        if migration.version != previous + 1 {
            return Err(DbError::MigrationOrder {
                previous,
                next: migration.version,
            });
        }
        previous = migration.version;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{apply_registry, check_order, latest_version, Migration, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    const CREATE_T: &str = "CREATE TABLE t (id INTEGER);";

    fn user_version(conn: &Connection) -> u32 {
        conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn shipped_registry_is_ordered() {
        assert!(check_order(MIGRATIONS).is_ok());
        assert_eq!(latest_version(), MIGRATIONS.len() as u32);
    }

    #[test]
    fn gaps_and_repeats_are_rejected() {
        let repeated = [
            Migration { version: 1, sql: CREATE_T },
            Migration { version: 1, sql: CREATE_T },
        ];
        assert!(matches!(
            check_order(&repeated),
            Err(DbError::MigrationOrder { previous: 1, next: 1 })
        ));

        let gap = [Migration { version: 2, sql: CREATE_T }];
        assert!(matches!(
            check_order(&gap),
            Err(DbError::MigrationOrder { previous: 0, next: 2 })
        ));
    }

    #[test]
    fn failing_step_rolls_back_whole_upgrade() {
        let mut conn = Connection::open_in_memory().unwrap();
        let registry = [
            Migration { version: 1, sql: CREATE_T },
            Migration {
                version: 2,
                sql: "CREATE TABL broken;",
            },
        ];

        let err = apply_registry(&mut conn, &registry).unwrap_err();
        assert!(matches!(err, DbError::Migration { version: 2, .. }));
        assert_eq!(err.code(), "migration_failed");
        assert_eq!(user_version(&conn), 0);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 't';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn partial_schema_is_upgraded_from_its_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_registry(&mut conn, &MIGRATIONS[..1]).unwrap();
        assert_eq!(user_version(&conn), 1);

        apply_registry(&mut conn, MIGRATIONS).unwrap();
        assert_eq!(user_version(&conn), latest_version());
    }
}
