//! Versioned schema for the profile database.
//!
//! Applied versions are recorded in `schema_migrations`, so opening an
//! existing profile only runs what is new.

use std::collections::HashSet;

use rusqlite::{params, Connection};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    /// One or more statements
    pub sql: &'static str,
}

/// Append only. Versions must stay ascending.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_profile_store",
        sql: r#"
            CREATE TABLE IF NOT EXISTS profile_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "index_profile_store_updated_at",
        sql: r#"
            CREATE INDEX IF NOT EXISTS idx_profile_store_updated
                ON profile_store(updated_at);
        "#,
    },
];

fn applied_versions(conn: &Connection) -> rusqlite::Result<HashSet<i64>> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;
    let mut stmt = conn.prepare("SELECT version FROM schema_migrations")?;
    let versions = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<HashSet<i64>>>()?;
    Ok(versions)
}

/// Bring the schema up to date. Each migration commits together with its
/// bookkeeping row.
pub fn run_migrations(conn: &mut Connection) -> rusqlite::Result<()> {
    let applied = applied_versions(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| !applied.contains(&m.version)) {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Migrating profile database"
        );

        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql).inspect_err(|e| {
            tracing::error!(version = migration.version, error = %e, "Migration failed");
        })?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![
                migration.version,
                migration.name,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;
    }

    Ok(())
}
