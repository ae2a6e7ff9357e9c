//! Opening the costing database: per-connection pragmas and the schema.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{debug, info};

/// Pragmas applied to every pooled connection. Cascading deletes of a
/// shipment's child rows depend on `foreign_keys`.
const CONNECTION_PRAGMAS: [&str; 3] = [
    "PRAGMA foreign_keys = ON",
    "PRAGMA busy_timeout = 5000",
    "PRAGMA synchronous = NORMAL",
];

/// Open the shipment database at `db_path`, creating the file and its parent
/// directory on first use, and bring the schema up to date.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { prepare_connection(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    let statements = apply_schema(&pool).await?;
    info!(path = %db_path, statements, "Costing database ready");
    Ok(pool)
}

/// Run every statement of `schema.sql`. All of them are `IF NOT EXISTS`, so
/// reopening an existing database changes nothing.
async fn apply_schema(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let mut applied = 0;
    for statement in include_str!("schema.sql")
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sqlx::query(statement).execute(pool).await?;
        applied += 1;
    }
    Ok(applied)
}

async fn prepare_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    for pragma in CONNECTION_PRAGMAS {
        sqlx::query(pragma).execute(&mut *conn).await?;
    }
    // SQLite may refuse WAL (e.g. on some network filesystems) and report
    // the mode it kept instead.
    let journal_mode: String = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?
        .get(0);
    debug!(%journal_mode, "Prepared SQLite connection");
    Ok(())
}
