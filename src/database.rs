use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

use crate::error::{Error, Result};
use crate::types::DbConn;

pub mod entities;
pub mod queries;

pub use entities::*;

/// Open the archive named by `url`.
///
/// Accepts `sqlite::memory:`, `sqlite://<path>` and `sqlite3://<path>`.
/// PostgreSQL and MySQL urls are recognised but refused with
/// [`Error::UnsupportedArchive`].
pub async fn open(url: &str) -> Result<DbConn> {
    log::debug!("Opening archive {:?}", url);

    let (scheme, rest) = url
        .split_once(':')
        .ok_or_else(|| Error::InvalidInput(format!("not a database url: {}", url)))?;
    let normalized = match scheme.to_ascii_lowercase().as_str() {
        "sqlite" | "sqlite3" => format!("sqlite:{}", rest),
        other @ ("postgres" | "postgresql" | "mysql" | "mysqlx") => {
            return Err(Error::UnsupportedArchive(other.to_string()))
        }
        other => {
            return Err(Error::InvalidInput(format!(
                "unknown database scheme: {}",
                other
            )))
        }
    };

    let in_memory = rest == ":memory:" || rest.contains("mode=memory");
    let mut options = SqliteConnectOptions::from_str(&normalized)?.create_if_missing(true);

    // every pooled connection to :memory: would see its own empty database
    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        SqlitePoolOptions::new()
    };

    let db = pool.connect_with(options).await?;
    log::debug!("Successfully opened archive");
    Ok(db)
}

/// Create or migrate the archive tables.
pub async fn prepare(db: &DbConn) -> Result<()> {
    log::debug!("Migrating archive");
    sqlx::migrate!("./migrations").run(db).await?;
    Ok(())
}

/// [`open`] followed by [`prepare`].
pub async fn open_prepared(url: &str) -> Result<DbConn> {
    let db = open(url).await?;
    prepare(&db).await?;
    Ok(db)
}
