use crate::database::entities::{ArchiveMatch, ArchiveRecord};
use crate::error::Result;
use crate::types::DbConn;
use crate::util;

/// First archived file that either has this hash or the same four declared
/// attributes.
pub async fn check_attr(
    db: &DbConn,
    hash: &[u8],
    width: Option<i32>,
    height: Option<i32>,
    size: Option<i64>,
    duration: Option<f64>,
) -> Result<Option<ArchiveMatch>> {
    log::debug!(
        "check_attr: width: {:?}, height: {:?}, size: {:?}, duration: {:?}",
        width,
        height,
        size,
        duration
    );

    // missing attributes never match
    let found = sqlx::query_as::<_, ArchiveMatch>(
        "SELECT msg, hash, downloaded FROM _archive_ \
            WHERE hash = $1 \
            OR (width = $2 AND height = $3 AND size = $4 AND duration = $5) \
            LIMIT 1",
    )
    .bind(hash)
    .bind(width)
    .bind(height)
    .bind(size)
    .bind(duration)
    .fetch_optional(db)
    .await?;

    log::debug!("check_attr: found: {:?}", found.as_ref().map(|m| &m.msg));

    Ok(found)
}

/// Message repr of a completed download of `file_id`.
pub async fn check_id(db: &DbConn, file_id: i64) -> Result<Option<String>> {
    log::debug!("check_id: {:?}", file_id);

    let msg = sqlx::query_scalar::<_, String>(
        "SELECT msg FROM _archive_ WHERE file_id = $1 AND downloaded IS NOT NULL",
    )
    .bind(file_id)
    .fetch_optional(db)
    .await?;

    log::debug!("check_id: found: {:?}", msg);

    Ok(msg)
}

/// Insert or replace the row for `record.file_id`. The download stamp is
/// cleared until [`set_complete`] runs again.
pub async fn update_archive(db: &DbConn, record: &ArchiveRecord) -> Result<()> {
    log::debug!("update_archive: {:?} from {:?}", record.file_id, record.msg);

    sqlx::query(
        "INSERT OR REPLACE INTO _archive_ \
            (file_id, msg, msg_id, chat_id, chat_username, hash, width, height, size, duration, downloaded, type) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NULL, $11)",
    )
    .bind(record.file_id)
    .bind(&record.msg)
    .bind(record.msg_id)
    .bind(record.chat_id)
    .bind(&record.chat_username)
    .bind(&record.hash)
    .bind(record.width)
    .bind(record.height)
    .bind(record.size)
    .bind(record.duration)
    .bind(record.file_type)
    .execute(db)
    .await?;

    log::debug!("update_archive: done");

    Ok(())
}

/// Stamp `file_id` as downloaded now.
pub async fn set_complete(db: &DbConn, file_id: i64) -> Result<()> {
    log::debug!("set_complete: {:?}", file_id);

    let result = sqlx::query("UPDATE _archive_ SET downloaded = $1 WHERE file_id = $2")
        .bind(util::now().format("%Y-%m-%d %H:%M:%S").to_string())
        .bind(file_id)
        .execute(db)
        .await?;

    log::debug!("set_complete: rows affected: {:?}", result.rows_affected());

    Ok(())
}

/// Number of archived files of each type, as `(type, count)`.
pub async fn archive_counts(db: &DbConn) -> Result<Vec<(String, i64)>> {
    log::debug!("archive_counts");

    let counts = sqlx::query_as::<_, (String, i64)>(
        "SELECT type, COUNT(*) FROM _archive_ GROUP BY type ORDER BY type",
    )
    .fetch_all(db)
    .await?;

    log::debug!("archive_counts: {:?}", counts);

    Ok(counts)
}
