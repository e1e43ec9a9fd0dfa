use crate::error::Result;
use crate::export::MessageExport;
use crate::types::DbConn;

/// Insert or replace the `_all_chats_` row of one message.
pub async fn export_message(db: &DbConn, row: &MessageExport) -> Result<()> {
    log::debug!(
        "export_message: chat_id: {:?}, message_id: {:?}",
        row.chat_id,
        row.message_id
    );

    sqlx::query(
        "INSERT OR REPLACE INTO _all_chats_ \
            (date, chat_id, chat_name, chat_username, message_id, text, clean_text, \
            has_photo, has_video, size, human_readable_size, width, height, resolution, \
            duration, duration_sec, views, forwards, reactions, file_name, file_id, file_uid, \
            grouped_id, sender_id, sender_name, sender_username, hashtags, fetch_date) \
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
            $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28)",
    )
    .bind(row.date)
    .bind(row.chat_id)
    .bind(&row.chat_name)
    .bind(&row.chat_username)
    .bind(row.message_id)
    .bind(&row.text)
    .bind(&row.clean_text)
    .bind(row.has_photo)
    .bind(row.has_video)
    .bind(row.size)
    .bind(&row.human_readable_size)
    .bind(row.width)
    .bind(row.height)
    .bind(&row.resolution)
    .bind(&row.duration)
    .bind(row.duration_sec)
    .bind(row.views)
    .bind(row.forwards)
    .bind(row.reactions)
    .bind(&row.file_name)
    .bind(row.file_id)
    .bind(row.file_uid)
    .bind(row.grouped_id)
    .bind(row.sender_id)
    .bind(&row.sender_name)
    .bind(&row.sender_username)
    .bind(&row.hashtags)
    .bind(row.fetch_date)
    .execute(db)
    .await?;

    log::debug!("export_message: done");

    Ok(())
}

/// Exported rows of one chat, oldest message first.
pub async fn get_chat_export(db: &DbConn, chat_id: i64) -> Result<Vec<MessageExport>> {
    log::debug!("get_chat_export: {:?}", chat_id);

    let rows = sqlx::query_as::<_, MessageExport>(
        "SELECT * FROM _all_chats_ WHERE chat_id = $1 ORDER BY message_id",
    )
    .bind(chat_id)
    .fetch_all(db)
    .await?;

    log::debug!("get_chat_export: {:?} rows", rows.len());

    Ok(rows)
}
