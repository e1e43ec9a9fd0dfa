use crate::types::FileType;

/// An archive row that collides with a file about to be downloaded.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ArchiveMatch {
    pub msg: String,
    pub hash: Vec<u8>,
    pub downloaded: Option<String>,
}

/// Everything the archive remembers about one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub file_id: i64,
    pub msg: String,
    pub msg_id: i32,
    pub chat_id: i64,
    pub chat_username: Option<String>,
    pub hash: Vec<u8>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub size: Option<i64>,
    pub duration: Option<f64>,
    pub file_type: FileType,
}
