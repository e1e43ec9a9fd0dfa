use serde::Serialize;
use sqlx::{Pool, Sqlite};

pub type HandlerResult<T = ()> = anyhow::Result<T>;

pub type DbConn = Pool<Sqlite>;

/// How a downloaded file is filed: which sub-directory it lands in and how
/// the archive labels it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, sqlx::Type)]
pub enum FileType {
    #[sqlx(rename = "images")]
    Image,
    #[sqlx(rename = "videos")]
    Video,
    #[sqlx(rename = "files")]
    Other,
}

impl FileType {
    /// Sub-directory under the chat directory; empty for plain files.
    pub fn path(&self) -> &'static str {
        match self {
            FileType::Image => "Photo",
            FileType::Video => "Video",
            FileType::Other => "",
        }
    }

    /// Label stored in the archive's `type` column.
    pub fn arc(&self) -> &'static str {
        match self {
            FileType::Image => "images",
            FileType::Video => "videos",
            FileType::Other => "files",
        }
    }
}

/// Declared metadata of a remote file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileAttribute {
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration: Option<f64>,
    pub size: Option<i64>,
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub id: i64,
}

/// Counts for one entity, taken at the moment of the call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntityStats {
    #[serde(rename = "type")]
    pub class: String,
    pub title: String,
    pub username: String,
    pub id: i64,
    pub medias: i64,
    pub files: i64,
    pub messages: i64,
}

impl EntityStats {
    /// Share of messages carrying a photo, video or document.
    ///
    /// `0.0` when the message count is unknown or zero.
    pub fn ratio(&self) -> f64 {
        if self.messages <= 0 {
            return 0.0;
        }
        (self.medias + self.files) as f64 / self.messages as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(medias: i64, files: i64, messages: i64) -> EntityStats {
        EntityStats {
            class: "Channel".to_string(),
            title: String::new(),
            username: String::new(),
            id: 1,
            medias,
            files,
            messages,
        }
    }

    #[test]
    fn ratio_counts_medias_and_files() {
        assert_eq!(stats(3, 1, 8).ratio(), 0.5);
    }

    #[test]
    fn ratio_is_zero_without_messages() {
        assert_eq!(stats(3, 1, 0).ratio(), 0.0);
        assert_eq!(stats(3, 1, -1).ratio(), 0.0);
    }

    #[test]
    fn file_type_labels() {
        assert_eq!(FileType::Video.path(), "Video");
        assert_eq!(FileType::Other.path(), "");
        assert_eq!(FileType::Image.arc(), "images");
    }
}
