use thiserror::Error;

/// Errors surfaced by the utilities and the archive.
#[derive(Error, Debug)]
pub enum Error {
    #[error("entity not found: {0}")]
    EntityNotFound(String),
    /// The file location is stale or malformed (`LOCATION_INVALID`).
    #[error("file location is invalid")]
    LocationInvalid,
    /// The file reference inside the location expired and the message must
    /// be fetched again (`FILE_REFERENCE_EXPIRED`).
    #[error("file reference expired")]
    FileReferenceExpired,
    #[error("channel is private")]
    ChannelPrivate,
    #[error("unsupported media: {0}")]
    UnsupportedMedia(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i32, message: String },
    #[error("archive backend not supported: {0}")]
    UnsupportedArchive(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ::config::ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
