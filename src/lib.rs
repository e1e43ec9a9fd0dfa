//! Utilities layered on a Telegram client: cached entity resolution, file
//! hashing through per-data-center senders, message iteration with reply
//! threads and metadata extraction, plus the downloader and exporter built on
//! them.

pub mod cli;
pub mod config;
pub mod database;
pub mod downloader;
pub mod error;
pub mod export;
pub mod exporter;
pub mod input;
pub mod links;
pub mod logging;
pub mod tg;
pub mod types;
pub mod util;

pub use error::{Error, Result};
