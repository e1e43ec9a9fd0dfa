use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ::config::builder::DefaultState;
use ::config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Prefix of the environment variables layered over the config file,
/// e.g. `TG_UTIL_DOWNLOAD_THREADS=4`.
pub const ENV_PREFIX: &str = "TG_UTIL";

pub const DEFAULT_ARCHIVE: &str = "sqlite::memory:";
pub const DEFAULT_DOWNLOAD_THREADS: usize = 8;

/// Whether to go through a takeout session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Takeout {
    True,
    #[default]
    False,
    /// Try takeout, keep going on the plain session when it is refused.
    Fallback,
}

impl Takeout {
    pub fn enabled(self) -> bool {
        matches!(self, Takeout::True | Takeout::Fallback)
    }
}

impl FromStr for Takeout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Takeout::True),
            "false" | "0" | "no" | "off" => Ok(Takeout::False),
            "fallback" => Ok(Takeout::Fallback),
            other => Err(Error::InvalidInput(format!("invalid takeout mode: {:?}", other))),
        }
    }
}

impl<'de> Deserialize<'de> for Takeout {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Mode(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Takeout::True),
            Raw::Flag(false) => Ok(Takeout::False),
            Raw::Mode(mode) => mode.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Settings shared by the downloader and the exporter. Every field is
/// optional; unset fields fall back to the option defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub archive: Option<String>,
    pub debug: Option<bool>,
    pub download_path: Option<PathBuf>,
    pub download_threads: Option<usize>,
    pub export_path: Option<PathBuf>,
    pub min_ratio: Option<f64>,
    pub overwrite: Option<bool>,
    pub reverse_download: Option<bool>,
    pub single_url: Option<bool>,
    pub takeout: Option<Takeout>,
    pub thumbs_only: Option<bool>,
    pub to_db: Option<bool>,
    pub always_write_meta: Option<bool>,
    pub gzip: Option<bool>,
}

/// `TG_UTIL_*` variables; empty values count as unset.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).ignore_empty(true)
}

impl Config {
    /// YAML file at `path` (when it exists) overlaid with `env`.
    pub fn builder_with(path: Option<&Path>, env: Environment) -> ConfigBuilder<DefaultState> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            log::debug!("Loading config from {:?}", path);
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml).required(false));
        }
        builder.add_source(env)
    }

    /// YAML file at `path` overlaid with the `TG_UTIL_*` environment.
    pub fn builder(path: Option<&Path>) -> ConfigBuilder<DefaultState> {
        Config::builder_with(path, environment())
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Config> {
        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn load(path: Option<&Path>) -> Result<Config> {
        Config::from_builder(Config::builder(path))
    }

    pub fn from_yaml(text: &str) -> Result<Config> {
        Config::from_builder(::config::Config::builder().add_source(File::from_str(text, FileFormat::Yaml)))
    }

    pub fn debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    pub fn archive(&self) -> &str {
        self.archive.as_deref().unwrap_or(DEFAULT_ARCHIVE)
    }

    // takeout sessions are not flood limited
    fn wait_time(&self) -> Option<Duration> {
        if self.takeout.unwrap_or_default().enabled() {
            Some(Duration::ZERO)
        } else {
            None
        }
    }

    pub fn downloader_options(&self) -> DownloaderOptions {
        DownloaderOptions {
            download_path: self.download_path.clone().unwrap_or_else(|| PathBuf::from(".")),
            download_threads: self
                .download_threads
                .unwrap_or(DEFAULT_DOWNLOAD_THREADS)
                .max(1),
            overwrite: self.overwrite.unwrap_or(true),
            reverse_download: self.reverse_download.unwrap_or(false),
            single_url: self.single_url.unwrap_or(false),
            thumbs_only: self.thumbs_only.unwrap_or(false),
            always_write_meta: self.always_write_meta.unwrap_or(false),
            wait_time: self.wait_time(),
            progress: false,
        }
    }

    pub fn exporter_options(&self) -> ExporterOptions {
        ExporterOptions {
            export_path: self.export_path.clone().unwrap_or_else(|| PathBuf::from(".")),
            min_ratio: self.min_ratio.unwrap_or(0.0),
            to_db: self.to_db.unwrap_or(false),
            gzip: self.gzip.unwrap_or(false),
            wait_time: self.wait_time(),
            progress: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DownloaderOptions {
    /// Root under which per-chat directories are created.
    pub download_path: PathBuf,
    /// Validations and downloads in flight at once.
    pub download_threads: usize,
    /// Download again even when the target file exists.
    pub overwrite: bool,
    /// Walk id ranges oldest first.
    pub reverse_download: bool,
    /// Fetch only the linked message instead of everything after it.
    pub single_url: bool,
    /// Save the largest thumbnail instead of the media.
    pub thumbs_only: bool,
    /// Write meta sidecars for skipped messages too.
    pub always_write_meta: bool,
    pub wait_time: Option<Duration>,
    /// Draw a progress spinner on stderr.
    pub progress: bool,
}

impl Default for DownloaderOptions {
    fn default() -> Self {
        Config::default().downloader_options()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExporterOptions {
    pub export_path: PathBuf,
    /// Dialogs at or below this media to message ratio are not exported.
    pub min_ratio: f64,
    /// Mirror exported messages into the archive.
    pub to_db: bool,
    /// Compress chat exports, writing `<desc>.json.gz`.
    pub gzip: bool,
    pub wait_time: Option<Duration>,
    pub progress: bool,
}

impl Default for ExporterOptions {
    fn default() -> Self {
        Config::default().exporter_options()
    }
}
