//! Command line front ends for the downloader (`tg-dl`) and the exporter
//! (`tg-exp`).
//!
//! The Telegram connection is not made here. A backend parses the arguments,
//! connects its [`TelegramClient`] with `--session`/`--proxy` and hands it to
//! [`download`] or [`export`]:
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> tg_util::types::HandlerResult {
//!     let args = DownloaderArgs::parse();
//!     let config = tg_util::logging::init_from(args.config_builder()?)?;
//!     let client = MyClient::connect(args.common.session.as_deref()).await?;
//!     tg_util::cli::download(client, &args, &config).await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;

use ::config::builder::DefaultState;
use ::config::ConfigBuilder;
use clap::{Args, Parser};

use crate::config::Config;
use crate::database;
use crate::downloader::{prompt_ids, DownloadResult, Downloader, Mode, Outcome};
use crate::error::Result;
use crate::exporter::{ChatExport, Exporter};
use crate::links::parse_url_group;
use crate::tg::{EntityRef, TelegramClient};
use crate::types::HandlerResult;

// `--x` / `--no-x` pairs; unset leaves the config value alone
fn flag(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn parse_entity_ref(s: &str) -> std::result::Result<EntityRef, Infallible> {
    Ok(EntityRef::from(s))
}

fn path_value(path: Option<&PathBuf>) -> Option<String> {
    path.map(|p| p.to_string_lossy().into_owned())
}

/// Options both tools share.
#[derive(Args, Clone, Debug, Default, PartialEq)]
pub struct CommonArgs {
    /// Enable debug log
    #[arg(short = 'v', long = "verbose")]
    pub debug: bool,

    /// Archive database
    #[arg(short, long, value_name = "sqlite://PATH")]
    pub archive: Option<String>,

    /// Session handed to the client backend
    #[arg(short, long, value_name = "URL")]
    pub session: Option<String>,

    /// Load config from FILE
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Proxy handed to the client backend
    #[arg(long, value_name = "{http,socks4,socks5}://user:pass@host:port")]
    pub proxy: Option<String>,

    /// Use a takeout session
    #[arg(long, overrides_with = "no_takeout")]
    pub takeout: bool,

    #[arg(long, overrides_with = "takeout", hide = true)]
    pub no_takeout: bool,
}

impl CommonArgs {
    fn overrides(&self, builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
        Ok(builder
            .set_override_option("debug", self.debug.then_some(true))?
            .set_override_option("archive", self.archive.clone())?
            .set_override_option("takeout", flag(self.takeout, self.no_takeout))?)
    }
}

#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "tg-dl")]
#[command(about = "Download media from Telegram chats, skipping files already archived")]
#[command(version)]
pub struct DownloaderArgs {
    /// Message links, t.me/<chat>/<id> or t.me/c/<chat id>/<id>
    #[arg(value_name = "URL", value_parser = parse_url_group)]
    pub urls: Vec<(EntityRef, i32)>,

    /// Download root (default: current directory)
    #[arg(short = 'p', long, value_name = "PATH")]
    pub download_path: Option<PathBuf>,

    /// Downloads in flight at once (default: 8)
    #[arg(short = 't', long, value_name = "NUM")]
    pub download_threads: Option<u32>,

    /// Overwrite downloaded files (default: true)
    #[arg(long, overrides_with = "no_overwrite")]
    pub overwrite: bool,

    #[arg(long, overrides_with = "overwrite", hide = true)]
    pub no_overwrite: bool,

    /// Download links in ascending order
    #[arg(long, overrides_with = "no_reverse_download")]
    pub reverse_download: bool,

    #[arg(long, overrides_with = "reverse_download", hide = true)]
    pub no_reverse_download: bool,

    /// Only fetch the linked message of each link
    #[arg(long, overrides_with = "no_single_url")]
    pub single_url: bool,

    #[arg(long, overrides_with = "single_url", hide = true)]
    pub no_single_url: bool,

    /// Download only the thumbnails of videos
    #[arg(long, overrides_with = "no_thumbs_only")]
    pub thumbs_only: bool,

    #[arg(long, overrides_with = "thumbs_only", hide = true)]
    pub no_thumbs_only: bool,

    /// Ask for a chat and message ids even when links or a file are given
    #[arg(short, long)]
    pub interactive: bool,

    /// Download the links listed in FILE, marking each line when done
    #[arg(short = 'f', value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// `--meta=always` writes meta files for skipped messages too
    #[arg(long, value_name = "WHEN", value_parser = ["always"])]
    pub meta: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl DownloaderArgs {
    /// Config file, then `TG_UTIL_*` variables, then these arguments.
    pub fn config_builder(&self) -> Result<ConfigBuilder<DefaultState>> {
        self.overrides(Config::builder(self.common.config.as_deref()))
    }

    pub fn overrides(&self, builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
        Ok(self
            .common
            .overrides(builder)?
            .set_override_option("download_path", path_value(self.download_path.as_ref()))?
            .set_override_option("download_threads", self.download_threads.map(i64::from))?
            .set_override_option("overwrite", flag(self.overwrite, self.no_overwrite))?
            .set_override_option(
                "reverse_download",
                flag(self.reverse_download, self.no_reverse_download),
            )?
            .set_override_option("single_url", flag(self.single_url, self.no_single_url))?
            .set_override_option("thumbs_only", flag(self.thumbs_only, self.no_thumbs_only))?
            .set_override_option("always_write_meta", self.meta.as_ref().map(|_| true))?)
    }

    /// The input file when given, else the links, else the interactive
    /// prompt. `-i` always prompts.
    pub fn mode<R: BufRead, W: Write>(&self, input: R, output: W) -> Result<Mode> {
        if !self.interactive {
            if let Some(file) = &self.file {
                return Ok(Mode::File(file.clone()));
            }
            if !self.urls.is_empty() {
                return Ok(Mode::Urls(self.urls.clone()));
            }
        }
        prompt_ids(input, output)
    }
}

#[derive(Parser, Clone, Debug, PartialEq)]
#[command(name = "tg-exp")]
#[command(about = "Export Telegram chats as JSON lines")]
#[command(version)]
pub struct ExporterArgs {
    /// User, chat or channel id or username; every dialog when omitted
    #[arg(value_name = "ID", value_parser = parse_entity_ref)]
    pub ids: Vec<EntityRef>,

    /// Export directory (default: current directory)
    #[arg(short = 'p', long, value_name = "PATH")]
    pub export_path: Option<PathBuf>,

    /// Minimum media to message ratio of exported dialogs
    #[arg(long = "min-ratio", alias = "mr", value_name = "NUM")]
    pub min_ratio: Option<f64>,

    /// Also export into the archive database
    #[arg(long)]
    pub to_db: bool,

    /// Write `<chat>.json.gz`
    #[arg(long)]
    pub gzip: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

impl ExporterArgs {
    /// Config file, then `TG_UTIL_*` variables, then these arguments.
    pub fn config_builder(&self) -> Result<ConfigBuilder<DefaultState>> {
        self.overrides(Config::builder(self.common.config.as_deref()))
    }

    pub fn overrides(&self, builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
        Ok(self
            .common
            .overrides(builder)?
            .set_override_option("export_path", path_value(self.export_path.as_ref()))?
            .set_override_option("min_ratio", self.min_ratio)?
            .set_override_option("to_db", self.to_db.then_some(true))?
            .set_override_option("gzip", self.gzip.then_some(true))?)
    }
}

/// Run `tg-dl` with a connected client. Prompts on stdin when neither links
/// nor a file were given.
pub async fn download<C: TelegramClient>(
    client: C,
    args: &DownloaderArgs,
    config: &Config,
) -> HandlerResult<Vec<DownloadResult>> {
    let mode = args.mode(std::io::stdin().lock(), std::io::stdout())?;
    let db = database::open(config.archive()).await?;
    let options = crate::config::DownloaderOptions {
        progress: std::io::stderr().is_terminal(),
        ..config.downloader_options()
    };

    let results = Downloader::new(client, db, options).run(mode).await?;

    let downloaded = results.iter().filter(|r| r.success()).count();
    let failed = results
        .iter()
        .filter(|r| matches!(r.outcome, Outcome::Failed(_)))
        .count();
    log::info!(
        "{} downloaded, {} skipped, {} failed",
        downloaded,
        results.len() - downloaded - failed,
        failed
    );
    Ok(results)
}

/// Run `tg-exp` with a connected client.
pub async fn export<C: TelegramClient>(
    client: C,
    args: &ExporterArgs,
    config: &Config,
) -> HandlerResult<Vec<ChatExport>> {
    let options = crate::config::ExporterOptions {
        progress: std::io::stderr().is_terminal(),
        ..config.exporter_options()
    };
    let db = if options.to_db {
        Some(database::open(config.archive()).await?)
    } else {
        None
    };

    let exports = Exporter::new(client, db, options).run(&args.ids).await?;
    log::info!("exported {} chats", exports.len());
    Ok(exports)
}
