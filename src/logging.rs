use std::path::Path;

use ::config::builder::DefaultState;
use ::config::ConfigBuilder;
use log::LevelFilter;

use crate::config::Config;
use crate::error::Result;

/// Install the global logger. This crate logs at `debug` or `info`,
/// everything else at `error`. `RUST_LOG` is applied on top when set.
pub fn setup_logging(debug: bool) {
    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder
        .filter_level(LevelFilter::Error)
        .filter_module(
            module_path!().split("::").next().unwrap_or("tg_util"),
            if debug { LevelFilter::Debug } else { LevelFilter::Info },
        );
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // a logger may already be installed, e.g. by another test
    if builder.try_init().is_err() {
        log::debug!("Logger already initialised");
    }
}

/// Load `.env`, the optional YAML config and the `TG_UTIL_*` overrides, then
/// set up logging.
pub fn init(config_path: Option<&Path>) -> Result<Config> {
    init_from(Config::builder(config_path))
}

/// Like [`init`], for a builder that already carries command line overrides.
pub fn init_from(builder: ConfigBuilder<DefaultState>) -> Result<Config> {
    // the environment source is read when the builder is built
    dotenv::dotenv().ok();

    let config = Config::from_builder(builder)?;
    setup_logging(config.debug());

    log::debug!("Using config: {:?}", config);
    Ok(config)
}
