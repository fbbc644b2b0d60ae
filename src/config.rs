use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LogFormat {
    COMPACT,
    JSON,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<LogLevel> for LevelFilter {
    fn from(val: LogLevel) -> Self {
        match val {
            LogLevel::TRACE => LevelFilter::TRACE,
            LogLevel::DEBUG => LevelFilter::DEBUG,
            LogLevel::INFO => LevelFilter::INFO,
            LogLevel::WARN => LevelFilter::WARN,
            LogLevel::ERROR => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::WARN,
            format: LogFormat::COMPACT,
        }
    }
}

/// Parameters of the random order generator.
///
/// Prices and quantities are drawn from normal distributions, peaks from a
/// uniform one; every drawn value is rounded to a multiple of 10.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Batch file written when no output is given on the command line.
    pub output: PathBuf,
    /// Share of generated orders that are icebergs, in `[0, 1]`.
    pub iceberg_probability: f64,
    pub price_mean: f64,
    pub price_deviation: f64,
    pub quantity_mean: f64,
    pub quantity_deviation: f64,
    pub peak_min: f64,
    pub peak_max: f64,
    /// Fixed RNG seed for reproducible batches.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("orders.json"),
            iceberg_probability: 0.1,
            price_mean: 1000.0,
            price_deviation: 100.0,
            quantity_mean: 1000.0,
            quantity_deviation: 200.0,
            peak_min: 100.0,
            peak_max: 500.0,
            seed: None,
        }
    }
}

/// Top-level application configuration wrapper.
///
/// This struct groups all configuration sections used by the application.
/// Loaded with the following precedence (lowest to highest):
/// 1) Built-in defaults
/// 2) Optional config file (if present)
/// 3) Environment variables prefixed with `ICEBOOK_`, nested keys separated
///    by `__` (e.g. `ICEBOOK_GENERATOR__PRICE_MEAN=500`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub logger: LogConfig,
    pub generator: GeneratorConfig,
}

impl AppConfig {
    pub fn load(config_path: &Path) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if config_path.exists() {
            figment = figment.merge(Toml::file(config_path));
        }
        figment = figment.merge(Env::prefixed("ICEBOOK_").split("__"));

        let cfg = figment.extract()?;
        Ok(cfg)
    }
}
