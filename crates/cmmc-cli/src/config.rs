//! Configuration for the cmmc CLI

use serde::{Deserialize, Serialize};

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Catalog data files
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the JSON data files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_practices_path")]
    pub practices_path: String,

    #[serde(default = "default_objectives_path")]
    pub objectives_path: String,

    /// Assessment export used to list organizations
    #[serde(default = "default_assessments_path")]
    pub assessments_path: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            practices_path: default_practices_path(),
            objectives_path: default_objectives_path(),
            assessments_path: default_assessments_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_practices_path() -> String {
    "cmmc-practices.json".to_string()
}

fn default_objectives_path() -> String {
    "cmmc-objectives.json".to_string()
}

fn default_assessments_path() -> String {
    "cmmc-assessments.json".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl CliConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `CMMC_`-prefixed environment variables (`CMMC_CATALOG__PRACTICES_PATH`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&CliConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CMMC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
