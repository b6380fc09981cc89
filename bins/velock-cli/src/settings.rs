//! CLI settings: an optional TOML file overlaid with `VELOCK__*` environment
//! variables. Command-line flags are applied on top by the caller.

use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use velock_ledger::LedgerConfig;

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub ledger: LedgerConfig,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
}

impl Settings {
    /// Load settings from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("VELOCK")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings
            .ledger
            .validate()
            .context("invalid ledger configuration")?;
        Ok(settings)
    }
}
