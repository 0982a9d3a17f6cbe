//! CLI configuration: optional TOML file, then `MEMBERSHIP_*` environment.

use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile};
use membership_types::UserId;
use serde::Deserialize;
use std::path::Path;

pub const ENV_PREFIX: &str = "MEMBERSHIP";

#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Identity granted ADMIN when the registry is bootstrapped.
    pub admin: UserId,
    /// Identities granted AUTHOR by the admin at startup.
    #[serde(default)]
    pub authors: Vec<UserId>,
    /// Initial clock reading for scripted runs; wall clock when unset.
    #[serde(default)]
    pub start_time: Option<u64>,
    pub log_level: String,
    pub log_format: String,
}

impl CliConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("log_level", "info")?
            .set_default("log_format", "pretty")?;

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("Configuration file {} not found", path.display());
            }
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("authors"),
        );

        let config = builder.build().context("failed to assemble configuration")?;
        config
            .try_deserialize()
            .context("invalid membership registry configuration")
    }
}
