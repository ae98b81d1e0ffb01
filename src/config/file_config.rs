//! Optional TOML file configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Raw TOML configuration. Every field is optional so partial files work.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub data_dir: Option<String>,
    pub sheet_path: Option<String>,
    pub sql_dir: Option<String>,
    pub discogs_base_url: Option<String>,
    pub discogs_token: Option<String>,
    pub user_agent: Option<String>,
    pub cache_ttl_weeks: Option<u64>,
    pub retry_max_attempts: Option<u32>,
    pub retry_interval_secs: Option<u64>,
    pub request_delay_secs: Option<u64>,
    pub separators: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {:?}", path))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {:?}", path))
    }
}
