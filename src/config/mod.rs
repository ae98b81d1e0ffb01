//! Runtime configuration resolution.

mod file_config;

pub use file_config::FileConfig;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::sheet::SeparatorPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.discogs.com";

/// CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub sheet_path: Option<PathBuf>,
    pub sql_dir: Option<PathBuf>,
    pub discogs_base_url: Option<String>,
    pub discogs_token: Option<String>,
    pub cache_ttl_weeks: Option<u64>,
    pub retry_max_attempts: Option<u32>,
    pub retry_interval_secs: Option<u64>,
    pub request_delay_secs: Option<u64>,
    pub separators: Option<String>,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the durable caches.
    pub data_dir: PathBuf,
    /// The worksheet file.
    pub sheet_path: PathBuf,
    /// Directory with the SQL schema templates and statement outputs.
    pub sql_dir: PathBuf,
    pub discogs_base_url: String,
    pub discogs_token: Option<String>,
    pub user_agent: String,
    pub cache_ttl_weeks: u64,
    pub retry_max_attempts: u32,
    pub retry_interval: Duration,
    pub request_delay: Duration,
    pub separators: SeparatorPolicy,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in the config file")
            })?;
        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let sheet_path = file
            .sheet_path
            .map(PathBuf::from)
            .or_else(|| cli.sheet_path.clone())
            .unwrap_or_else(|| data_dir.join("albums.tsv"));
        let sql_dir = file
            .sql_dir
            .map(PathBuf::from)
            .or_else(|| cli.sql_dir.clone())
            .unwrap_or_else(|| data_dir.join("sql"));

        let discogs_base_url = file
            .discogs_base_url
            .or_else(|| cli.discogs_base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let discogs_token = file.discogs_token.or_else(|| cli.discogs_token.clone());
        let user_agent = file
            .user_agent
            .unwrap_or_else(|| format!("albumshelf/{}", env!("CARGO_PKG_VERSION")));

        let cache_ttl_weeks = file.cache_ttl_weeks.or(cli.cache_ttl_weeks).unwrap_or(32);
        let retry_max_attempts = file
            .retry_max_attempts
            .or(cli.retry_max_attempts)
            .unwrap_or(5);
        let retry_interval = Duration::from_secs(
            file.retry_interval_secs
                .or(cli.retry_interval_secs)
                .unwrap_or(10),
        );
        let request_delay = Duration::from_secs(
            file.request_delay_secs
                .or(cli.request_delay_secs)
                .unwrap_or(2),
        );

        let separators = match file.separators.or_else(|| cli.separators.clone()) {
            Some(chars) if !chars.trim().is_empty() => SeparatorPolicy::new(&chars),
            _ => SeparatorPolicy::default(),
        };

        Ok(Self {
            data_dir,
            sheet_path,
            sql_dir,
            discogs_base_url,
            discogs_token,
            user_agent,
            cache_ttl_weeks,
            retry_max_attempts,
            retry_interval,
            request_delay,
            separators,
        })
    }

    pub fn metadata_cache_path(&self) -> PathBuf {
        self.data_dir.join("metadata_cache.db")
    }

    pub fn artist_names_path(&self) -> PathBuf {
        self.data_dir.join("artist_names.json")
    }

    pub fn scored_template_path(&self) -> PathBuf {
        self.sql_dir.join("score_base_tables.sql")
    }

    pub fn scored_output_path(&self) -> PathBuf {
        self.sql_dir.join("score_statements.sql")
    }

    pub fn public_template_path(&self) -> PathBuf {
        self.sql_dir.join("base_tables.sql")
    }

    pub fn public_output_path(&self) -> PathBuf {
        self.sql_dir.join("statements.sql")
    }
}
