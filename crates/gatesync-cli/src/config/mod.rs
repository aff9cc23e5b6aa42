//! Configuration: credentials, sync options, and source locations.
//!
//! Everything is resolved once into [`Settings`] before any network activity,
//! then handed to the client builder and the source loader.

use gatesync_client::{GatewayClient, RetryConfig};
use gatesync_engine::{SourceConfig, SyncOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cli::args::GlobalArgs;

/// Env var holding the API token
pub const API_TOKEN_VAR: &str = "CF_API_TOKEN";

/// Env var holding the account identifier
pub const ACCOUNT_ID_VAR: &str = "CF_IDENTIFIER";

/// Template values shipped in the sample env file
const PLACEHOLDERS: [(&str, &str); 2] = [
    (API_TOKEN_VAR, "your CF_API_TOKEN value"),
    (ACCOUNT_ID_VAR, "your CF_IDENTIFIER value"),
];

/// Configuration problems; all of them stop the process before any request
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing {key}: set it in the environment or in {}", .env_file.display())]
    Missing { key: &'static str, env_file: PathBuf },

    #[error("{key} still holds the placeholder value, replace it with a real one")]
    Placeholder { key: &'static str },

    #[error("failed to read env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid option: {0}")]
    Invalid(String),
}

/// Gateway credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account_id: String,
    pub api_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Resolve credentials from `env`, falling back to `dotenv` per key.
    pub fn resolve<F>(
        env: F,
        dotenv: &HashMap<String, String>,
        env_file: &Path,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &'static str| -> Result<String, ConfigError> {
            let value = env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| dotenv.get(key).cloned().filter(|v| !v.is_empty()))
                .ok_or_else(|| ConfigError::Missing {
                    key,
                    env_file: env_file.to_path_buf(),
                })?;
            if PLACEHOLDERS.iter().any(|(k, p)| *k == key && value == *p) {
                return Err(ConfigError::Placeholder { key });
            }
            Ok(value.trim().to_string())
        };

        Ok(Self {
            api_token: lookup(API_TOKEN_VAR)?,
            account_id: lookup(ACCOUNT_ID_VAR)?,
        })
    }
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub sync: SyncOptions,
    pub retry: RetryConfig,
    pub rate_interval: Duration,
    pub lists_dir: PathBuf,
    pub api_url: Option<String>,
}

impl Settings {
    /// Build settings from CLI arguments and the process environment
    pub fn load(args: &GlobalArgs) -> Result<Self, ConfigError> {
        let dotenv = load_dotenv(&args.env_file)?;
        let credentials =
            Credentials::resolve(|k| std::env::var(k).ok(), &dotenv, &args.env_file)?;
        let sync = SyncOptions::new(args.prefix.as_str(), usize::from(args.chunk_size))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            credentials,
            sync,
            retry: RetryConfig::new().max_retries(args.max_retries),
            rate_interval: Duration::from_millis(args.rate_interval_ms),
            lists_dir: args.lists_dir.clone(),
            api_url: args.api_url.clone(),
        })
    }

    /// Gateway client using these credentials and limits
    pub fn client(&self) -> gatesync_core::Result<GatewayClient> {
        let mut builder = GatewayClient::builder(
            self.credentials.account_id.as_str(),
            self.credentials.api_token.as_str(),
        )
        .retry(self.retry.clone())
        .rate_interval(self.rate_interval);
        if let Some(url) = &self.api_url {
            builder = builder.base_url(url.as_str());
        }
        builder.build()
    }

    /// Sources from the seed directory and the environment
    pub fn sources(&self) -> SourceConfig {
        SourceConfig::discover(&self.lists_dir, |k| std::env::var(k).ok())
    }
}

/// Read a dotenv-style file; a missing file is empty.
pub fn load_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_dotenv(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(source) => Err(ConfigError::EnvFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse `KEY=VALUE` lines. `#` lines are comments; surrounding quotes and
/// angle brackets are stripped from values.
#[must_use]
pub fn parse_dotenv(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value
                .trim()
                .trim_start_matches(['"', '\'', '<'])
                .trim_end_matches(['"', '\'', '>']);
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}
