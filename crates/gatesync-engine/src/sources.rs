//! Source loader: raw block and allow list text from URLs, seed files and env.
//!
//! No single source can fail a run. A download that still fails after retries
//! or a seed file that cannot be read logs a warning and contributes nothing.

use crate::error::SourceError;
use futures_util::stream::{self, StreamExt};
use gatesync_client::{with_retry, RetryConfig};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Env var with extra block-list URLs, space separated
pub const ADLIST_URLS: &str = "ADLIST_URLS";
/// Env var with extra allow-list URLs, space separated
pub const WHITELIST_URLS: &str = "WHITELIST_URLS";
/// Env var with literal block entries
pub const DYNAMIC_BLACKLIST: &str = "DYNAMIC_BLACKLIST";
/// Env var with literal allow entries
pub const DYNAMIC_WHITELIST: &str = "DYNAMIC_WHITELIST";

const ADLIST_FILE: &str = "adlist.ini";
const WHITELIST_FILE: &str = "whitelist.ini";
const DYNAMIC_BLACKLIST_FILE: &str = "dynamic_blacklist.txt";
const DYNAMIC_WHITELIST_FILE: &str = "dynamic_whitelist.txt";

/// Maximum concurrent downloads
const DOWNLOAD_CONCURRENCY: usize = 4;

/// Per-download timeout; list files can be large
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Where raw list text comes from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceConfig {
    /// Block-list URLs, downloaded in order
    pub block_urls: Vec<String>,
    /// Allow-list URLs, downloaded in order
    pub allow_urls: Vec<String>,
    /// Literal block entries appended after downloads
    pub dynamic_block: String,
    /// Literal allow entries appended after downloads
    pub dynamic_allow: String,
}

impl SourceConfig {
    /// Collect sources from the seed files in `lists_dir` and the environment.
    ///
    /// URLs come from both the seed file and the env var. Dynamic entries come
    /// from the env var when it is set and non-empty, otherwise from the seed
    /// file. Missing seed files are skipped.
    pub fn discover<F>(lists_dir: &Path, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let urls = |var: &str, file: &str| {
            let mut urls = read_seed(&lists_dir.join(file), parse_url_file);
            urls.extend(env(var).as_deref().map(split_entries).unwrap_or_default());
            urls
        };
        let dynamic = |var: &str, file: &str| match env(var).filter(|v| !v.trim().is_empty()) {
            Some(value) => split_entries(&value).join("\n"),
            None => read_seed(&lists_dir.join(file), str::to_string),
        };

        let config = Self {
            block_urls: urls(ADLIST_URLS, ADLIST_FILE),
            allow_urls: urls(WHITELIST_URLS, WHITELIST_FILE),
            dynamic_block: dynamic(DYNAMIC_BLACKLIST, DYNAMIC_BLACKLIST_FILE),
            dynamic_allow: dynamic(DYNAMIC_WHITELIST, DYNAMIC_WHITELIST_FILE),
        };
        debug!(
            block_urls = config.block_urls.len(),
            allow_urls = config.allow_urls.len(),
            "discovered sources"
        );
        config
    }
}

/// Concatenated raw text of all block and allow sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLists {
    pub block: String,
    pub allow: String,
}

/// Downloads and aggregates raw list sources
#[derive(Debug, Clone)]
pub struct SourceLoader {
    http: reqwest::Client,
    retry: RetryConfig,
}

impl SourceLoader {
    /// Create a loader retrying downloads per `retry`
    pub fn new(retry: RetryConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(format!("gatesync/{}", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;
        Ok(Self { http, retry })
    }

    /// Aggregate every configured source into block and allow text
    pub async fn load_raw_lists(&self, config: &SourceConfig) -> RawLists {
        let (block, allow) = futures_util::join!(
            self.download_all(&config.block_urls),
            self.download_all(&config.allow_urls)
        );
        let raw = RawLists {
            block: join_text(block, &config.dynamic_block),
            allow: join_text(allow, &config.dynamic_allow),
        };
        info!(
            block_bytes = raw.block.len(),
            allow_bytes = raw.allow.len(),
            "loaded raw lists"
        );
        raw
    }

    /// Download `urls` concurrently, keeping input order; failures become empty text
    async fn download_all(&self, urls: &[String]) -> Vec<String> {
        stream::iter(urls)
            .map(|url| async move {
                match self.download(url).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(url = %url, error = %e, "source skipped");
                        String::new()
                    }
                }
            })
            .buffered(DOWNLOAD_CONCURRENCY)
            .collect()
            .await
    }

    /// Download one source, retrying transient failures. Redirects are followed.
    pub async fn download(&self, url: &str) -> Result<String, SourceError> {
        let operation = format!("GET {url}");
        let text = with_retry(&self.retry, &operation, || self.fetch_once(url)).await?;
        info!(url, bytes = text.len(), "downloaded source");
        Ok(text)
    }

    async fn fetch_once(&self, url: &str) -> Result<String, SourceError> {
        let download_error = |e: reqwest::Error| SourceError::Download {
            url: url.to_string(),
            transient: e.is_timeout() || e.is_connect() || e.is_body(),
            reason: e.to_string(),
        };

        let response = self.http.get(url).send().await.map_err(download_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(download_error)
    }
}

fn join_text(parts: Vec<String>, dynamic: &str) -> String {
    let mut parts = parts;
    if !dynamic.is_empty() {
        parts.push(dynamic.to_string());
    }
    parts.join("\n")
}

/// Read a seed file through `parse`, or warn and fall back to the default
fn read_seed<T: Default>(path: &Path, parse: impl Fn(&str) -> T) -> T {
    match std::fs::read_to_string(path) {
        Ok(text) => parse(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "seed file not present");
            T::default()
        }
        Err(source) => {
            let err = SourceError::Read {
                path: path.to_path_buf(),
                source,
            };
            warn!(error = %err, "seed file skipped");
            T::default()
        }
    }
}

/// Parse a URL seed file.
///
/// A file whose first line starts with `[` is read as INI and every value is
/// taken; otherwise each non-comment line is one URL.
#[must_use]
pub fn parse_url_file(text: &str) -> Vec<String> {
    let is_ini = text.lines().next().is_some_and(|l| l.starts_with('['));
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'))
        .filter_map(|l| {
            if !is_ini {
                return Some(l);
            }
            if l.starts_with('[') {
                return None;
            }
            l.split_once('=')
                .or_else(|| l.split_once(':'))
                .map(|(_, value)| value.trim())
                .filter(|v| !v.is_empty())
        })
        .map(ToString::to_string)
        .collect()
}

/// Split whitespace separated entries
#[must_use]
pub fn split_entries(value: &str) -> Vec<String> {
    value.split_whitespace().map(ToString::to_string).collect()
}
