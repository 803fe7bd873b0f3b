//! Configuration sources and fetching
//!
//! A crawl entry point accepts either a reference to a configuration
//! document (filesystem path or URL) or an already-parsed configuration.
//! The reference form is resolved exactly once, at the entry point, into a
//! `CrawlConfig` plus the location it was loaded from; the location is what
//! relative external-binding references are resolved against.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::types::CrawlConfig;
use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult};
use crate::utils::path_utils::{is_url, resolve_ref};

const CONFIG_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a crawl's configuration comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigSource {
    /// Filesystem path or `http(s)://` URL of a JSON document
    Path(String),
    /// Configuration supplied in-line
    Inline(Box<CrawlConfig>),
}

impl ConfigSource {
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::Path(location) => Some(location),
            Self::Inline(_) => None,
        }
    }
}

impl From<&str> for ConfigSource {
    fn from(location: &str) -> Self {
        Self::Path(location.to_string())
    }
}

impl From<String> for ConfigSource {
    fn from(location: String) -> Self {
        Self::Path(location)
    }
}

impl From<CrawlConfig> for ConfigSource {
    fn from(config: CrawlConfig) -> Self {
        Self::Inline(Box::new(config))
    }
}

/// A configuration ready for use, with the location it was read from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CrawlConfig,
    /// `None` for in-line configurations
    pub location: Option<String>,
}

/// Loads configuration documents by reference
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<CrawlConfig>;
}

/// Default fetcher: local files through `tokio::fs`, URLs through `reqwest`
#[derive(Debug, Clone)]
pub struct FileConfigFetcher {
    client: reqwest::Client,
}

impl FileConfigFetcher {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CONFIG_REQUEST_TIMEOUT)
            .build()
            .context("Failed to build config HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ConfigFetcher for FileConfigFetcher {
    async fn fetch(&self, location: &str) -> Result<CrawlConfig> {
        let text = if is_url(location) {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .with_context(|| format!("Failed to request config {location}"))?;
            if !response.status().is_success() {
                anyhow::bail!(
                    "Config request {location} failed with status: {}",
                    response.status()
                );
            }
            response
                .text()
                .await
                .with_context(|| format!("Failed to read config body {location}"))?
        } else {
            tokio::fs::read_to_string(location)
                .await
                .with_context(|| format!("Failed to read config file {location}"))?
        };

        CrawlConfig::from_json(&text).with_context(|| format!("Invalid config document {location}"))
    }
}

/// Resolve a source into a usable configuration
///
/// Path locations are made absolute (and URLs normalized) before fetching,
/// so the recorded location is the same string a relative reference to
/// this config would resolve to.
pub async fn load_config(
    source: ConfigSource,
    fetcher: &dyn ConfigFetcher,
) -> CrawlResult<LoadedConfig> {
    match source {
        ConfigSource::Inline(config) => Ok(LoadedConfig {
            config: *config,
            location: None,
        }),
        ConfigSource::Path(location) => {
            if location.trim().is_empty() {
                return Err(CrawlError::Config("empty config location".to_string()));
            }
            let location = resolve_ref(None, &location)?;
            log::debug!("Loading config from {location}");
            let config = fetcher
                .fetch(&location)
                .await
                .map_err(|e| CrawlError::Config(format!("{e:#}")))?;
            Ok(LoadedConfig {
                config,
                location: Some(location),
            })
        }
    }
}
