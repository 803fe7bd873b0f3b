//! Core error and context types for crawl operations.
//!
//! `CrawlError` separates the failure kinds that drive the pipeline's
//! propagation policy: configuration, deadline, extraction and path faults
//! abort a crawl step, while download and external-resolution faults are
//! absorbed into the result tree by their owning stage.

use std::time::Duration;
use thiserror::Error;

/// Error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Malformed or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A bounded wait (show/hide/race/page-load) exceeded its deadline
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: String,
        after: Duration,
    },

    /// Evaluator fault or undecodable extraction result
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// A single file could not be produced
    #[error("Download failed for '{name}': {message}")]
    DownloadItem { name: String, message: String },

    /// A recursive sub-crawl failed
    #[error("External resolution failed for {url}: {message}")]
    ExternalResolution { url: String, message: String },

    /// Malformed config reference or URL
    #[error("Path resolution error: {0}")]
    PathResolution(String),

    /// Browser driver failure outside of a bounded wait
    #[error("Browser error: {0}")]
    Browser(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrawlError {
    pub(crate) fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// Wrap a collaborator failure as a browser error, keeping the full chain
    pub(crate) fn browser(err: &anyhow::Error) -> Self {
        Self::Browser(format!("{err:#}"))
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Convenience alias for Result with `CrawlError`
pub type CrawlResult<T> = Result<T, CrawlError>;

/// Per-call recursion state threaded through nested external crawls.
///
/// `ancestry` holds the `(url, config location)` pairs of every crawl on the
/// current path from the top-level call, so a binding that leads back to one
/// of its ancestors is detected without forbidding the same link from being
/// followed twice along unrelated branches.
#[derive(Debug, Clone, Default)]
pub struct CrawlContext {
    depth: usize,
    ancestry: Vec<(String, String)>,
}

impl CrawlContext {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub fn contains(&self, url: &str, config_location: &str) -> bool {
        self.ancestry
            .iter()
            .any(|(u, c)| u == url && c == config_location)
    }

    /// Context for a crawl one level below the current one
    #[must_use]
    pub fn descend(&self, url: &str, config_location: &str) -> Self {
        let mut ancestry = self.ancestry.clone();
        ancestry.push((url.to_string(), config_location.to_string()));
        Self {
            depth: self.depth + 1,
            ancestry,
        }
    }

    /// Record the top-level crawl's own identity without increasing depth
    #[must_use]
    pub fn entered(&self, url: &str, config_location: &str) -> Self {
        let mut ancestry = self.ancestry.clone();
        ancestry.push((url.to_string(), config_location.to_string()));
        Self {
            depth: self.depth,
            ancestry,
        }
    }
}
