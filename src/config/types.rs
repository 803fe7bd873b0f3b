//! Declarative crawl configuration types
//!
//! A `CrawlConfig` describes how to wait for a page, what to extract from it
//! and which files to save. It is loaded once per crawl invocation and is
//! read-only afterwards. The whole document is handed verbatim to the
//! in-page evaluator, so keys this crate does not interpret (extraction
//! group internals, render snippets) are preserved on round-trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Condition that marks a page as ready for extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitMode {
    /// No selector wait
    #[default]
    None,
    /// Wait until the selector is visible
    Show,
    /// Wait until the selector is no longer visible
    Hide,
    /// Only the fixed settle delay applies
    #[serde(rename = "wait", alias = "delay")]
    Delay,
}

/// `pageLoad` block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLoad {
    #[serde(default)]
    pub wait: WaitMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,

    /// Fixed settle delay in seconds, applied after any selector wait
    #[serde(default, rename = "sleep", alias = "sleepSeconds")]
    pub sleep_seconds: u64,
}

impl PageLoad {
    /// Selector to gate on, if the mode uses one and it is non-empty
    #[must_use]
    pub fn gate_selector(&self) -> Option<&str> {
        match self.wait {
            WaitMode::Show | WaitMode::Hide => {
                self.selector.as_deref().filter(|s| !s.trim().is_empty())
            }
            WaitMode::None | WaitMode::Delay => None,
        }
    }
}

/// How a download descriptor produces its files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadKind {
    /// Modifier-click the element so the browser saves the link target
    #[serde(rename = "url", alias = "byUrl")]
    ByUrl,
    /// Click the element and capture the download it triggers
    #[serde(rename = "element", alias = "byElementClick")]
    ByElementClick,
    /// Open the file URL in a fresh tab and print it to PDF
    #[serde(rename = "toPDF", alias = "toPdf")]
    ToPdf,
}

/// One entry of `downloadSection`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadDescriptor {
    pub selector: String,

    /// Join key into the result's `downloads` map
    pub id: String,

    #[serde(default)]
    pub label: String,

    /// Destination subdirectory; falls back to `id` when absent or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,

    #[serde(rename = "type")]
    pub kind: DownloadKind,

    /// Evaluator-only keys (`nameProper`, `nameRender`, `linkProper`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DownloadDescriptor {
    /// Subdirectory of the download root that receives this group's files
    #[must_use]
    pub fn sub_dir(&self) -> &str {
        match self.save_path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => &self.id,
        }
    }
}

/// Complete per-crawl configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    #[serde(default)]
    pub page_load: PageLoad,

    /// Opaque extraction-group descriptors consumed by the evaluator
    #[serde(default)]
    pub data_section: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub switch_section: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_root: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download_section: Vec<DownloadDescriptor>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CrawlConfig {
    /// Parse a configuration document
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Download dispatch needs both a root and at least one descriptor
    #[must_use]
    pub fn downloads_configured(&self) -> bool {
        self.download_root
            .as_deref()
            .is_some_and(|root| !root.is_empty())
            && !self.download_section.is_empty()
    }

    /// Input document for the in-page evaluator
    pub fn to_evaluator_input(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
