//! Browser capability set consumed by the crawl engine.
//!
//! The engine never talks to a browser directly. Everything it needs (open a
//! tab, evaluate script, query and click elements, hold modifier keys,
//! capture a download, print to PDF) goes through these traits, which keeps
//! the wait/download/recursion logic testable against in-memory fakes. The
//! chromiumoxide-backed implementation lives in [`chromium`].

pub mod chromium;
pub mod setup;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use chromium::{ChromiumDriver, ChromiumPage};
pub use setup::{BrowserWrapper, find_browser_executable, launch_browser};

/// Keyboard modifier held while clicking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifierKey {
    #[default]
    Alt,
    Control,
    Shift,
}

impl ModifierKey {
    /// DOM `key` value
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Alt => "Alt",
            Self::Control => "Control",
            Self::Shift => "Shift",
        }
    }

    /// DOM `code` value of the left-hand key
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Alt => "AltLeft",
            Self::Control => "ControlLeft",
            Self::Shift => "ShiftLeft",
        }
    }

    /// Windows virtual key code
    #[must_use]
    pub fn virtual_key_code(self) -> i64 {
        match self {
            Self::Alt => 18,
            Self::Control => 17,
            Self::Shift => 16,
        }
    }

    /// Bit in the CDP input `modifiers` mask
    #[must_use]
    pub fn mask(self) -> i64 {
        match self {
            Self::Alt => 1,
            Self::Control => 2,
            Self::Shift => 8,
        }
    }
}

/// Opens pages
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open `url` in a new tab
    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageHandle>>;
}

/// One open tab
///
/// Implementations must tolerate calls from several tasks at once; the
/// engine additionally serializes its own concurrent probes.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Resolve once the document has loaded and the network has gone quiet.
    /// Callers bound this with their own deadline.
    async fn wait_for_load(&self) -> Result<()>;

    /// Call the JavaScript function `function` with JSON `args` and return
    /// its JSON result (promises are awaited)
    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value>;

    /// Every element matching `selector`, in document order. Supports
    /// `:frame(X)` / `:shadow(X)` prefixes that narrow the search root.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>>;

    async fn press_key(&self, key: ModifierKey) -> Result<()>;

    async fn release_key(&self, key: ModifierKey) -> Result<()>;

    /// Arm capture of the next download started from this page
    async fn begin_download(&self) -> Result<Box<dyn DownloadCapture>>;

    /// Render the current document as PDF
    async fn print_pdf(&self) -> Result<Vec<u8>>;

    async fn close(&self) -> Result<()>;
}

/// A matched element
#[async_trait]
pub trait ElementHandle: Send + Sync {
    async fn click(&self) -> Result<()>;
}

/// A download armed before the click that triggers it
#[async_trait]
pub trait DownloadCapture: Send {
    /// Wait for the download to finish and return its bytes. Callers bound
    /// this with their own deadline.
    async fn bytes(self: Box<Self>) -> Result<Vec<u8>>;
}
