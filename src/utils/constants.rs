//! Shared configuration constants
//!
//! Default values used throughout the crawl engine to avoid magic numbers.

use std::time::Duration;

/// Default probe cadence for wait loops
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Fastest allowed probe cadence
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Slowest allowed probe cadence
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Ceiling for the page-load / network-idle wait
pub const DEFAULT_PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for `pageLoad` show/hide selector waits
pub const DEFAULT_SELECTOR_TIMEOUT: Duration = Duration::from_secs(20);

/// Deadline for a single download stream
pub const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for a `toPDF` tab to stabilize before printing
pub const DEFAULT_PDF_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum nesting of external-link sub-crawls
pub const DEFAULT_MAX_EXTERNAL_DEPTH: usize = 8;

/// Quiet period the network must hold before a page counts as idle
pub const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Chrome user agent string
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
