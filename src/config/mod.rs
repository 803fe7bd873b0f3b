//! Configuration module
//!
//! Two kinds of configuration live here: the per-page `CrawlConfig`
//! document (what to wait for, extract and download) together with the
//! sources it is loaded from, and the engine-wide `CrawlerSettings`.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod source;
pub mod types;

// Re-exports for public API
pub use builder::{CrawlerSettings, CrawlerSettingsBuilder};
pub use source::{ConfigFetcher, ConfigSource, FileConfigFetcher, LoadedConfig, load_config};
pub use types::{CrawlConfig, DownloadDescriptor, DownloadKind, PageLoad, WaitMode};
