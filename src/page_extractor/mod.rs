//! In-page extraction.
//!
//! This module holds the scripts evaluated inside the page, the typed
//! result document they produce, and the `extract` step that ties the two
//! together.

// Sub-modules
pub mod extractor;
pub mod js_scripts;
pub mod schema;

// Re-exports for public API
pub use extractor::{decode_result, extract};
pub use schema::{DownloadFile, DownloadGroupResult, ExternalBinding, ResultTree};
