//! Config reference resolution and destination-path helpers.
//!
//! All functions here are pure (or touch only the filesystem they are
//! pointed at); nothing is cached in process-wide state.

use std::path::{Component, Path, PathBuf};
use url::Url;

use crate::crawl_engine::crawl_types::{CrawlError, CrawlResult};

/// Characters replaced when turning a page-supplied name into a file name
const FILENAME_RESERVED: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Whether a config reference is an `http(s)` URL rather than a path
#[must_use]
pub fn is_url(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Resolve `reference` against the location of the config that mentions it.
///
/// - URL base: standard relative URL reference resolution.
/// - Path base: relative to the directory containing the base file; an
///   absolute reference is returned unchanged.
/// - No base (in-line config): relative to the working directory.
///
/// The result is always absolute.
///
/// # Errors
///
/// `CrawlError::PathResolution` for an empty reference, an unparsable URL,
/// or an unreadable working directory.
pub fn resolve_ref(base: Option<&str>, reference: &str) -> CrawlResult<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(CrawlError::PathResolution(
            "empty config reference".to_string(),
        ));
    }
    if is_url(reference) {
        return Url::parse(reference)
            .map(String::from)
            .map_err(|e| CrawlError::PathResolution(format!("invalid URL '{reference}': {e}")));
    }

    match base {
        Some(base) if is_url(base) => {
            let base_url = Url::parse(base)
                .map_err(|e| CrawlError::PathResolution(format!("invalid base URL '{base}': {e}")))?;
            base_url.join(reference).map(String::from).map_err(|e| {
                CrawlError::PathResolution(format!(
                    "cannot resolve '{reference}' against '{base}': {e}"
                ))
            })
        }
        _ => {
            let reference_path = Path::new(reference);
            if reference_path.is_absolute() {
                return Ok(normalize_lexically(reference_path)
                    .to_string_lossy()
                    .into_owned());
            }
            let dir = base
                .and_then(|b| Path::new(b).parent())
                .map(Path::to_path_buf)
                .unwrap_or_default();
            let joined = dir.join(reference_path);
            let absolute = if joined.is_absolute() {
                joined
            } else {
                std::env::current_dir()
                    .map_err(|e| {
                        CrawlError::PathResolution(format!("cannot read working directory: {e}"))
                    })?
                    .join(joined)
            };
            Ok(normalize_lexically(&absolute).to_string_lossy().into_owned())
        }
    }
}

/// Collapse `.` and `..` components without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Replace each run of characters that are invalid in file names with `_`
#[must_use]
pub fn normalize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.chars() {
        if FILENAME_RESERVED.contains(&ch) {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// Turn a page-supplied name into a safe single path segment
///
/// Also guards against control characters, reserved device names and
/// traversal segments like `..`.
#[must_use]
pub fn safe_file_name(name: &str) -> String {
    let normalized = normalize_filename(name.trim());
    if normalized.trim_matches('.').trim().is_empty() {
        return "download".to_string();
    }
    sanitize_filename::sanitize_with_options(
        &normalized,
        sanitize_filename::Options {
            windows: true,
            truncate: true,
            replacement: "_",
        },
    )
}

/// First free path of the form `name.ext`, `name_1.ext`, `name_2.ext`, ...
pub async fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !exists(&candidate).await {
        return candidate;
    }

    let as_path = Path::new(file_name);
    let stem = as_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = as_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut attempt = 1usize;
    loop {
        let candidate = dir.join(format!("{stem}_{attempt}{ext}"));
        if !exists(&candidate).await {
            return candidate;
        }
        attempt += 1;
    }
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
