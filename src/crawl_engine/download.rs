//! Download dispatch
//!
//! Maps each `downloadSection` descriptor onto one file-producing action per
//! file listed in the matching result group. Failures are isolated per file:
//! a failed file gets its `error` set and the loop moves on. The dispatcher
//! itself never fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::crawl_types::{CrawlError, CrawlResult};
use super::page_timeout::with_page_timeout;
use crate::browser::{BrowserDriver, ElementHandle, PageHandle};
use crate::config::{CrawlerSettings, DownloadDescriptor, DownloadKind};
use crate::page_extractor::{DownloadFile, DownloadGroupResult};
use crate::utils::path_utils::{safe_file_name, unique_destination};

/// Run every descriptor that has a matching result group.
///
/// On success a file's `name` is updated to the name actually written, so
/// `download_root/<sub dir>/<name>` always points at the saved file.
pub async fn dispatch_downloads(
    browser: &dyn BrowserDriver,
    page: &dyn PageHandle,
    descriptors: &[DownloadDescriptor],
    downloads: &mut BTreeMap<String, DownloadGroupResult>,
    download_root: &str,
    settings: &CrawlerSettings,
) {
    for descriptor in descriptors {
        let Some(group) = downloads.get_mut(&descriptor.id) else {
            log::debug!("No result group for download descriptor '{}'", descriptor.id);
            continue;
        };
        let dir = Path::new(download_root).join(descriptor.sub_dir());
        dispatch_group(browser, page, descriptor, group, &dir, settings).await;
    }
}

async fn dispatch_group(
    browser: &dyn BrowserDriver,
    page: &dyn PageHandle,
    descriptor: &DownloadDescriptor,
    group: &mut DownloadGroupResult,
    dir: &Path,
    settings: &CrawlerSettings,
) {
    if group.files.is_empty() {
        return;
    }
    log::info!(
        "Downloading {} file(s) for '{}' into {}",
        group.files.len(),
        descriptor.id,
        dir.display()
    );

    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        let message = format!("cannot create {}: {e}", dir.display());
        log::warn!("{message}");
        for file in &mut group.files {
            file.error = Some(message.clone());
        }
        return;
    }

    if descriptor.kind == DownloadKind::ToPdf {
        for file in &mut group.files {
            let outcome = save_as_pdf(browser, file, dir, settings).await;
            record(file, outcome);
        }
        return;
    }

    let elements = match page.query_all(&descriptor.selector).await {
        Ok(elements) => elements,
        Err(e) => {
            let message = format!("cannot query '{}': {e:#}", descriptor.selector);
            log::warn!("{message}");
            for file in &mut group.files {
                file.error = Some(message.clone());
            }
            return;
        }
    };
    if elements.len() != group.files.len() {
        log::warn!(
            "Download '{}': {} element(s) match '{}' but {} file(s) were listed",
            descriptor.id,
            elements.len(),
            descriptor.selector,
            group.files.len()
        );
    }

    for (index, file) in group.files.iter_mut().enumerate() {
        let outcome = match elements.get(index) {
            Some(element) => {
                save_clicked(page, element.as_ref(), descriptor.kind, file, dir, settings).await
            }
            None => Err(CrawlError::DownloadItem {
                name: file.name.clone(),
                message: format!("no element #{index} matches '{}'", descriptor.selector),
            }),
        };
        record(file, outcome);
    }
}

fn record(file: &mut DownloadFile, outcome: CrawlResult<PathBuf>) {
    match outcome {
        Ok(path) => {
            log::debug!("Saved {}", path.display());
            if let Some(name) = path.file_name() {
                file.name = name.to_string_lossy().into_owned();
            }
            file.error = None;
        }
        Err(e) => {
            log::warn!("{e}");
            file.error = Some(e.to_string());
        }
    }
}

/// Click `element` (holding the modifier for `byUrl`) and save the download
async fn save_clicked(
    page: &dyn PageHandle,
    element: &dyn ElementHandle,
    kind: DownloadKind,
    file: &DownloadFile,
    dir: &Path,
    settings: &CrawlerSettings,
) -> CrawlResult<PathBuf> {
    let item_error = |message: String| CrawlError::DownloadItem {
        name: file.name.clone(),
        message,
    };

    let capture = page
        .begin_download()
        .await
        .map_err(|e| item_error(format!("cannot arm download: {e:#}")))?;

    let modifier = settings.download_modifier();
    let hold = kind == DownloadKind::ByUrl;
    if hold {
        page.press_key(modifier)
            .await
            .map_err(|e| item_error(format!("cannot press {}: {e:#}", modifier.key())))?;
    }

    let bytes = match element.click().await {
        Ok(()) => with_page_timeout(capture.bytes(), settings.download_timeout(), "download")
            .await
            .map_err(|e| item_error(e.to_string())),
        Err(e) => Err(item_error(format!("click failed: {e:#}"))),
    };

    if hold && let Err(e) = page.release_key(modifier).await {
        log::warn!("Failed to release {}: {e:#}", modifier.key());
    }

    write_file(dir, &file.name, &bytes?)
        .await
        .map_err(|e| item_error(e.to_string()))
}

/// Open the file's URL in a fresh tab, print it to PDF and close the tab
async fn save_as_pdf(
    browser: &dyn BrowserDriver,
    file: &DownloadFile,
    dir: &Path,
    settings: &CrawlerSettings,
) -> CrawlResult<PathBuf> {
    let item_error = |message: String| CrawlError::DownloadItem {
        name: file.name.clone(),
        message,
    };
    if file.url.trim().is_empty() {
        return Err(item_error("no source url".to_string()));
    }

    let tab = browser
        .open_page(&file.url)
        .await
        .map_err(|e| item_error(format!("cannot open {}: {e:#}", file.url)))?;

    let rendered = async {
        with_page_timeout(tab.wait_for_load(), settings.pdf_settle_timeout(), "pdf settle")
            .await?;
        tab.print_pdf().await.map_err(|e| CrawlError::browser(&e))
    }
    .await;

    if let Err(e) = tab.close().await {
        log::warn!("Failed to close pdf tab for {}: {e:#}", file.url);
    }

    let bytes = rendered.map_err(|e| item_error(e.to_string()))?;
    write_file(dir, &pdf_name(&file.name), &bytes)
        .await
        .map_err(|e| item_error(e.to_string()))
}

fn pdf_name(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

async fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    let path = unique_destination(dir, &safe_file_name(name)).await;
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}
