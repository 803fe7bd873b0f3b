//! chromiumoxide-backed implementation of the browser capability set

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, SetDownloadBehaviorBehavior,
    SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use futures::StreamExt;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tracing::{debug, info, trace};

use super::setup::BrowserWrapper;
use super::{BrowserDriver, DownloadCapture, ElementHandle, ModifierKey, PageHandle};
use crate::page_extractor::js_scripts::{CLICK_NTH_SCRIPT, COUNT_SCRIPT, READY_STATE_SCRIPT};
use crate::utils::constants::NETWORK_IDLE_WINDOW;

const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Opens pages in a launched Chrome/Chromium
pub struct ChromiumDriver {
    wrapper: BrowserWrapper,
    /// Staging area for in-flight downloads; removed with the driver
    download_dir: Arc<TempDir>,
}

impl ChromiumDriver {
    /// Take ownership of a launched browser
    ///
    /// # Errors
    ///
    /// Fails if the download staging directory cannot be created.
    pub fn new(wrapper: BrowserWrapper) -> Result<Self> {
        let download_dir = tempfile::Builder::new()
            .prefix("rpa_downloads_")
            .tempdir()
            .context("Failed to create download staging directory")?;
        Ok(Self {
            wrapper,
            download_dir: Arc::new(download_dir),
        })
    }

    /// Close the browser and remove its profile
    pub async fn shutdown(mut self) {
        self.wrapper.shutdown().await;
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageHandle>> {
        info!("Opening page: {}", url);
        let page = self
            .wrapper
            .browser()
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open page {url}"))?;
        Ok(Arc::new(ChromiumPage::new(page, Arc::clone(&self.download_dir))))
    }
}

/// One chromiumoxide tab
pub struct ChromiumPage {
    page: Page,
    download_dir: Arc<TempDir>,
    /// CDP modifier mask of keys currently held down
    held: Arc<AtomicI64>,
}

impl ChromiumPage {
    #[must_use]
    pub fn new(page: Page, download_dir: Arc<TempDir>) -> Self {
        Self {
            page,
            download_dir,
            held: Arc::new(AtomicI64::new(0)),
        }
    }

    async fn dispatch_key(&self, key: ModifierKey, kind: DispatchKeyEventType) -> Result<()> {
        let params = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key.key())
            .code(key.code())
            .windows_virtual_key_code(key.virtual_key_code())
            .modifiers(self.held.load(Ordering::SeqCst))
            .build()
            .map_err(|e| anyhow!("Failed to build key event: {e}"))?;
        self.page.execute(params).await?;
        Ok(())
    }
}

/// Pierced selectors cannot be resolved by a native DOM query
fn is_pierced(selector: &str) -> bool {
    let s = selector.trim_start();
    s.starts_with(":frame(") || s.starts_with(":shadow(")
}

/// `(function)(arg0, arg1, ...)` with JSON-encoded arguments
fn call_expression(function: &str, args: &[Value]) -> String {
    let args = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("({function})({args})")
}

/// Evaluate `function` with `args`, awaiting promises; `undefined` reads as null
async fn evaluate_on(page: &Page, function: &str, args: &[Value]) -> Result<Value> {
    let params = EvaluateParams::builder()
        .expression(call_expression(function, args))
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(|e| anyhow!("Failed to build evaluation: {e}"))?;
    let result = page.evaluate_expression(params).await?;
    Ok(result.into_value::<Value>().unwrap_or(Value::Null))
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn wait_for_load(&self) -> Result<()> {
        self.page
            .wait_for_navigation()
            .await
            .context("Navigation did not complete")?;

        // readyState must be complete and the resource count must hold still
        // for a full idle window
        let mut last_count = None;
        let mut quiet_since = tokio::time::Instant::now();
        loop {
            let sample = self.evaluate(READY_STATE_SCRIPT, Vec::new()).await?;
            let complete = sample.get("readyState").and_then(Value::as_str) == Some("complete")
                && sample.get("bodyExists").and_then(Value::as_bool).unwrap_or(false);
            let count = sample.get("resources").and_then(Value::as_u64);

            if !complete || count != last_count {
                quiet_since = tokio::time::Instant::now();
                last_count = count;
            } else if quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                debug!("Page idle with {:?} resources", count);
                return Ok(());
            }
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;
        }
    }

    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value> {
        evaluate_on(&self.page, function, &args).await
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        if is_pierced(selector) {
            let count = self
                .evaluate(COUNT_SCRIPT, vec![Value::from(selector)])
                .await?
                .as_u64()
                .unwrap_or(0);
            trace!("Pierced selector {} matched {} elements", selector, count);
            let elements = (0..count)
                .map(|index| {
                    Box::new(ScriptedElement {
                        page: self.page.clone(),
                        selector: selector.to_string(),
                        index,
                        held: Arc::clone(&self.held),
                    }) as Box<dyn ElementHandle>
                })
                .collect();
            return Ok(elements);
        }

        let elements = self
            .page
            .find_elements(selector)
            .await
            .with_context(|| format!("Failed to query {selector}"))?;
        Ok(elements
            .into_iter()
            .map(|element| {
                Box::new(NativeElement {
                    page: self.page.clone(),
                    element,
                    held: Arc::clone(&self.held),
                }) as Box<dyn ElementHandle>
            })
            .collect())
    }

    async fn press_key(&self, key: ModifierKey) -> Result<()> {
        self.held.fetch_or(key.mask(), Ordering::SeqCst);
        self.dispatch_key(key, DispatchKeyEventType::RawKeyDown).await
    }

    async fn release_key(&self, key: ModifierKey) -> Result<()> {
        self.held.fetch_and(!key.mask(), Ordering::SeqCst);
        self.dispatch_key(key, DispatchKeyEventType::KeyUp).await
    }

    async fn begin_download(&self) -> Result<Box<dyn DownloadCapture>> {
        let dir = self.download_dir.path().to_path_buf();
        let params = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(dir.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(|e| anyhow!("Failed to build download behavior: {e}"))?;
        self.page.execute(params).await?;

        let events = self
            .page
            .event_listener::<EventDownloadProgress>()
            .await
            .context("Failed to listen for download progress")?;
        Ok(Box::new(ChromiumDownload {
            events: Box::pin(events.map(|event| {
                (event.guid.clone(), event.state.clone())
            })),
            dir,
        }))
    }

    async fn print_pdf(&self) -> Result<Vec<u8>> {
        self.page
            .pdf(PrintToPdfParams::default())
            .await
            .context("Failed to print page to PDF")
    }

    async fn close(&self) -> Result<()> {
        self.page.clone().close().await.context("Failed to close page")
    }
}

/// Element found by a native query
struct NativeElement {
    page: Page,
    element: Element,
    held: Arc<AtomicI64>,
}

impl NativeElement {
    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<()> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .modifiers(self.held.load(Ordering::SeqCst))
            .build()
            .map_err(|e| anyhow!("Failed to build mouse event: {e}"))?;
        self.page.execute(params).await?;
        Ok(())
    }
}

#[async_trait]
impl ElementHandle for NativeElement {
    async fn click(&self) -> Result<()> {
        self.element.scroll_into_view().await?;
        let point = self.element.clickable_point().await?;
        self.mouse(DispatchMouseEventType::MouseMoved, point.x, point.y)
            .await?;
        self.mouse(DispatchMouseEventType::MousePressed, point.x, point.y)
            .await?;
        self.mouse(DispatchMouseEventType::MouseReleased, point.x, point.y)
            .await
    }
}

/// Element behind a frame or shadow boundary, addressed by position
struct ScriptedElement {
    page: Page,
    selector: String,
    index: u64,
    held: Arc<AtomicI64>,
}

#[async_trait]
impl ElementHandle for ScriptedElement {
    async fn click(&self) -> Result<()> {
        let args = [
            Value::from(self.selector.as_str()),
            Value::from(self.index),
            Value::from(self.held.load(Ordering::SeqCst)),
        ];
        evaluate_on(&self.page, CLICK_NTH_SCRIPT, &args)
            .await
            .with_context(|| format!("Failed to click {}#{}", self.selector, self.index))?;
        Ok(())
    }
}

type ProgressStream =
    std::pin::Pin<Box<dyn futures::Stream<Item = (String, DownloadProgressState)> + Send>>;

/// Download armed on a page; the browser saves it as `<dir>/<guid>`
struct ChromiumDownload {
    events: ProgressStream,
    dir: PathBuf,
}

#[async_trait]
impl DownloadCapture for ChromiumDownload {
    async fn bytes(mut self: Box<Self>) -> Result<Vec<u8>> {
        while let Some((guid, state)) = self.events.next().await {
            match state {
                DownloadProgressState::Completed => {
                    let staged = self.dir.join(&guid);
                    let bytes = tokio::fs::read(&staged)
                        .await
                        .with_context(|| format!("Failed to read download {}", staged.display()))?;
                    if let Err(e) = tokio::fs::remove_file(&staged).await {
                        debug!("Could not remove staged download {}: {}", staged.display(), e);
                    }
                    return Ok(bytes);
                }
                DownloadProgressState::Canceled => {
                    return Err(anyhow!("Download {guid} was canceled"));
                }
                DownloadProgressState::InProgress => {}
            }
        }
        Err(anyhow!("Download event stream ended"))
    }
}
