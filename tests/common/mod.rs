//! In-memory browser and config fakes for the crawl engine test suite
//!
//! Visibility schedules are expressed against tokio's clock, so tests run
//! with `start_paused = true` and observe exact timing.

#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use rpa_crawler::browser::{BrowserDriver, DownloadCapture, ElementHandle, ModifierKey, PageHandle};
use rpa_crawler::config::{ConfigFetcher, CrawlConfig};
use rpa_crawler::page_extractor::js_scripts::VISIBILITY_SCRIPT;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// How a selector's visibility evolves from the moment the page opens
#[derive(Debug, Clone, Copy)]
pub enum Visibility {
    Never,
    Always,
    ShownAt(Duration),
    HiddenAt(Duration),
}

impl Visibility {
    fn at(self, elapsed: Duration) -> bool {
        match self {
            Self::Never => false,
            Self::Always => true,
            Self::ShownAt(t) => elapsed >= t,
            Self::HiddenAt(t) => elapsed < t,
        }
    }
}

/// What the download armed before clicking an element produces
#[derive(Debug, Clone)]
pub enum DownloadBehavior {
    Bytes(Vec<u8>),
    Fail(String),
    Hang,
}

/// Scripted behavior of one page
#[derive(Debug, Clone, Default)]
pub struct PageSpec {
    /// Evaluator return value; `None` makes the evaluator throw
    pub result: Option<Value>,
    pub visibility: HashMap<String, Visibility>,
    pub elements: HashMap<String, usize>,
    pub downloads: HashMap<(String, usize), DownloadBehavior>,
    pub load_hangs: bool,
    /// Simulated latency of each visibility probe
    pub probe_delay: Duration,
}

impl PageSpec {
    pub fn with_result(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn visible(mut self, selector: &str, visibility: Visibility) -> Self {
        self.visibility.insert(selector.to_string(), visibility);
        self
    }

    pub fn elements(mut self, selector: &str, count: usize) -> Self {
        self.elements.insert(selector.to_string(), count);
        self
    }

    pub fn download(mut self, selector: &str, index: usize, behavior: DownloadBehavior) -> Self {
        self.downloads.insert((selector.to_string(), index), behavior);
        self
    }

    pub fn probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = delay;
        self
    }

    pub fn load_hangs(mut self) -> Self {
        self.load_hangs = true;
        self
    }
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

type ClickSlot = Arc<Mutex<Option<(String, usize)>>>;

pub struct FakePage {
    pub url: String,
    spec: PageSpec,
    opened_at: Instant,
    log: EventLog,
    pub probes: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub closed: AtomicBool,
    last_click: ClickSlot,
}

impl FakePage {
    pub fn new(url: &str, spec: PageSpec, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            url: url.to_string(),
            spec,
            opened_at: Instant::now(),
            log,
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            last_click: ClickSlot::default(),
        })
    }

    pub fn standalone(spec: PageSpec) -> Arc<Self> {
        Self::new("about:blank", spec, EventLog::default())
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }

    async fn probe(&self, selector: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.spec.probe_delay.is_zero() {
            tokio::time::sleep(self.spec.probe_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spec
            .visibility
            .get(selector)
            .is_some_and(|v| v.at(self.opened_at.elapsed()))
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn wait_for_load(&self) -> Result<()> {
        if self.spec.load_hangs {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn evaluate(&self, function: &str, args: Vec<Value>) -> Result<Value> {
        if function == VISIBILITY_SCRIPT {
            let selector = args.first().and_then(Value::as_str).unwrap_or_default();
            if selector.contains("!!") {
                return Err(anyhow!("SyntaxError: '{selector}' is not a valid selector"));
            }
            return Ok(Value::Bool(self.probe(selector).await));
        }
        if function.starts_with("(cfg) =>") {
            self.record(format!("extract {}", self.url));
            return self
                .spec
                .result
                .clone()
                .ok_or_else(|| anyhow!("evaluator threw on {}", self.url));
        }
        Err(anyhow!("unexpected script"))
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn ElementHandle>>> {
        let count = self.spec.elements.get(selector).copied().unwrap_or(0);
        Ok((0..count)
            .map(|index| {
                Box::new(FakeElement {
                    selector: selector.to_string(),
                    index,
                    log: Arc::clone(&self.log),
                    last_click: Arc::clone(&self.last_click),
                }) as Box<dyn ElementHandle>
            })
            .collect())
    }

    async fn press_key(&self, key: ModifierKey) -> Result<()> {
        self.record(format!("press {}", key.key()));
        Ok(())
    }

    async fn release_key(&self, key: ModifierKey) -> Result<()> {
        self.record(format!("release {}", key.key()));
        Ok(())
    }

    async fn begin_download(&self) -> Result<Box<dyn DownloadCapture>> {
        Ok(Box::new(FakeDownload {
            last_click: Arc::clone(&self.last_click),
            downloads: self.spec.downloads.clone(),
        }))
    }

    async fn print_pdf(&self) -> Result<Vec<u8>> {
        self.record(format!("pdf {}", self.url));
        Ok(format!("%PDF {}", self.url).into_bytes())
    }

    async fn close(&self) -> Result<()> {
        self.record(format!("close {}", self.url));
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeElement {
    selector: String,
    index: usize,
    log: EventLog,
    last_click: ClickSlot,
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn click(&self) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push(format!("click {}#{}", self.selector, self.index));
        *self.last_click.lock().unwrap() = Some((self.selector.clone(), self.index));
        Ok(())
    }
}

pub struct FakeDownload {
    last_click: ClickSlot,
    downloads: HashMap<(String, usize), DownloadBehavior>,
}

#[async_trait]
impl DownloadCapture for FakeDownload {
    async fn bytes(self: Box<Self>) -> Result<Vec<u8>> {
        let clicked = self
            .last_click
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("nothing was clicked"))?;
        match self.downloads.get(&clicked).cloned() {
            Some(DownloadBehavior::Bytes(bytes)) => Ok(bytes),
            Some(DownloadBehavior::Fail(message)) => Err(anyhow!(message)),
            Some(DownloadBehavior::Hang) | None => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

/// Opens `FakePage`s from a url-keyed table of specs
#[derive(Default)]
pub struct FakeBrowser {
    specs: HashMap<String, PageSpec>,
    pub log: EventLog,
    pub pages: Mutex<Vec<Arc<FakePage>>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, spec: PageSpec) -> Self {
        self.specs.insert(url.to_string(), spec);
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.url.clone())
            .collect()
    }

    pub fn all_closed(&self) -> bool {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .all(|p| p.closed.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn open_page(&self, url: &str) -> Result<Arc<dyn PageHandle>> {
        let spec = self
            .specs
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("net::ERR_NAME_NOT_RESOLVED at {url}"))?;
        self.log.lock().unwrap().push(format!("open {url}"));
        let page = FakePage::new(url, spec, Arc::clone(&self.log));
        self.pages.lock().unwrap().push(Arc::clone(&page));
        Ok(page)
    }
}

/// Serves configs from memory and counts fetches
#[derive(Default)]
pub struct MapFetcher {
    configs: HashMap<String, CrawlConfig>,
    pub fetched: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, location: &str, json: Value) -> Self {
        let config = serde_json::from_value(json).unwrap();
        self.configs.insert(location.to_string(), config);
        self
    }
}

#[async_trait]
impl ConfigFetcher for MapFetcher {
    async fn fetch(&self, location: &str) -> Result<CrawlConfig> {
        self.fetched.lock().unwrap().push(location.to_string());
        self.configs
            .get(location)
            .cloned()
            .ok_or_else(|| anyhow!("no config at {location}"))
    }
}
