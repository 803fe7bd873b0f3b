//! Engine settings and their builder
//!
//! `CrawlerSettings` holds the tunables of the crawl engine itself (poll
//! cadence, deadlines, recursion bound, evaluator script). They are separate
//! from `CrawlConfig`, which is authored per target page.

use anyhow::{Result, anyhow};
use std::time::Duration;

use crate::browser::ModifierKey;
use crate::page_extractor::js_scripts::DEFAULT_EVALUATOR_SCRIPT;
use crate::utils::constants::{
    DEFAULT_DOWNLOAD_TIMEOUT, DEFAULT_MAX_EXTERNAL_DEPTH, DEFAULT_PAGE_LOAD_TIMEOUT,
    DEFAULT_PDF_SETTLE_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_SELECTOR_TIMEOUT,
    MAX_POLL_INTERVAL, MIN_POLL_INTERVAL,
};

/// Engine tunables
#[derive(Debug, Clone)]
pub struct CrawlerSettings {
    pub(crate) poll_interval: Duration,
    pub(crate) page_load_timeout: Duration,
    pub(crate) selector_timeout: Duration,
    pub(crate) download_timeout: Duration,
    pub(crate) pdf_settle_timeout: Duration,
    pub(crate) max_external_depth: usize,
    pub(crate) evaluator_script: String,
    pub(crate) download_modifier: ModifierKey,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            page_load_timeout: DEFAULT_PAGE_LOAD_TIMEOUT,
            selector_timeout: DEFAULT_SELECTOR_TIMEOUT,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            pdf_settle_timeout: DEFAULT_PDF_SETTLE_TIMEOUT,
            max_external_depth: DEFAULT_MAX_EXTERNAL_DEPTH,
            evaluator_script: DEFAULT_EVALUATOR_SCRIPT.to_string(),
            download_modifier: ModifierKey::Alt,
        }
    }
}

impl CrawlerSettings {
    #[must_use]
    pub fn builder() -> CrawlerSettingsBuilder {
        CrawlerSettingsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CrawlerSettingsBuilder {
    settings: CrawlerSettings,
}

impl CrawlerSettingsBuilder {
    /// Probe cadence for wait loops; must lie within 100..=1000 ms
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.settings.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn page_load_timeout(mut self, timeout: Duration) -> Self {
        self.settings.page_load_timeout = timeout;
        self
    }

    #[must_use]
    pub fn selector_timeout(mut self, timeout: Duration) -> Self {
        self.settings.selector_timeout = timeout;
        self
    }

    #[must_use]
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.settings.download_timeout = timeout;
        self
    }

    #[must_use]
    pub fn pdf_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settings.pdf_settle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn max_external_depth(mut self, depth: usize) -> Self {
        self.settings.max_external_depth = depth;
        self
    }

    /// Replace the bundled in-page evaluator. The script must define a
    /// global `run(config)` function returning the result document.
    #[must_use]
    pub fn evaluator_script(mut self, script: impl Into<String>) -> Self {
        self.settings.evaluator_script = script.into();
        self
    }

    #[must_use]
    pub fn download_modifier(mut self, key: ModifierKey) -> Self {
        self.settings.download_modifier = key;
        self
    }

    /// Validate and build the settings
    ///
    /// # Errors
    ///
    /// Returns an error if the poll interval is out of range, any deadline
    /// is zero, or the evaluator script is empty.
    pub fn build(self) -> Result<CrawlerSettings> {
        let s = self.settings;
        if !(MIN_POLL_INTERVAL..=MAX_POLL_INTERVAL).contains(&s.poll_interval) {
            return Err(anyhow!(
                "poll_interval must be between {}ms and {}ms, got {}ms",
                MIN_POLL_INTERVAL.as_millis(),
                MAX_POLL_INTERVAL.as_millis(),
                s.poll_interval.as_millis()
            ));
        }
        for (name, value) in [
            ("page_load_timeout", s.page_load_timeout),
            ("selector_timeout", s.selector_timeout),
            ("download_timeout", s.download_timeout),
            ("pdf_settle_timeout", s.pdf_settle_timeout),
        ] {
            if value.is_zero() {
                return Err(anyhow!("{name} must be greater than zero"));
            }
        }
        if s.evaluator_script.trim().is_empty() {
            return Err(anyhow!("evaluator_script must not be empty"));
        }
        Ok(s)
    }
}
