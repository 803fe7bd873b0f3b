//! Crawler façade
//!
//! `Crawler` composes the pipeline stages in their fixed order:
//! readiness → extraction → download dispatch → external resolution.
//! A failing stage aborts the crawl step; download and external failures are
//! absorbed into the result tree by their own stages.

use futures::future::BoxFuture;
use std::sync::Arc;

use super::crawl_types::{CrawlContext, CrawlError, CrawlResult};
use super::download::dispatch_downloads;
use super::external::resolve_externals;
use super::readiness::wait_until_ready;
use crate::browser::{BrowserDriver, PageHandle};
use crate::config::{ConfigFetcher, ConfigSource, CrawlerSettings, LoadedConfig, load_config};
use crate::page_extractor::{ResultTree, extract};

/// Per-call switches, inherited unchanged by nested external crawls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Run the download dispatcher
    pub auto_download: bool,
    /// Close the tab once its crawl step finishes
    pub close_tab: bool,
}

/// Result of `Crawler::crawl_url`
pub struct CrawlOutcome {
    pub result: ResultTree,
    /// The crawled tab, if it was left open
    pub page: Option<Arc<dyn PageHandle>>,
}

impl std::fmt::Debug for CrawlOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlOutcome")
            .field("result", &self.result)
            .field("page_open", &self.page.is_some())
            .finish()
    }
}

pub struct Crawler {
    browser: Arc<dyn BrowserDriver>,
    fetcher: Arc<dyn ConfigFetcher>,
    settings: CrawlerSettings,
}

impl Crawler {
    #[must_use]
    pub fn new(
        browser: Arc<dyn BrowserDriver>,
        fetcher: Arc<dyn ConfigFetcher>,
        settings: CrawlerSettings,
    ) -> Self {
        Self {
            browser,
            fetcher,
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CrawlerSettings {
        &self.settings
    }

    pub(crate) fn fetcher(&self) -> &dyn ConfigFetcher {
        self.fetcher.as_ref()
    }

    /// Open `url`, gate on the config's readiness conditions, then crawl it.
    ///
    /// On success the tab is returned unless `close_tab` was set. On failure
    /// no partial result is returned and the tab is closed.
    pub async fn crawl_url(
        &self,
        url: &str,
        source: impl Into<ConfigSource>,
        options: CrawlOptions,
    ) -> CrawlResult<CrawlOutcome> {
        let loaded = load_config(source.into(), self.fetcher()).await?;
        let ctx = CrawlContext::root().entered(url, loaded.location.as_deref().unwrap_or("inline"));
        self.crawl_loaded_url(url.to_string(), loaded, options, ctx)
            .await
    }

    /// Crawl an already-open, already-ready page. Readiness gating is the
    /// caller's responsibility.
    ///
    /// `page_url` is the address the page was opened at; external bindings
    /// that lead back to it are treated as cycles.
    pub async fn crawl_page(
        &self,
        page: Arc<dyn PageHandle>,
        page_url: &str,
        source: impl Into<ConfigSource>,
        options: CrawlOptions,
    ) -> CrawlResult<ResultTree> {
        let loaded = load_config(source.into(), self.fetcher()).await?;
        let ctx = CrawlContext::root()
            .entered(page_url, loaded.location.as_deref().unwrap_or("inline"));
        self.crawl_loaded_page(&page, &loaded, options, &ctx).await
    }

    /// Boxed so external resolution can recurse through it
    pub(crate) fn crawl_loaded_url(
        &self,
        url: String,
        loaded: LoadedConfig,
        options: CrawlOptions,
        ctx: CrawlContext,
    ) -> BoxFuture<'_, CrawlResult<CrawlOutcome>> {
        Box::pin(async move {
            let page = self
                .browser
                .open_page(&url)
                .await
                .map_err(|e| CrawlError::Browser(format!("cannot open {url}: {e:#}")))?;

            if let Err(e) = wait_until_ready(page.as_ref(), &loaded.config.page_load, &self.settings).await {
                log::warn!("Page {url} never became ready: {e}");
                close_quietly(page.as_ref()).await;
                return Err(e);
            }

            match self.crawl_loaded_page(&page, &loaded, options, &ctx).await {
                Ok(result) => Ok(CrawlOutcome {
                    result,
                    page: (!options.close_tab).then_some(page),
                }),
                Err(e) => {
                    if !options.close_tab {
                        close_quietly(page.as_ref()).await;
                    }
                    Err(e)
                }
            }
        })
    }

    async fn crawl_loaded_page(
        &self,
        page: &Arc<dyn PageHandle>,
        loaded: &LoadedConfig,
        options: CrawlOptions,
        ctx: &CrawlContext,
    ) -> CrawlResult<ResultTree> {
        let outcome = self.run_stages(page, loaded, options, ctx).await;
        if options.close_tab {
            close_quietly(page.as_ref()).await;
        }
        outcome
    }

    async fn run_stages(
        &self,
        page: &Arc<dyn PageHandle>,
        loaded: &LoadedConfig,
        options: CrawlOptions,
        ctx: &CrawlContext,
    ) -> CrawlResult<ResultTree> {
        let config = &loaded.config;
        let mut result = extract(page.as_ref(), config, self.settings.evaluator_script()).await?;

        if options.auto_download && config.downloads_configured() && !result.downloads.is_empty() {
            let root = if result.download_root.is_empty() {
                config.download_root.clone().unwrap_or_default()
            } else {
                result.download_root.clone()
            };
            dispatch_downloads(
                self.browser.as_ref(),
                page.as_ref(),
                &config.download_section,
                &mut result.downloads,
                &root,
                &self.settings,
            )
            .await;
        }

        if !result.external_section.is_empty() {
            resolve_externals(self, loaded.location.as_deref(), &mut result, options, ctx).await;
        }

        Ok(result)
    }
}

pub(super) async fn close_quietly(page: &dyn PageHandle) {
    if let Err(e) = page.close().await {
        log::debug!("Failed to close page: {e:#}");
    }
}
