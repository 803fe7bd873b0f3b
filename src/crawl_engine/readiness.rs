//! Page readiness gate
//!
//! Load/idle wait, then the configured selector wait, then the fixed settle
//! delay. The order is fixed and the first failure aborts the gate.

use std::time::Duration;

use super::crawl_types::CrawlResult;
use super::page_timeout::with_page_timeout;
use super::wait::{wait_hide, wait_show};
use crate::browser::PageHandle;
use crate::config::{CrawlerSettings, PageLoad, WaitMode};

pub async fn wait_until_ready(
    page: &dyn PageHandle,
    page_load: &PageLoad,
    settings: &CrawlerSettings,
) -> CrawlResult<()> {
    with_page_timeout(
        page.wait_for_load(),
        settings.page_load_timeout(),
        "page load",
    )
    .await?;

    if let Some(selector) = page_load.gate_selector() {
        match page_load.wait {
            WaitMode::Show => {
                wait_show(
                    page,
                    selector,
                    settings.poll_interval(),
                    settings.selector_timeout(),
                )
                .await?;
            }
            WaitMode::Hide => {
                wait_hide(
                    page,
                    selector,
                    settings.poll_interval(),
                    settings.selector_timeout(),
                )
                .await?;
            }
            WaitMode::None | WaitMode::Delay => {}
        }
    }

    if page_load.sleep_seconds > 0 {
        log::debug!("Settling for {}s", page_load.sleep_seconds);
        tokio::time::sleep(Duration::from_secs(page_load.sleep_seconds)).await;
    }
    Ok(())
}
