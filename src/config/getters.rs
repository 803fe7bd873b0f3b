//! Getter methods for `CrawlerSettings`

use std::time::Duration;

use super::builder::CrawlerSettings;
use crate::browser::ModifierKey;

impl CrawlerSettings {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        self.page_load_timeout
    }

    #[must_use]
    pub fn selector_timeout(&self) -> Duration {
        self.selector_timeout
    }

    #[must_use]
    pub fn download_timeout(&self) -> Duration {
        self.download_timeout
    }

    #[must_use]
    pub fn pdf_settle_timeout(&self) -> Duration {
        self.pdf_settle_timeout
    }

    #[must_use]
    pub fn max_external_depth(&self) -> usize {
        self.max_external_depth
    }

    #[must_use]
    pub fn evaluator_script(&self) -> &str {
        &self.evaluator_script
    }

    #[must_use]
    pub fn download_modifier(&self) -> ModifierKey {
        self.download_modifier
    }
}
