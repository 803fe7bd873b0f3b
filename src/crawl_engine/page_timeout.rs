//! Timeout utilities for page operations
//!
//! Wraps collaborator futures with an explicit deadline so that a hung
//! browser call surfaces as `CrawlError::Timeout` instead of blocking the
//! crawl forever.

use std::future::Future;
use std::time::Duration;

use super::crawl_types::{CrawlError, CrawlResult};

/// Run a browser operation with a deadline.
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err(CrawlError::Timeout)` - The deadline elapsed first
/// * `Err(CrawlError::Browser)` - The operation itself failed
pub async fn with_page_timeout<F, T>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> CrawlResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CrawlError::Browser(format!("{operation_name}: {e:#}"))),
        Err(_) => Err(CrawlError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn hung_operation_times_out() {
        let result: CrawlResult<()> = with_page_timeout(
            std::future::pending::<anyhow::Result<()>>(),
            Duration::from_secs(30),
            "Page load",
        )
        .await;
        assert!(matches!(result, Err(CrawlError::Timeout { .. })));
    }

    #[tokio::test]
    async fn operation_failure_is_a_browser_error() {
        let result: CrawlResult<()> = with_page_timeout(
            async { Err(anyhow::anyhow!("target closed")) },
            Duration::from_secs(1),
            "Page load",
        )
        .await;
        match result {
            Err(CrawlError::Browser(msg)) => assert!(msg.contains("target closed")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
