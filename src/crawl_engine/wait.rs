//! Visibility wait engine
//!
//! All waits probe the page at a fixed interval against a hard deadline. A
//! transition is declared on the first probe that observes the target state;
//! when the target state already holds at call time the wait returns without
//! sleeping.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::crawl_types::{CrawlError, CrawlResult};
use super::visibility::is_visible;
use crate::browser::{ElementHandle, PageHandle};

/// Wait until `selector` is visible
pub async fn wait_show(
    page: &dyn PageHandle,
    selector: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> CrawlResult<()> {
    wait_for_state(page, selector, true, poll_interval, timeout).await
}

/// Wait until `selector` is no longer visible
pub async fn wait_hide(
    page: &dyn PageHandle,
    selector: &str,
    poll_interval: Duration,
    timeout: Duration,
) -> CrawlResult<()> {
    wait_for_state(page, selector, false, poll_interval, timeout).await
}

async fn wait_for_state(
    page: &dyn PageHandle,
    selector: &str,
    visible: bool,
    poll_interval: Duration,
    timeout: Duration,
) -> CrawlResult<()> {
    let operation = if visible {
        "wait element show"
    } else {
        "wait element hide"
    };
    log::debug!("{operation}: {selector} (timeout {}ms)", timeout.as_millis());

    let poll = async {
        loop {
            if is_visible(page, selector).await == visible {
                return;
            }
            tokio::time::sleep(poll_interval).await;
        }
    };

    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| CrawlError::timeout(format!("{operation} '{selector}'"), timeout))
}

/// Race several selectors; the first one observed visible wins.
///
/// One poller task runs per selector. Probes from all pollers are serialized
/// through a shared lock so the page connection never sees two concurrent
/// evaluations from this race. Losing pollers are cancelled as soon as a
/// winner is found or the deadline passes.
///
/// Returns the winning selector's index and its element.
pub async fn race_show(
    page: Arc<dyn PageHandle>,
    selectors: &[String],
    poll_interval: Duration,
    timeout: Duration,
) -> CrawlResult<(usize, Box<dyn ElementHandle>)> {
    if selectors.is_empty() {
        return Err(CrawlError::Config(
            "race needs at least one selector".to_string(),
        ));
    }

    let cancel = CancellationToken::new();
    let probe_lock = Arc::new(Mutex::new(()));
    let (winner_tx, mut winner_rx) = mpsc::channel::<usize>(1);
    let mut pollers = JoinSet::new();

    for (index, selector) in selectors.iter().enumerate() {
        let page = Arc::clone(&page);
        let cancel = cancel.clone();
        let probe_lock = Arc::clone(&probe_lock);
        let winner_tx = winner_tx.clone();
        let selector = selector.clone();

        pollers.spawn(async move {
            loop {
                let visible = {
                    let _probe = probe_lock.lock().await;
                    if cancel.is_cancelled() {
                        return;
                    }
                    is_visible(page.as_ref(), &selector).await
                };
                if visible {
                    // a full channel means another poller already won
                    let _ = winner_tx.try_send(index);
                    return;
                }
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(poll_interval) => {}
                }
            }
        });
    }
    drop(winner_tx);

    let outcome = tokio::time::timeout(timeout, winner_rx.recv()).await;
    cancel.cancel();
    pollers.shutdown().await;

    let index = match outcome {
        Ok(Some(index)) => index,
        _ => {
            return Err(CrawlError::timeout(
                format!("race of {} selectors", selectors.len()),
                timeout,
            ));
        }
    };
    log::debug!("Race won by selector #{index}: {}", selectors[index]);

    let element = page
        .query_all(&selectors[index])
        .await
        .map_err(|e| CrawlError::browser(&e))?
        .into_iter()
        .next()
        .ok_or_else(|| {
            CrawlError::Browser(format!(
                "selector '{}' vanished after winning the race",
                selectors[index]
            ))
        })?;
    Ok((index, element))
}
