//! Timing tests for visibility waits, selector races and the readiness gate
//!
//! Every test runs on a paused tokio clock so elapsed times are exact.

mod common;

use common::{FakePage, PageSpec, Visibility};
use rpa_crawler::browser::PageHandle;
use rpa_crawler::config::{CrawlerSettings, PageLoad, WaitMode};
use rpa_crawler::crawl_engine::{
    CrawlError, is_visible, race_show, wait_hide, wait_show, wait_until_ready,
};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

const POLL: Duration = Duration::from_millis(100);

#[tokio::test(start_paused = true)]
async fn absent_or_invalid_selectors_read_as_hidden() {
    let page = FakePage::standalone(PageSpec::default().visible("#here", Visibility::Always));

    assert!(is_visible(page.as_ref(), "#here").await);
    assert!(!is_visible(page.as_ref(), "#missing").await);
    assert!(!is_visible(page.as_ref(), "div!!broken").await);
}

#[tokio::test(start_paused = true)]
async fn wait_returns_without_sleeping_when_state_already_holds() {
    let page = FakePage::standalone(
        PageSpec::default()
            .visible("#shown", Visibility::Always)
            .visible("#gone", Visibility::Never),
    );

    let start = Instant::now();
    wait_show(page.as_ref(), "#shown", POLL, Duration::from_secs(2))
        .await
        .unwrap();
    wait_hide(page.as_ref(), "#gone", POLL, Duration::from_secs(2))
        .await
        .unwrap();

    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(page.probes.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn wait_show_detects_transition_on_next_probe() {
    let page = FakePage::standalone(
        PageSpec::default().visible("#content", Visibility::ShownAt(Duration::from_millis(350))),
    );

    let start = Instant::now();
    wait_show(page.as_ref(), "#content", POLL, Duration::from_secs(2))
        .await
        .unwrap();

    // probes at 0, 100, 200, 300 miss; 400 hits
    assert_eq!(start.elapsed(), Duration::from_millis(400));
    assert_eq!(page.probes.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn wait_hide_detects_spinner_removal() {
    let page = FakePage::standalone(
        PageSpec::default().visible(".spinner", Visibility::HiddenAt(Duration::from_millis(150))),
    );

    let start = Instant::now();
    wait_hide(page.as_ref(), ".spinner", POLL, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn unchanging_selector_times_out_at_deadline() {
    let page = FakePage::standalone(PageSpec::default());
    let timeout = Duration::from_secs(2);

    let start = Instant::now();
    let err = wait_show(page.as_ref(), "#never", POLL, timeout)
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), timeout);
    assert!(err.is_timeout());
    assert!(err.to_string().contains("#never"));
}

#[tokio::test(start_paused = true)]
async fn hide_wait_times_out_at_deadline() {
    let page = FakePage::standalone(PageSpec::default().visible("#overlay", Visibility::Always));
    let timeout = Duration::from_secs(2);

    let start = Instant::now();
    let err = wait_hide(page.as_ref(), "#overlay", POLL, timeout)
        .await
        .unwrap_err();

    assert_eq!(start.elapsed(), timeout);
    assert!(err.is_timeout());
    assert!(err.to_string().contains("#overlay"));
}

#[tokio::test(start_paused = true)]
async fn race_returns_first_shown_selector() {
    let fake = FakePage::standalone(
        PageSpec::default()
            .visible("#b", Visibility::ShownAt(Duration::from_millis(200)))
            .elements("#b", 1)
            .probe_delay(Duration::from_millis(10)),
    );
    let page: Arc<dyn PageHandle> = fake.clone();
    let selectors = vec!["#a".to_string(), "#b".to_string(), "#c".to_string()];

    let start = Instant::now();
    let (index, _element) = race_show(page, &selectors, POLL, Duration::from_secs(5))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    let shown = Duration::from_millis(200);
    assert_eq!(index, 1);
    assert!(elapsed >= shown, "won too early: {elapsed:?}");
    assert!(elapsed <= shown + POLL, "won too late: {elapsed:?}");
    assert_eq!(fake.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn race_losers_stop_polling_after_a_win() {
    let fake = FakePage::standalone(
        PageSpec::default()
            .visible("#b", Visibility::ShownAt(Duration::from_millis(200)))
            .elements("#b", 1),
    );
    let page: Arc<dyn PageHandle> = fake.clone();
    let selectors = vec!["#a".to_string(), "#b".to_string(), "#c".to_string()];

    let (index, _element) = race_show(page, &selectors, POLL, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(index, 1);

    let probes = fake.probes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fake.probes.load(Ordering::SeqCst), probes);
}

#[tokio::test(start_paused = true)]
async fn race_times_out_and_stops_polling() {
    let fake = FakePage::standalone(PageSpec::default());
    let page: Arc<dyn PageHandle> = fake.clone();
    let selectors = vec!["#a".to_string(), "#b".to_string()];
    let timeout = Duration::from_secs(1);

    let start = Instant::now();
    let err = race_show(page, &selectors, POLL, timeout)
        .await
        .map(|(index, _)| index)
        .unwrap_err();

    assert_eq!(start.elapsed(), timeout);
    assert!(err.is_timeout());
    assert!(err.to_string().contains("race of 2 selectors"));

    let probes = fake.probes.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fake.probes.load(Ordering::SeqCst), probes);
}

#[tokio::test(start_paused = true)]
async fn race_without_selectors_is_rejected() {
    let page: Arc<dyn PageHandle> = FakePage::standalone(PageSpec::default());
    let result = race_show(page, &[], POLL, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(CrawlError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn readiness_runs_selector_wait_then_settle_delay() {
    let page = FakePage::standalone(
        PageSpec::default().visible("#content", Visibility::ShownAt(Duration::from_millis(300))),
    );
    let page_load = PageLoad {
        wait: WaitMode::Show,
        selector: Some("#content".to_string()),
        sleep_seconds: 2,
    };

    let start = Instant::now();
    wait_until_ready(page.as_ref(), &page_load, &CrawlerSettings::default())
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_millis(2300));
}

#[tokio::test(start_paused = true)]
async fn readiness_ignores_selector_for_delay_mode() {
    let page = FakePage::standalone(PageSpec::default());
    let page_load = PageLoad {
        wait: WaitMode::Delay,
        selector: Some("#never".to_string()),
        sleep_seconds: 1,
    };

    let start = Instant::now();
    wait_until_ready(page.as_ref(), &page_load, &CrawlerSettings::default())
        .await
        .unwrap();
    assert_eq!(start.elapsed(), Duration::from_secs(1));
    assert_eq!(page.probes.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn readiness_fails_when_load_never_settles() {
    let page = FakePage::standalone(
        PageSpec::default()
            .visible("#content", Visibility::Always)
            .load_hangs(),
    );
    let settings = CrawlerSettings::builder()
        .page_load_timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let page_load = PageLoad {
        wait: WaitMode::Show,
        selector: Some("#content".to_string()),
        sleep_seconds: 0,
    };

    let start = Instant::now();
    let err = wait_until_ready(page.as_ref(), &page_load, &settings)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    assert_eq!(page.probes.load(Ordering::SeqCst), 0);
}
