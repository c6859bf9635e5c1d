//! Tests for the pagination driver in counted and scroll modes

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use listing_harvest::harvest_engine::{
    CursorMode, IndexTimeouts, PaginationDriver, PaginationMode, scroll_until_stalled,
};
use listing_harvest::{BrowserSession, SessionFactory, WorkerPool};

const TEMPLATE: &str = "https://fake.az/list?page={page}";

fn page_url(page: u32) -> String {
    TEMPLATE.replace("{page}", &page.to_string())
}

fn timeouts() -> IndexTimeouts {
    IndexTimeouts {
        page_load: Duration::from_secs(5),
        settle: Duration::ZERO,
        scroll_settle: Duration::ZERO,
    }
}

fn driver(web: &FakeWeb, mode: PaginationMode) -> PaginationDriver {
    PaginationDriver::new(
        mode,
        Arc::new(test_profile()),
        web.factory(),
        Arc::new(WorkerPool::new(2).unwrap()),
        timeouts(),
    )
}

#[tokio::test]
async fn test_failed_index_page_is_skipped() {
    let web = FakeWeb::new()
        .page(page_url(1), FakePage::new(index_html(&["1", "2"])))
        .page(page_url(2), FakePage::failing())
        .page(page_url(3), FakePage::new(index_html(&["5"])));
    let mut driver = driver(&web, PaginationMode::counted(TEMPLATE, 1, 3));

    let first = driver.next_batch().await.unwrap();
    assert_eq!(first.page, 1);
    assert_eq!(first.references.len(), 2);
    assert_eq!(first.references[0].detail_url(), item_url("1"));

    let second = driver.next_batch().await.unwrap();
    assert_eq!(second.page, 3);
    assert_eq!(second.references[0].listing_id(), "5");
    assert_eq!(second.references[0].source_page(), 3);

    assert!(driver.next_batch().await.is_none());
    assert!(driver.cursor().is_exhausted());
    assert_eq!(driver.pages_failed(), 1);
    assert_eq!(driver.cursor().seen_count(), 3);
    assert_eq!(web.closed(), web.opened());
}

#[tokio::test]
async fn test_walk_ending_at_u32_max_stops_after_last_page() {
    let web = FakeWeb::new()
        .page(page_url(u32::MAX - 1), FakePage::failing())
        .page(page_url(u32::MAX), FakePage::new(index_html(&["9"])));
    let mut driver = driver(&web, PaginationMode::counted(TEMPLATE, u32::MAX - 1, u32::MAX));

    let batch = driver.next_batch().await.unwrap();
    assert_eq!(batch.page, u32::MAX);
    assert_eq!(batch.references[0].listing_id(), "9");

    assert!(driver.next_batch().await.is_none());
    assert!(driver.next_batch().await.is_none());
    assert!(driver.cursor().is_exhausted());
    assert_eq!(driver.pages_failed(), 1);
}

#[tokio::test]
async fn test_reset_rewinds_cursor() {
    let web = FakeWeb::new().page(page_url(1), FakePage::new(index_html(&["1"])));
    let mut driver = driver(&web, PaginationMode::counted(TEMPLATE, 1, 1));

    assert!(driver.next_batch().await.is_some());
    assert!(driver.next_batch().await.is_none());

    driver.reset();
    assert_eq!(driver.cursor().current_page(), 1);
    assert_eq!(driver.next_batch().await.unwrap().page, 1);
}

#[tokio::test]
async fn test_duplicate_hrefs_on_page_are_collapsed() {
    let web = FakeWeb::new().page(page_url(1), FakePage::new(index_html(&["1", "2", "1", "2", "3"])));
    let mut driver = driver(&web, PaginationMode::counted(TEMPLATE, 1, 1));

    let batch = driver.next_batch().await.unwrap();
    let ids: Vec<_> = batch.references.iter().map(|r| r.listing_id().to_string()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

/// Frames that grow by two listings per scroll for `growth` scrolls, then stop
fn growing_frames(growth: usize) -> Vec<String> {
    (0..=growth)
        .map(|frame| {
            let ids: Vec<String> = (1..=(frame + 1) * 2).map(|i| i.to_string()).collect();
            let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
            index_html(&refs)
        })
        .collect()
}

#[test]
fn test_scroll_stops_after_stall_limit_without_growth() {
    let index = "https://fake.az/feed";
    let web = FakeWeb::new().page(index, FakePage::scrolling(growing_frames(2)));
    let profile = test_profile();

    let mut session = web.open().unwrap();
    session.navigate(index, Duration::from_secs(1)).unwrap();
    let outcome = scroll_until_stalled(&mut *session, &profile, None, 3, Duration::ZERO).unwrap();
    session.close().unwrap();

    // two growing scrolls, then three without growth
    assert_eq!(outcome.iterations, 5);
    assert_eq!(outcome.references.len(), 6);
}

#[test]
fn test_scroll_stops_at_target_and_truncates() {
    let index = "https://fake.az/feed";
    let web = FakeWeb::new().page(index, FakePage::scrolling(growing_frames(5)));
    let profile = test_profile();

    let mut session = web.open().unwrap();
    session.navigate(index, Duration::from_secs(1)).unwrap();
    let outcome =
        scroll_until_stalled(&mut *session, &profile, Some(3), 3, Duration::ZERO).unwrap();

    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.references.len(), 3);
    let ids: Vec<_> = outcome.references.iter().map(|r| r.listing_id()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn test_scroll_mode_yields_single_batch() {
    let index = "https://fake.az/feed";
    let web = FakeWeb::new().page(index, FakePage::scrolling(growing_frames(1)));
    let mut driver = driver(&web, PaginationMode::scroll(index, Some(100), 2));
    assert_eq!(driver.cursor().mode(), CursorMode::Scroll);

    let batch = driver.next_batch().await.unwrap();
    assert_eq!(batch.page, 1);
    assert_eq!(batch.references.len(), 4);
    assert!(driver.next_batch().await.is_none());
    assert_eq!(web.in_flight(), 0);
}

#[tokio::test]
async fn test_scroll_index_failure_yields_nothing() {
    let index = "https://fake.az/feed";
    let web = FakeWeb::new().page(index, FakePage::failing());
    let mut driver = driver(&web, PaginationMode::scroll(index, None, 3));

    assert!(driver.next_batch().await.is_none());
    assert_eq!(driver.pages_failed(), 1);
}
