//! End-to-end scenarios for the embedded search widget.
//!
//! Each test loads the host page, drives the widget through its page object
//! and observes the protocol only through a scenario's message capture.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use frameprobe::prelude::*;
use frameprobe::{ResultClick, SearchMetrics, DEFAULT_TRUSTED_ORIGIN};
use serde_json::json;
use std::time::Duration;

const WIDGET_LATENCY: Duration = Duration::from_millis(25);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("frameprobe=debug")),
        )
        .with_test_writer()
        .try_init();
}

struct Harness {
    boundary: MessageBoundary,
    config: HarnessConfig,
    host: HostPage,
    widget: WidgetPage,
}

impl Harness {
    async fn start() -> Self {
        init_tracing();
        let config = HarnessConfig::new()
            .with_default_timeout(2_000)
            .with_poll_interval(10);
        let boundary = MessageBoundary::new();
        let mut host = HostPage::new(boundary.clone(), &config).with_widget_latency(WIDGET_LATENCY);
        host.goto().await.unwrap();
        let widget = host.widget().unwrap();
        Self {
            boundary,
            config,
            host,
            widget,
        }
    }

    fn scenario(&self, name: &str) -> Scenario {
        Scenario::new(name, self.boundary.clone(), &self.config)
    }
}

// ============================================================================
// Page structure
// ============================================================================

#[tokio::test]
async fn host_page_embeds_widget_frame() {
    let h = Harness::start().await;
    h.host.verify_host_page_loaded().unwrap();
    h.host.verify_iframe_source().unwrap();
    h.widget.verify_widget_loaded().unwrap();
}

#[tokio::test]
async fn event_log_waits_for_messages_after_load() {
    let h = Harness::start().await;
    h.widget.verify_widget_loaded().unwrap();
    h.host.verify_event_log_visible().unwrap();
}

#[tokio::test]
async fn valid_search_displays_results() {
    let h = Harness::start().await;
    h.widget.search("playwright").unwrap();
    h.widget.wait_for_results().await.unwrap();
    h.widget
        .verify_results_displayed("Playwright Testing Framework")
        .unwrap();
    assert!(!h.widget.no_results_message_visible());
}

#[tokio::test]
async fn invalid_search_displays_no_results_message() {
    let h = Harness::start().await;
    h.widget.search("xyz").unwrap();
    h.widget.verify_no_results_message().unwrap();
    h.widget.verify_no_result_items().unwrap();
}

// ============================================================================
// Protocol messages
// ============================================================================

#[tokio::test]
async fn valid_search_sends_search_metrics() {
    let h = Harness::start().await;
    let mut scenario = h.scenario("valid search metrics");
    scenario.arm();

    h.widget.search("playwright").unwrap();
    scenario.wait_for_kind(SEARCH_METRICS, None).await.unwrap();

    let message = scenario.first_of_kind(SEARCH_METRICS).unwrap();
    assert!(message.matches(&json!({
        "type": "searchMetrics",
        "totalResults": 1,
        "query": "playwright"
    })));
    let metrics: SearchMetrics = message.decode().unwrap();
    assert_eq!(metrics.total_results, 1);

    h.host.verify_event_log_contains("searchMetrics").await.unwrap();
    let summary = scenario.finish();
    assert_eq!(summary.messages.len(), 1);
}

#[tokio::test]
async fn invalid_search_sends_zero_result_metrics() {
    let h = Harness::start().await;
    let mut scenario = h.scenario("zero result metrics");
    scenario.arm();

    h.widget.search("xyz").unwrap();
    let message = scenario
        .wait_for_kind(SEARCH_METRICS, Some(5_000))
        .await
        .unwrap();
    assert!(message.matches(&json!({
        "type": "searchMetrics",
        "totalResults": 0,
        "query": "xyz"
    })));
}

#[tokio::test]
async fn clicking_result_sends_result_click() {
    let h = Harness::start().await;
    h.widget.search("playwright").unwrap();
    h.widget
        .verify_results_displayed("Playwright Testing Framework")
        .unwrap();

    let mut scenario = h.scenario("result click");
    scenario.arm();
    h.widget.click_first_result().unwrap();
    scenario
        .expect_message(RESULT_CLICK, &json!({"type": "resultClick", "id": 1}), None)
        .await
        .unwrap();

    let click: ResultClick = scenario.first_of_kind(RESULT_CLICK).unwrap().decode().unwrap();
    assert_eq!(click.id, 1);
    h.host.verify_event_log_contains("resultClick").await.unwrap();
}

#[tokio::test]
async fn enter_key_triggers_result_click() {
    let h = Harness::start().await;
    h.widget.search("playwright").unwrap();
    h.widget
        .verify_results_displayed("Playwright Testing Framework")
        .unwrap();

    let mut scenario = h.scenario("keyboard activation");
    scenario.arm();
    h.widget.focus_first_result().unwrap();
    h.widget.press_enter_on_first_result().unwrap();
    let message = scenario.wait_for_kind(RESULT_CLICK, None).await.unwrap();
    assert!(message.matches(&json!({"type": "resultClick", "id": 1})));
}

#[tokio::test]
async fn untrusted_origin_is_never_captured() {
    let h = Harness::start().await;
    let mut scenario = h.scenario("untrusted origin");
    scenario.arm();

    h.boundary.post(
        "http://evil.example",
        json!({"type": "searchMetrics", "query": "playwright", "totalResults": 99}),
    );
    assert!(scenario.first_of_kind(SEARCH_METRICS).is_none());
    let err = scenario
        .wait_for_kind(SEARCH_METRICS, Some(100))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(h.host.event_log().unwrap().message_count(), 0);
}

#[tokio::test]
async fn arming_after_search_misses_earlier_metrics() {
    let h = Harness::start().await;
    h.widget.search("playwright").unwrap();
    h.host.verify_event_log_contains("searchMetrics").await.unwrap();

    let mut scenario = h.scenario("late arm");
    scenario.arm();
    assert!(scenario.all().is_empty());
    h.widget.click_first_result().unwrap();
    scenario.wait_for_kind(RESULT_CLICK, None).await.unwrap();
    let kinds: Vec<_> = scenario.all().into_iter().map(|m| m.kind).collect();
    assert_eq!(kinds, vec![RESULT_CLICK]);
}

#[tokio::test]
async fn rearm_between_steps_isolates_history() {
    let h = Harness::start().await;
    let mut scenario = h.scenario("rearm");
    scenario.arm();
    h.widget.search("playwright").unwrap();
    scenario.wait_for_kind(SEARCH_METRICS, None).await.unwrap();

    scenario.arm();
    assert!(scenario.first_of_kind(SEARCH_METRICS).is_none());
    h.widget.press_enter_on_first_result().unwrap();
    scenario.wait_for_kind(RESULT_CLICK, None).await.unwrap();
    assert_eq!(scenario.all().len(), 1);
    assert_eq!(scenario.finish().arm_count, 2);
}

#[tokio::test]
async fn messages_arrive_in_receipt_order() {
    let h = Harness::start().await;
    let mut scenario = h.scenario("ordering");
    scenario.arm();

    h.widget.search("testing").unwrap();
    scenario.wait_for_kind(SEARCH_METRICS, None).await.unwrap();
    h.widget.click_first_result().unwrap();
    scenario.wait_for_kind(RESULT_CLICK, None).await.unwrap();
    h.widget.search("selenium").unwrap();
    tokio::time::sleep(WIDGET_LATENCY * 4).await;

    let all = scenario.all();
    let kinds: Vec<_> = all.iter().map(|m| m.kind.as_str()).collect();
    assert_eq!(kinds, vec![SEARCH_METRICS, RESULT_CLICK, SEARCH_METRICS]);
    assert_eq!(scenario.first_of_kind(SEARCH_METRICS).unwrap().sequence, 0);
    assert_eq!(all[2].field("query"), Some(&json!("selenium")));
}

#[tokio::test]
async fn detached_waiter_is_cancelled_when_scenario_finishes() {
    let h = Harness::start().await;
    let mut scenario = h.scenario("cancellation");
    scenario.arm();
    let waiter = scenario.waiter().unwrap();
    let pending = tokio::spawn(async move { waiter.wait_for_kind(RESULT_CLICK, Some(5_000)).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    scenario.finish();
    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, ProbeError::Cancelled { .. }));
}

#[tokio::test]
async fn config_origin_drives_widget_and_filter() {
    init_tracing();
    let config = HarnessConfig::new()
        .with_trusted_origin("https://widget.example")
        .with_default_timeout(1_000);
    let boundary = MessageBoundary::new();
    let mut host = HostPage::new(boundary.clone(), &config);
    host.goto().await.unwrap();

    let mut scenario = Scenario::new("custom origin", boundary.clone(), &config);
    scenario.arm();
    boundary.post(DEFAULT_TRUSTED_ORIGIN, json!({"type": "searchMetrics"}));
    host.widget().unwrap().search("cypress").unwrap();
    let message = scenario.wait_for_kind(SEARCH_METRICS, None).await.unwrap();
    assert_eq!(message.field("query"), Some(&json!("cypress")));
    assert_eq!(scenario.all().len(), 1);
}
