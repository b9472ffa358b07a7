// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the HTTP surface.
//!
//! Uses `axum_test::TestServer` — no real TCP needed.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;

use lights::fixture::bar::BAR_TOPIC;
use lights::fixture::strip::STRIP_TOPIC;
use lights::fixture::Fixtures;
use lights::store::Store;
use lights::surface::web::{build_router, Aggregate, WebState};
use lights::test_support::FakePublisher;

struct Rig {
    publisher: Arc<FakePublisher>,
    store: Arc<Store>,
    fixtures: Arc<Fixtures>,
    server: TestServer,
}

fn rig() -> anyhow::Result<Rig> {
    let publisher = FakePublisher::shared();
    let store = Arc::new(Store::open_in_memory()?);
    store.seed_defaults()?;
    let fixtures = Arc::new(Fixtures::new(
        Arc::clone(&publisher) as Arc<dyn lights::mqtt::Publisher>,
        Some(Arc::clone(&store)),
    ));
    let state = Arc::new(WebState::new(Arc::clone(&fixtures)));
    let server = TestServer::new(build_router(state))
        .map_err(|e| anyhow::anyhow!("test server: {e}"))?;
    Ok(Rig { publisher, store, fixtures, server })
}

#[tokio::test]
async fn health_reports_ok() -> anyhow::Result<()> {
    let rig = rig()?;
    let resp = rig.server.get("/health").await;
    resp.assert_status(StatusCode::OK);
    assert_eq!(resp.json::<serde_json::Value>()["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn index_and_static_assets_are_served() -> anyhow::Result<()> {
    let rig = rig()?;

    let resp = rig.server.get("/").await;
    resp.assert_status(StatusCode::OK);
    assert!(resp.text().contains("Office Lights"));

    rig.server.get("/static/app.js").await.assert_status(StatusCode::OK);
    rig.server.get("/static/style.css").await.assert_status(StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn get_api_returns_canonical_aggregate_shape() -> anyhow::Result<()> {
    let rig = rig()?;
    rig.fixtures.strip.set_color(255, 200, 150).await?;
    rig.fixtures.video[0].turn_on(75).await?;

    let resp = rig.server.get("/api").await;
    resp.assert_status(StatusCode::OK);
    let value = resp.json::<serde_json::Value>();
    assert_eq!(value["ledStrip"]["r"], 255);
    assert_eq!(value["ledBar"]["section1"]["rgbw"].as_array().map(Vec::len), Some(6));
    assert_eq!(value["ledBar"]["section2"]["white"].as_array().map(Vec::len), Some(13));
    assert_eq!(value["videoLight1"]["on"], true);
    assert_eq!(value["videoLight1"]["brightness"], 75);
    Ok(())
}

#[tokio::test]
async fn post_differing_only_in_bar_fields_publishes_one_bar_message() -> anyhow::Result<()> {
    let rig = rig()?;

    let mut aggregate = rig.server.get("/api").await.json::<Aggregate>();
    for rgbw in aggregate
        .led_bar
        .section1
        .rgbw
        .iter_mut()
        .chain(aggregate.led_bar.section2.rgbw.iter_mut())
    {
        rgbw.r = 40;
        rgbw.g = 50;
        rgbw.b = 60;
        rgbw.w = 70;
    }

    let resp = rig.server.post("/api").json(&aggregate).await;
    resp.assert_status(StatusCode::OK);

    let messages = rig.publisher.messages();
    assert_eq!(messages.len(), 1, "{messages:?}");
    assert_eq!(messages[0].0, BAR_TOPIC);
    let tokens: Vec<&str> = messages[0].1.split(',').collect();
    assert_eq!(tokens.len(), 77);
    assert_eq!(&tokens[0..4], &["40", "50", "60", "70"]);

    // The response reflects the applied state.
    let updated = resp.json::<Aggregate>();
    assert_eq!(updated.led_bar.section2.rgbw[5].w, 70);
    Ok(())
}

#[tokio::test]
async fn post_changing_everything_publishes_each_fixture_once() -> anyhow::Result<()> {
    let rig = rig()?;

    let mut aggregate = rig.server.get("/api").await.json::<Aggregate>();
    aggregate.led_strip.r = 10;
    aggregate.led_bar.section1.white[0] = 99;
    aggregate.video_light1.on = true;
    aggregate.video_light1.brightness = 42;

    let resp = rig.server.post("/api").json(&aggregate).await;
    resp.assert_status(StatusCode::OK);

    let topics: Vec<String> = rig.publisher.messages().into_iter().map(|(t, _)| t).collect();
    assert_eq!(topics.len(), 3, "{topics:?}");
    assert!(topics.contains(&STRIP_TOPIC.to_owned()));
    assert!(topics.contains(&BAR_TOPIC.to_owned()));
    assert!(topics.contains(&"kevinoffice/videolight/1/command/light:0".to_owned()));
    Ok(())
}

#[tokio::test]
async fn out_of_range_post_is_rejected_without_side_effects() -> anyhow::Result<()> {
    let rig = rig()?;
    rig.fixtures.strip.set_color(1, 2, 3).await?;
    rig.publisher.take();

    let mut aggregate = rig.server.get("/api").await.json::<Aggregate>();
    aggregate.led_strip.r = 300;

    let resp = rig.server.post("/api").json(&aggregate).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body = resp.json::<serde_json::Value>();
    assert!(body["error"].as_str().is_some_and(|e| e.contains("ledStrip.r")));

    assert_eq!(rig.publisher.count(), 0);
    assert_eq!(rig.fixtures.strip.color().await, (1, 2, 3));
    assert_eq!(rig.store.load_strip(0)?, (1, 2, 3));
    Ok(())
}

#[tokio::test]
async fn wrong_bar_lengths_are_rejected() -> anyhow::Result<()> {
    let rig = rig()?;

    let mut aggregate = rig.server.get("/api").await.json::<Aggregate>();
    aggregate.led_bar.section1.white.pop();

    let resp = rig.server.post("/api").json(&aggregate).await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(rig.publisher.count(), 0);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() -> anyhow::Result<()> {
    let rig = rig()?;

    let resp = rig
        .server
        .post("/api")
        .content_type("application/json")
        .text("{\"ledStrip\":")
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert!(resp.json::<serde_json::Value>().get("error").is_some());
    Ok(())
}

#[tokio::test]
async fn transport_failure_maps_to_internal_error() -> anyhow::Result<()> {
    let rig = rig()?;

    let mut aggregate = rig.server.get("/api").await.json::<Aggregate>();
    aggregate.led_strip.g = 128;

    rig.publisher.set_fail(true);
    let resp = rig.server.post("/api").json(&aggregate).await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.json::<serde_json::Value>().get("error").is_some());
    Ok(())
}

#[tokio::test]
async fn concurrent_posts_never_interleave_bar_updates() -> anyhow::Result<()> {
    let rig = rig()?;

    let base = rig.server.get("/api").await.json::<Aggregate>();
    let mut first = base.clone();
    let mut second = base;
    for rgbw in first.led_bar.section1.rgbw.iter_mut() {
        rgbw.r = 10;
        rgbw.g = 20;
        rgbw.b = 30;
        rgbw.w = 40;
    }
    for rgbw in second.led_bar.section1.rgbw.iter_mut() {
        rgbw.r = 50;
        rgbw.g = 60;
        rgbw.b = 70;
        rgbw.w = 80;
    }

    let (a, b) = tokio::join!(
        rig.server.post("/api").json(&first),
        rig.server.post("/api").json(&second)
    );
    a.assert_status(StatusCode::OK);
    b.assert_status(StatusCode::OK);

    // Each bar message is consistent with exactly one of the two POSTs:
    // section 1's six RGBW LEDs are uniform within every message.
    let bar_messages: Vec<String> = rig
        .publisher
        .messages()
        .into_iter()
        .filter(|(topic, _)| topic == BAR_TOPIC)
        .map(|(_, payload)| payload)
        .collect();
    assert_eq!(bar_messages.len(), 2);
    for payload in bar_messages {
        let values: Vec<i32> = payload.split(',').filter_map(|t| t.parse().ok()).collect();
        let first_led = &values[0..4];
        for led in 1..6 {
            assert_eq!(&values[led * 4..led * 4 + 4], first_led, "{payload}");
        }
        assert!(first_led == [10, 20, 30, 40] || first_led == [50, 60, 70, 80]);
    }
    Ok(())
}
