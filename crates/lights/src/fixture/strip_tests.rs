// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::{Preset, Strip, STRIP_ID, STRIP_TOPIC};
use crate::error::LightsError;
use crate::store::Store;
use crate::test_support::FakePublisher;

fn strip(publisher: Arc<FakePublisher>) -> Strip {
    Strip::new(publisher, None, (0, 0, 0))
}

#[tokio::test]
async fn set_color_publishes_exact_fill_message() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));

    strip.set_color(255, 200, 150).await?;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    let (topic, payload) = &messages[0];
    assert_eq!(topic, STRIP_TOPIC);
    assert_eq!(payload, r#"{"sequence":"fill","data":{"r":255,"g":200,"b":150}}"#);

    // And the payload parses back to the same integers.
    let value: serde_json::Value = serde_json::from_str(payload)?;
    assert_eq!(value["sequence"], "fill");
    assert_eq!(value["data"]["r"], 255);
    assert_eq!(value["data"]["g"], 200);
    assert_eq!(value["data"]["b"], 150);
    Ok(())
}

#[tokio::test]
async fn out_of_range_color_is_rejected_without_publish() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));
    strip.set_color(10, 20, 30).await?;
    publisher.take();

    let too_big = strip.set_color(256, 0, 0).await;
    let negative = strip.set_color(-1, 0, 0).await;

    assert!(matches!(too_big, Err(LightsError::Range { what: "r", value: 256, .. })));
    assert!(matches!(negative, Err(LightsError::Range { what: "r", value: -1, .. })));
    assert_eq!(strip.color().await, (10, 20, 30));
    assert_eq!(publisher.count(), 0);
    Ok(())
}

#[tokio::test]
async fn publish_twice_is_byte_identical() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));
    strip.set_color(1, 2, 3).await?;
    publisher.take();

    strip.publish().await?;
    strip.publish().await?;

    let messages = publisher.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], messages[1]);
    Ok(())
}

#[tokio::test]
async fn unchanged_color_emits_nothing() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));
    strip.set_color(40, 50, 60).await?;
    publisher.take();

    strip.set_color(40, 50, 60).await?;
    assert_eq!(publisher.count(), 0);
    Ok(())
}

#[tokio::test]
async fn brightness_rescales_with_truncation() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));
    strip.set_color(255, 100, 3).await?;

    strip.set_brightness(50).await?;
    assert_eq!(strip.color().await, (127, 50, 1));

    strip.set_brightness(0).await?;
    assert_eq!(strip.color().await, (0, 0, 0));
    Ok(())
}

#[tokio::test]
async fn brightness_out_of_range_is_rejected() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));
    strip.set_color(9, 9, 9).await?;
    publisher.take();

    let err = strip.set_brightness(101).await;
    assert!(matches!(err, Err(LightsError::Range { what: "brightness", value: 101, .. })));
    assert_eq!(strip.color().await, (9, 9, 9));
    assert_eq!(publisher.count(), 0);
    Ok(())
}

#[tokio::test]
async fn presets_set_fixed_tuples() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));

    strip.preset(Preset::Magenta).await?;
    assert_eq!(strip.color().await, (255, 0, 255));

    strip.preset(Preset::Yellow).await?;
    assert_eq!(strip.color().await, (255, 255, 0));
    Ok(())
}

#[tokio::test]
async fn batch_mutation_publishes_once() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let strip = strip(Arc::clone(&publisher));

    strip.set_color_no_publish(7, 8, 9).await?;
    assert_eq!(publisher.count(), 0);

    strip.publish().await?;
    let messages = publisher.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, r#"{"sequence":"fill","data":{"r":7,"g":8,"b":9}}"#);
    Ok(())
}

#[tokio::test]
async fn publish_failure_keeps_memory_skips_store() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let store = Arc::new(Store::open_in_memory()?);
    let strip = Strip::new(
        Arc::clone(&publisher) as Arc<dyn crate::mqtt::Publisher>,
        Some(Arc::clone(&store)),
        (0, 0, 0),
    );

    publisher.set_fail(true);
    let err = strip.set_color(1, 2, 3).await;
    assert!(matches!(err, Err(LightsError::Transport(_))));

    // Memory is already updated; the store was not written.
    assert_eq!(strip.color().await, (1, 2, 3));
    assert_eq!(store.load_strip(STRIP_ID)?, (0, 0, 0));

    // Retrying the identical mutation after the failure is not suppressed.
    publisher.set_fail(false);
    strip.set_color(1, 2, 3).await?;
    assert_eq!(publisher.count(), 1);
    assert_eq!(store.load_strip(STRIP_ID)?, (1, 2, 3));
    Ok(())
}

#[tokio::test]
async fn successful_mutation_persists() -> anyhow::Result<()> {
    let publisher = FakePublisher::shared();
    let store = Arc::new(Store::open_in_memory()?);
    let strip = Strip::new(publisher, Some(Arc::clone(&store)), (0, 0, 0));

    strip.set_color(11, 22, 33).await?;
    assert_eq!(store.load_strip(STRIP_ID)?, (11, 22, 33));
    Ok(())
}
