// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::{SceneEngine, SceneSnapshot};
use crate::error::LightsError;
use crate::fixture::bar::CHANNEL_COUNT;
use crate::fixture::Fixtures;
use crate::store::Store;
use crate::test_support::FakePublisher;

fn rig() -> anyhow::Result<(Arc<FakePublisher>, Arc<Store>, Fixtures, SceneEngine)> {
    let publisher = FakePublisher::shared();
    let store = Arc::new(Store::open_in_memory()?);
    let fixtures = Fixtures::new(
        Arc::clone(&publisher) as Arc<dyn crate::mqtt::Publisher>,
        Some(Arc::clone(&store)),
    );
    let engine = SceneEngine::new(Arc::clone(&store));
    Ok((publisher, store, fixtures, engine))
}

#[tokio::test]
async fn snapshot_round_trips_through_the_store() -> anyhow::Result<()> {
    let (_, store, fixtures, engine) = rig()?;

    fixtures.strip.set_color(10, 20, 30).await?;
    fixtures.bar.set_rgbw(1, 0, 40, 50, 60, 70).await?;
    fixtures.video[0].turn_on(42).await?;

    engine.save(2, &fixtures).await?;
    assert!(engine.exists(2)?);

    let loaded = store.load_scene(2)?.ok_or_else(|| anyhow::anyhow!("slot empty"))?;
    let mut bar = [0u8; CHANNEL_COUNT];
    bar[0] = 40;
    bar[1] = 50;
    bar[2] = 60;
    bar[3] = 70;
    assert_eq!(
        loaded,
        SceneSnapshot { strip: (10, 20, 30), bar, video: [(true, 42), (false, 0)] }
    );
    Ok(())
}

#[tokio::test]
async fn recall_restores_state_and_publishes_per_changed_fixture() -> anyhow::Result<()> {
    let (publisher, _, fixtures, engine) = rig()?;

    fixtures.strip.set_color(10, 20, 30).await?;
    fixtures.bar.set_rgbw(1, 0, 40, 50, 60, 70).await?;
    fixtures.video[0].turn_on(42).await?;
    engine.save(2, &fixtures).await?;

    fixtures.strip.set_color(0, 0, 0).await?;
    fixtures.bar.turn_off_all().await?;
    fixtures.video[0].turn_off().await?;
    publisher.take();

    assert!(engine.recall(2, &fixtures).await?);

    assert_eq!(fixtures.strip.color().await, (10, 20, 30));
    assert_eq!(fixtures.bar.rgbw(1, 0).await?, (40, 50, 60, 70));
    assert_eq!(fixtures.video[0].state().await, (true, 42));

    // Strip, bar, and the first video light changed; the second was already
    // off and emits nothing.
    let topics: Vec<String> = publisher.messages().into_iter().map(|(t, _)| t).collect();
    assert_eq!(topics.len(), 3);
    assert!(topics.contains(&"kevinoffice/ledstrip/sequence".to_owned()));
    assert!(topics.contains(&"kevinoffice/ledbar/0".to_owned()));
    assert!(topics.contains(&"kevinoffice/videolight/1/command/light:0".to_owned()));
    Ok(())
}

#[tokio::test]
async fn recalling_an_empty_slot_is_silent() -> anyhow::Result<()> {
    let (publisher, _, fixtures, engine) = rig()?;

    assert!(!engine.recall(3, &fixtures).await?);
    assert_eq!(publisher.count(), 0);
    Ok(())
}

#[tokio::test]
async fn delete_empties_the_slot() -> anyhow::Result<()> {
    let (_, store, fixtures, engine) = rig()?;

    fixtures.strip.set_color(1, 1, 1).await?;
    engine.save(0, &fixtures).await?;
    assert!(engine.exists(0)?);

    engine.delete(0)?;
    assert!(!engine.exists(0)?);
    assert!(store.load_scene(0)?.is_none());
    Ok(())
}

#[tokio::test]
async fn overwriting_a_slot_replaces_the_snapshot() -> anyhow::Result<()> {
    let (_, store, fixtures, engine) = rig()?;

    fixtures.strip.set_color(1, 2, 3).await?;
    engine.save(1, &fixtures).await?;

    fixtures.strip.set_color(4, 5, 6).await?;
    fixtures.bar.set_white(2, 12, 90).await?;
    engine.save(1, &fixtures).await?;

    let loaded = store.load_scene(1)?.ok_or_else(|| anyhow::anyhow!("slot empty"))?;
    assert_eq!(loaded.strip, (4, 5, 6));
    assert_eq!(loaded.bar[76], 90);
    Ok(())
}

#[tokio::test]
async fn slot_ids_are_validated() -> anyhow::Result<()> {
    let (_, _, fixtures, engine) = rig()?;

    let err = engine.save(4, &fixtures).await;
    assert!(err.is_err());
    let err = engine.recall(-1, &fixtures).await;
    match err {
        Err(e) => {
            let downcast = e.downcast_ref::<LightsError>();
            assert!(matches!(downcast, Some(LightsError::Index { what: "scene slot", value: -1 })));
        }
        Ok(_) => anyhow::bail!("expected slot validation error"),
    }
    Ok(())
}

#[tokio::test]
async fn recall_continues_past_a_failed_step() -> anyhow::Result<()> {
    let (publisher, _, fixtures, engine) = rig()?;

    fixtures.strip.set_color(10, 0, 0).await?;
    fixtures.video[0].turn_on(15).await?;
    engine.save(0, &fixtures).await?;
    fixtures.strip.set_color(0, 0, 0).await?;
    fixtures.video[0].turn_off().await?;

    // Every publish fails, but recall still applies all in-memory state.
    publisher.set_fail(true);
    assert!(engine.recall(0, &fixtures).await?);
    assert_eq!(fixtures.strip.color().await, (10, 0, 0));
    assert_eq!(fixtures.video[0].state().await, (true, 15));
    Ok(())
}
