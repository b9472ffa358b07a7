// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scene engine: capture and recall full multi-fixture snapshots.
//!
//! Saving is transactional (one store transaction per slot write). Recall is
//! best effort: a failed step is logged and the remaining fixtures are still
//! applied; the store is never mutated by a recall.

use std::sync::Arc;

use tracing::warn;

use crate::error::LightsError;
use crate::fixture::bar::CHANNEL_COUNT;
use crate::fixture::Fixtures;
use crate::store::scene::SCENE_SLOTS;
use crate::store::Store;

/// Full aggregate snapshot: strip triple, 77 bar channels, two video lights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSnapshot {
    pub strip: (u8, u8, u8),
    pub bar: [u8; CHANNEL_COUNT],
    pub video: [(bool, u8); 2],
}

/// Capture/recall engine over the four fixed scene slots.
pub struct SceneEngine {
    store: Arc<Store>,
}

impl SceneEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn check_slot(id: i64) -> Result<(), LightsError> {
        if !(0..SCENE_SLOTS).contains(&id) {
            return Err(LightsError::Index { what: "scene slot", value: id as i32 });
        }
        Ok(())
    }

    /// Read every driver's state into a snapshot.
    pub async fn capture(&self, fixtures: &Fixtures) -> SceneSnapshot {
        SceneSnapshot {
            strip: fixtures.strip.color().await,
            bar: fixtures.bar.channels().await,
            video: [fixtures.video[0].state().await, fixtures.video[1].state().await],
        }
    }

    /// Capture the current aggregate into `slot`, overwriting any previous
    /// snapshot there.
    pub async fn save(&self, slot: i64, fixtures: &Fixtures) -> anyhow::Result<()> {
        Self::check_slot(slot)?;
        let snapshot = self.capture(fixtures).await;
        self.store.save_scene(slot, &snapshot)
    }

    pub fn exists(&self, slot: i64) -> anyhow::Result<bool> {
        Self::check_slot(slot)?;
        self.store.scene_exists(slot)
    }

    pub fn delete(&self, slot: i64) -> anyhow::Result<()> {
        Self::check_slot(slot)?;
        self.store.delete_scene(slot)
    }

    /// Apply the slot's snapshot through the public driver mutators: strip,
    /// then bar (one publish via the full sequence), then each video light.
    ///
    /// Returns `Ok(false)` for an empty slot; no message is emitted then.
    pub async fn recall(&self, slot: i64, fixtures: &Fixtures) -> anyhow::Result<bool> {
        Self::check_slot(slot)?;
        let Some(snapshot) = self.store.load_scene(slot)? else {
            return Ok(false);
        };

        let (r, g, b) = snapshot.strip;
        if let Err(e) = fixtures.strip.set_color(r.into(), g.into(), b.into()).await {
            warn!(slot, fixture = "ledstrip", err = %e, "scene recall step failed");
        }

        let channels: Vec<i32> = snapshot.bar.iter().map(|v| i32::from(*v)).collect();
        if let Err(e) = fixtures.bar.set_channels(&channels).await {
            warn!(slot, fixture = "ledbar", err = %e, "scene recall step failed");
        }

        for (light, (on, brightness)) in fixtures.video.iter().zip(snapshot.video) {
            if let Err(e) = light.set_state(on, brightness.into()).await {
                warn!(slot, fixture = "videolight", id = light.surface_id(), err = %e,
                    "scene recall step failed");
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
