// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Video light driver.
//!
//! Two fixtures with surface identities 1 and 2; the store uses ids 0 and 1.
//! The `surface_id - 1` mapping lives entirely inside this driver.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use super::BRIGHTNESS_MAX;
use crate::error::{check_range, LightsError};
use crate::mqtt::SharedPublisher;
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VideoLightState {
    on: bool,
    brightness: u8,
}

/// `dirty` is set when the broker rejected the last emit, so a retry of the
/// same mutation is not suppressed as a no-op.
struct VideoLightShared {
    state: VideoLightState,
    dirty: bool,
}

/// Driver for one video light. Holds `(on, brightness)`; an off light
/// remembers its last brightness.
///
/// A mutation that leaves the state unchanged emits nothing; only the
/// explicit [`VideoLight::publish`] re-emits unconditionally.
pub struct VideoLight {
    publisher: SharedPublisher,
    store: Option<Arc<Store>>,
    surface_id: u8,
    topic: String,
    shared: Mutex<VideoLightShared>,
}

impl VideoLight {
    pub fn new(
        publisher: SharedPublisher,
        store: Option<Arc<Store>>,
        surface_id: u8,
        on: bool,
        brightness: u8,
    ) -> Self {
        Self {
            publisher,
            store,
            surface_id,
            topic: format!("kevinoffice/videolight/{surface_id}/command/light:0"),
            shared: Mutex::new(VideoLightShared {
                state: VideoLightState { on, brightness },
                dirty: false,
            }),
        }
    }

    pub fn surface_id(&self) -> u8 {
        self.surface_id
    }

    pub async fn state(&self) -> (bool, u8) {
        let shared = self.shared.lock().await;
        (shared.state.on, shared.state.brightness)
    }

    /// Set both fields. `set_state(false, b > 0)` is legal and persists `b`;
    /// only [`VideoLight::turn_off`] resets brightness to zero.
    pub async fn set_state(&self, on: bool, brightness: i32) -> Result<(), LightsError> {
        let brightness = check_range("brightness", brightness, BRIGHTNESS_MAX)?;
        self.commit(VideoLightState { on, brightness }).await
    }

    pub async fn turn_on(&self, brightness: i32) -> Result<(), LightsError> {
        self.set_state(true, brightness).await
    }

    pub async fn turn_off(&self) -> Result<(), LightsError> {
        self.set_state(false, 0).await
    }

    /// Adjust brightness, keeping the current on/off state.
    pub async fn set_brightness(&self, brightness: i32) -> Result<(), LightsError> {
        let brightness = check_range("brightness", brightness, BRIGHTNESS_MAX)?;
        let mut shared = self.shared.lock().await;
        let next = VideoLightState { on: shared.state.on, brightness };
        if !shared.dirty && shared.state == next {
            return Ok(());
        }
        shared.state = next;
        self.emit_and_persist(&mut shared).await
    }

    /// Batch variant: update state without publishing or persisting. Must be
    /// followed by exactly one [`VideoLight::publish`].
    pub async fn set_state_no_publish(&self, on: bool, brightness: i32) -> Result<(), LightsError> {
        let brightness = check_range("brightness", brightness, BRIGHTNESS_MAX)?;
        let mut shared = self.shared.lock().await;
        shared.state = VideoLightState { on, brightness };
        Ok(())
    }

    /// Re-emit the current state.
    pub async fn publish(&self) -> Result<(), LightsError> {
        let mut shared = self.shared.lock().await;
        self.emit_and_persist(&mut shared).await
    }

    async fn commit(&self, next: VideoLightState) -> Result<(), LightsError> {
        let mut shared = self.shared.lock().await;
        if !shared.dirty && shared.state == next {
            return Ok(());
        }
        shared.state = next;
        self.emit_and_persist(&mut shared).await
    }

    async fn emit_and_persist(&self, shared: &mut VideoLightShared) -> Result<(), LightsError> {
        let payload = format!("set,{},{}", shared.state.on, shared.state.brightness).into_bytes();
        if let Err(e) = self.publisher.publish(&self.topic, payload).await {
            shared.dirty = true;
            return Err(e);
        }
        shared.dirty = false;
        if let Some(store) = &self.store {
            let storage_id = i64::from(self.surface_id) - 1;
            if let Err(e) = store.save_video_light(storage_id, shared.state.on, shared.state.brightness)
            {
                warn!(fixture = "videolight", id = self.surface_id, err = %e, "state persist failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "videolight_tests.rs"]
mod tests;
