// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! RGB LED strip driver.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use super::CHANNEL_MAX;
use crate::error::{check_range, LightsError};
use crate::mqtt::SharedPublisher;
use crate::store::Store;

/// MQTT topic for strip sequences.
pub const STRIP_TOPIC: &str = "kevinoffice/ledstrip/sequence";

/// Storage identity of the single strip.
pub const STRIP_ID: i64 = 0;

/// Fixed colour presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Red,
    Green,
    Blue,
    White,
    Yellow,
    Cyan,
    Magenta,
}

impl Preset {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Self::Red => (255, 0, 0),
            Self::Green => (0, 255, 0),
            Self::Blue => (0, 0, 255),
            Self::White => (255, 255, 255),
            Self::Yellow => (255, 255, 0),
            Self::Cyan => (0, 255, 255),
            Self::Magenta => (255, 0, 255),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StripState {
    r: u8,
    g: u8,
    b: u8,
}

/// `dirty` is set when the broker rejected the last emit, so a retry of the
/// same mutation is not suppressed as a no-op.
struct StripShared {
    state: StripState,
    dirty: bool,
}

/// Driver for the RGB strip. Holds `(r, g, b)` and encodes one JSON fill
/// message per publish.
///
/// A mutation that leaves the state unchanged emits nothing; only the
/// explicit [`Strip::publish`] re-emits unconditionally.
pub struct Strip {
    publisher: SharedPublisher,
    store: Option<Arc<Store>>,
    shared: Mutex<StripShared>,
}

impl Strip {
    pub fn new(
        publisher: SharedPublisher,
        store: Option<Arc<Store>>,
        (r, g, b): (u8, u8, u8),
    ) -> Self {
        Self {
            publisher,
            store,
            shared: Mutex::new(StripShared { state: StripState { r, g, b }, dirty: false }),
        }
    }

    pub async fn color(&self) -> (u8, u8, u8) {
        let shared = self.shared.lock().await;
        (shared.state.r, shared.state.g, shared.state.b)
    }

    /// Set the colour and emit one fill message.
    pub async fn set_color(&self, r: i32, g: i32, b: i32) -> Result<(), LightsError> {
        let r = check_range("r", r, CHANNEL_MAX)?;
        let g = check_range("g", g, CHANNEL_MAX)?;
        let b = check_range("b", b, CHANNEL_MAX)?;
        self.commit(StripState { r, g, b }).await
    }

    /// Batch variant: update state without publishing or persisting. Must be
    /// followed by exactly one [`Strip::publish`] under the same surface lock.
    pub async fn set_color_no_publish(&self, r: i32, g: i32, b: i32) -> Result<(), LightsError> {
        let r = check_range("r", r, CHANNEL_MAX)?;
        let g = check_range("g", g, CHANNEL_MAX)?;
        let b = check_range("b", b, CHANNEL_MAX)?;
        let mut shared = self.shared.lock().await;
        shared.state = StripState { r, g, b };
        Ok(())
    }

    /// Rescale the current colour to `pct` percent, truncating.
    pub async fn set_brightness(&self, pct: i32) -> Result<(), LightsError> {
        let pct = check_range("brightness", pct, 100)?;
        let mut shared = self.shared.lock().await;
        let next = StripState {
            r: scale(shared.state.r, pct),
            g: scale(shared.state.g, pct),
            b: scale(shared.state.b, pct),
        };
        if !shared.dirty && shared.state == next {
            return Ok(());
        }
        shared.state = next;
        self.emit_and_persist(&mut shared).await
    }

    pub async fn preset(&self, preset: Preset) -> Result<(), LightsError> {
        let (r, g, b) = preset.rgb();
        self.commit(StripState { r, g, b }).await
    }

    /// Re-emit the current state; used by startup reconciliation and after
    /// a `*_no_publish` batch.
    pub async fn publish(&self) -> Result<(), LightsError> {
        let mut shared = self.shared.lock().await;
        self.emit_and_persist(&mut shared).await
    }

    async fn commit(&self, next: StripState) -> Result<(), LightsError> {
        let mut shared = self.shared.lock().await;
        if !shared.dirty && shared.state == next {
            return Ok(());
        }
        shared.state = next;
        self.emit_and_persist(&mut shared).await
    }

    async fn emit_and_persist(&self, shared: &mut StripShared) -> Result<(), LightsError> {
        if let Err(e) = self.publisher.publish(STRIP_TOPIC, encode(&shared.state)).await {
            shared.dirty = true;
            return Err(e);
        }
        shared.dirty = false;
        if let Some(store) = &self.store {
            let StripState { r, g, b } = shared.state;
            if let Err(e) = store.save_strip(STRIP_ID, r, g, b) {
                warn!(fixture = "ledstrip", id = STRIP_ID, err = %e, "state persist failed");
            }
        }
        Ok(())
    }
}

fn scale(value: u8, pct: u8) -> u8 {
    (u32::from(value) * u32::from(pct) / 100) as u8
}

fn encode(state: &StripState) -> Vec<u8> {
    format!(
        r#"{{"sequence":"fill","data":{{"r":{},"g":{},"b":{}}}}}"#,
        state.r, state.g, state.b
    )
    .into_bytes()
}

#[cfg(test)]
#[path = "strip_tests.rs"]
mod tests;
