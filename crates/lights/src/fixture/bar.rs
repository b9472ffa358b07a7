// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Light bar driver: two 6-LED RGBW blocks plus two 13-LED white blocks,
//! published as one fixed 77-value CSV sequence.
//!
//! Wire layout:
//!
//! ```text
//! 0..24    section 1 RGBW (6 x R,G,B,W)
//! 24..37   section 1 white (13)
//! 37..40   reserved, always emitted as 0
//! 40..64   section 2 RGBW
//! 64..77   section 2 white
//! ```

use std::fmt::Write as _;
use std::ops::Range;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use super::CHANNEL_MAX;
use crate::error::{check_range, LightsError};
use crate::mqtt::SharedPublisher;
use crate::store::Store;

/// MQTT topic for the bar's channel sequence.
pub const BAR_TOPIC: &str = "kevinoffice/ledbar/0";

/// Storage identity of the single bar.
pub const BAR_ID: i64 = 0;

/// Length of the wire sequence.
pub const CHANNEL_COUNT: usize = 77;

/// RGBW LEDs per section.
pub const RGBW_LEDS: i32 = 6;

/// White LEDs per section.
pub const WHITE_LEDS: i32 = 13;

/// Reserved wire slots; emitted as the literal `0` and never persisted with
/// meaning.
const RESERVED: Range<usize> = 37..40;

/// Channel offset of the second section.
const SECTION_2_BASE: usize = 40;

/// Channels occupied by one section (RGBW block + white block).
const SECTION_SPAN: usize = 37;

/// `dirty` is set when the broker rejected the last emit, so a retry of the
/// same mutation is not suppressed as a no-op.
struct BarState {
    channels: [u8; CHANNEL_COUNT],
    dirty: bool,
}

/// Driver for the light bar.
pub struct Bar {
    publisher: SharedPublisher,
    store: Option<Arc<Store>>,
    state: Mutex<BarState>,
}

impl Bar {
    pub fn new(
        publisher: SharedPublisher,
        store: Option<Arc<Store>>,
        channels: [u8; CHANNEL_COUNT],
    ) -> Self {
        Self { publisher, store, state: Mutex::new(BarState { channels, dirty: false }) }
    }

    // -- Getters ------------------------------------------------------------

    /// Full channel sequence as held in memory.
    pub async fn channels(&self) -> [u8; CHANNEL_COUNT] {
        self.state.lock().await.channels
    }

    pub async fn rgbw(&self, section: i32, led: i32) -> Result<(u8, u8, u8, u8), LightsError> {
        let base = rgbw_base(section, led)?;
        let state = self.state.lock().await;
        let c = &state.channels;
        Ok((c[base], c[base + 1], c[base + 2], c[base + 3]))
    }

    pub async fn white(&self, section: i32, led: i32) -> Result<u8, LightsError> {
        let idx = white_index(section, led)?;
        Ok(self.state.lock().await.channels[idx])
    }

    /// Arithmetic mean of a section's 13 white channels, truncating.
    pub async fn average_white(&self, section: i32) -> Result<u8, LightsError> {
        let base = section_base(section)? + 24;
        let state = self.state.lock().await;
        let sum: u32 =
            state.channels[base..base + WHITE_LEDS as usize].iter().map(|v| u32::from(*v)).sum();
        Ok((sum / WHITE_LEDS as u32) as u8)
    }

    // -- Publishing mutators ------------------------------------------------
    //
    // Each one validates, applies, and emits the full sequence once. A
    // mutation that leaves the channels unchanged emits nothing; only the
    // explicit `publish` re-emits unconditionally.

    /// Set one RGBW LED and emit the full sequence.
    pub async fn set_rgbw(
        &self,
        section: i32,
        led: i32,
        r: i32,
        g: i32,
        b: i32,
        w: i32,
    ) -> Result<(), LightsError> {
        let base = rgbw_base(section, led)?;
        let rgbw = check_rgbw(r, g, b, w)?;
        self.commit(|channels| apply_rgbw(channels, base, rgbw)).await
    }

    /// Set one white LED and emit the full sequence.
    pub async fn set_white(&self, section: i32, led: i32, value: i32) -> Result<(), LightsError> {
        let idx = white_index(section, led)?;
        let value = check_range("white", value, CHANNEL_MAX)?;
        self.commit(|channels| channels[idx] = value).await
    }

    /// Set every RGBW LED in both sections to the same colour.
    pub async fn set_all_rgbw(&self, r: i32, g: i32, b: i32, w: i32) -> Result<(), LightsError> {
        let rgbw = check_rgbw(r, g, b, w)?;
        self.commit(|channels| {
            for section_base in [0, SECTION_2_BASE] {
                for led in 0..RGBW_LEDS as usize {
                    apply_rgbw(channels, section_base + led * 4, rgbw);
                }
            }
        })
        .await
    }

    /// Set every white LED in one section to `value`.
    pub async fn set_all_white(&self, section: i32, value: i32) -> Result<(), LightsError> {
        let base = section_base(section)? + 24;
        let value = check_range("white", value, CHANNEL_MAX)?;
        self.commit(|channels| {
            for idx in base..base + WHITE_LEDS as usize {
                channels[idx] = value;
            }
        })
        .await
    }

    /// Set every white LED in both sections to `value`.
    pub async fn set_all_white_everywhere(&self, value: i32) -> Result<(), LightsError> {
        let value = check_range("white", value, CHANNEL_MAX)?;
        self.commit(|channels| {
            for section_base in [0, SECTION_2_BASE] {
                for idx in section_base + 24..section_base + SECTION_SPAN {
                    channels[idx] = value;
                }
            }
        })
        .await
    }

    /// Zero every channel of one section.
    pub async fn turn_off_section(&self, section: i32) -> Result<(), LightsError> {
        let base = section_base(section)?;
        self.commit(|channels| {
            for idx in base..base + SECTION_SPAN {
                channels[idx] = 0;
            }
        })
        .await
    }

    /// Zero the whole bar.
    pub async fn turn_off_all(&self) -> Result<(), LightsError> {
        self.commit(|channels| *channels = [0; CHANNEL_COUNT]).await
    }

    /// Replace the full sequence (scene recall, bulk patch); publishes once.
    pub async fn set_channels(&self, channels: &[i32]) -> Result<(), LightsError> {
        if channels.len() != CHANNEL_COUNT {
            return Err(LightsError::Index {
                what: "channel count",
                value: channels.len() as i32,
            });
        }
        let mut next = [0u8; CHANNEL_COUNT];
        for (idx, value) in channels.iter().enumerate() {
            next[idx] = check_range("channel", *value, CHANNEL_MAX)?;
        }
        self.commit(|channels| *channels = next).await
    }

    /// Re-emit the current state; used by startup reconciliation and after
    /// a `*_no_publish` batch.
    pub async fn publish(&self) -> Result<(), LightsError> {
        let mut state = self.state.lock().await;
        self.emit_and_persist(&mut state).await
    }

    // -- Batch mutators -----------------------------------------------------

    /// Batch variant of [`Bar::set_rgbw`]: no publish, no persist. Must be
    /// followed by exactly one [`Bar::publish`] under the same surface lock.
    pub async fn set_rgbw_no_publish(
        &self,
        section: i32,
        led: i32,
        r: i32,
        g: i32,
        b: i32,
        w: i32,
    ) -> Result<(), LightsError> {
        let base = rgbw_base(section, led)?;
        let rgbw = check_rgbw(r, g, b, w)?;
        let mut state = self.state.lock().await;
        apply_rgbw(&mut state.channels, base, rgbw);
        Ok(())
    }

    /// Batch variant of [`Bar::set_white`].
    pub async fn set_white_no_publish(
        &self,
        section: i32,
        led: i32,
        value: i32,
    ) -> Result<(), LightsError> {
        let idx = white_index(section, led)?;
        let value = check_range("white", value, CHANNEL_MAX)?;
        let mut state = self.state.lock().await;
        state.channels[idx] = value;
        Ok(())
    }

    async fn commit<F>(&self, mutate: F) -> Result<(), LightsError>
    where
        F: FnOnce(&mut [u8; CHANNEL_COUNT]),
    {
        let mut state = self.state.lock().await;
        let mut next = state.channels;
        mutate(&mut next);
        if !state.dirty && next == state.channels {
            return Ok(());
        }
        state.channels = next;
        self.emit_and_persist(&mut state).await
    }

    async fn emit_and_persist(&self, state: &mut BarState) -> Result<(), LightsError> {
        if let Err(e) = self.publisher.publish(BAR_TOPIC, encode(&state.channels)).await {
            state.dirty = true;
            return Err(e);
        }
        state.dirty = false;
        if let Some(store) = &self.store {
            if let Err(e) = store.save_bar_channels(BAR_ID, &state.channels) {
                warn!(fixture = "ledbar", id = BAR_ID, err = %e, "state persist failed");
            }
        }
        Ok(())
    }
}

fn section_base(section: i32) -> Result<usize, LightsError> {
    match section {
        1 => Ok(0),
        2 => Ok(SECTION_2_BASE),
        _ => Err(LightsError::Index { what: "section", value: section }),
    }
}

fn rgbw_base(section: i32, led: i32) -> Result<usize, LightsError> {
    let base = section_base(section)?;
    if !(0..RGBW_LEDS).contains(&led) {
        return Err(LightsError::Index { what: "led index", value: led });
    }
    Ok(base + led as usize * 4)
}

fn white_index(section: i32, led: i32) -> Result<usize, LightsError> {
    let base = section_base(section)?;
    if !(0..WHITE_LEDS).contains(&led) {
        return Err(LightsError::Index { what: "led index", value: led });
    }
    Ok(base + 24 + led as usize)
}

fn check_rgbw(r: i32, g: i32, b: i32, w: i32) -> Result<(u8, u8, u8, u8), LightsError> {
    Ok((
        check_range("r", r, CHANNEL_MAX)?,
        check_range("g", g, CHANNEL_MAX)?,
        check_range("b", b, CHANNEL_MAX)?,
        check_range("w", w, CHANNEL_MAX)?,
    ))
}

fn apply_rgbw(channels: &mut [u8; CHANNEL_COUNT], base: usize, (r, g, b, w): (u8, u8, u8, u8)) {
    channels[base] = r;
    channels[base + 1] = g;
    channels[base + 2] = b;
    channels[base + 3] = w;
}

/// 77 decimal integers joined by commas; reserved slots are always `0`.
fn encode(channels: &[u8; CHANNEL_COUNT]) -> Vec<u8> {
    let mut out = String::with_capacity(CHANNEL_COUNT * 4);
    for (idx, value) in channels.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if RESERVED.contains(&idx) {
            out.push('0');
        } else {
            let _ = write!(out, "{value}");
        }
    }
    out.into_bytes()
}

#[cfg(test)]
#[path = "bar_tests.rs"]
mod tests;
