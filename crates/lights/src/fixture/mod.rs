// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixture drivers: the authoritative in-process state of every light.
//!
//! Each driver owns its fixture's state behind its own mutex and runs every
//! mutation as one critical section: validate, apply, emit to the broker,
//! persist. Transport failures are returned to the caller (the physical
//! light is stale); persistence failures are logged and swallowed (the next
//! mutation overwrites).

pub mod bar;
pub mod strip;
pub mod videolight;

use std::sync::Arc;

use tracing::warn;

pub use bar::Bar;
pub use strip::Strip;
pub use videolight::VideoLight;

use crate::mqtt::SharedPublisher;
use crate::store::Store;

/// Upper bound for colour/channel components.
pub const CHANNEL_MAX: i32 = 255;

/// Upper bound for video-light brightness.
pub const BRIGHTNESS_MAX: i32 = 100;

/// All drivers, one per physical fixture.
pub struct Fixtures {
    pub strip: Strip,
    pub bar: Bar,
    pub video: [VideoLight; 2],
}

impl Fixtures {
    /// Construct drivers with all channels dark.
    pub fn new(publisher: SharedPublisher, store: Option<Arc<Store>>) -> Self {
        Self {
            strip: Strip::new(Arc::clone(&publisher), store.clone(), (0, 0, 0)),
            bar: Bar::new(Arc::clone(&publisher), store.clone(), [0; bar::CHANNEL_COUNT]),
            video: [
                VideoLight::new(Arc::clone(&publisher), store.clone(), 1, false, 0),
                VideoLight::new(publisher, store, 2, false, 0),
            ],
        }
    }

    /// Construct drivers pre-seeded from the store.
    pub fn from_store(publisher: SharedPublisher, store: Arc<Store>) -> anyhow::Result<Self> {
        let strip_state = store.load_strip(strip::STRIP_ID)?;
        let bar_state = store.load_bar_channels(bar::BAR_ID)?;
        let (on1, b1) = store.load_video_light(0)?;
        let (on2, b2) = store.load_video_light(1)?;
        Ok(Self {
            strip: Strip::new(Arc::clone(&publisher), Some(Arc::clone(&store)), strip_state),
            bar: Bar::new(Arc::clone(&publisher), Some(Arc::clone(&store)), bar_state),
            video: [
                VideoLight::new(Arc::clone(&publisher), Some(Arc::clone(&store)), 1, on1, b1),
                VideoLight::new(publisher, Some(store), 2, on2, b2),
            ],
        })
    }

    /// Re-emit every fixture's state so the physical side resynchronises.
    /// Best effort: a failed publish is logged and the rest still go out.
    pub async fn publish_all(&self) {
        if let Err(e) = self.strip.publish().await {
            warn!(fixture = "ledstrip", err = %e, "reconcile publish failed");
        }
        if let Err(e) = self.bar.publish().await {
            warn!(fixture = "ledbar", err = %e, "reconcile publish failed");
        }
        for light in &self.video {
            if let Err(e) = light.publish().await {
                warn!(fixture = "videolight", id = light.surface_id(), err = %e, "reconcile publish failed");
            }
        }
    }
}
