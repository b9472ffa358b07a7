// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream Deck+ surface.
//!
//! The USB transport is an external collaborator: button/dial events arrive
//! over a channel and the four 200x100 touchscreen sections go out through
//! [`DeckScreen`]. This module owns everything in between: tab and mode
//! navigation, dial semantics, and the 100 ms redraw.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::LightsError;
use crate::fixture::{Fixtures, BRIGHTNESS_MAX, CHANNEL_MAX};
use crate::scene::SceneEngine;

/// Coarse dial step per tick.
const COARSE_STEP: i32 = 5;

/// Fine-tune dial step per tick.
const FINE_STEP: i32 = 1;

/// Input events from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckEvent {
    /// Buttons 0..=7: top row selects a tab, bottom row depends on the tab.
    ButtonPressed(u8),
    /// Signed tick count from one of the four dials.
    DialRotated { dial: u8, ticks: i32 },
    /// Click on one of the four dials.
    DialPressed(u8),
}

/// One touchscreen section. Inactive sections render as empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SectionView {
    pub label: String,
    pub value: String,
    pub active: bool,
}

/// Output seam towards the device's touchscreen.
pub trait DeckScreen: Send {
    fn render(&mut self, sections: &[SectionView; 4]) -> anyhow::Result<()>;
}

/// Screen stub used when no hardware backend is wired in.
pub struct NullScreen;

impl DeckScreen for NullScreen {
    fn render(&mut self, _sections: &[SectionView; 4]) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    LightControl,
    Scenes,
    Future3,
    Future4,
}

impl Tab {
    fn from_button(button: u8) -> Option<Self> {
        match button {
            0 => Some(Self::LightControl),
            1 => Some(Self::Scenes),
            2 => Some(Self::Future3),
            3 => Some(Self::Future4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    StripRgb,
    BarRgbw,
    BarWhite,
    VideoLights,
}

impl Mode {
    fn from_button(button: u8) -> Option<Self> {
        match button {
            4 => Some(Self::StripRgb),
            5 => Some(Self::BarRgbw),
            6 => Some(Self::BarWhite),
            7 => Some(Self::VideoLights),
            _ => None,
        }
    }

    fn index(self) -> usize {
        match self {
            Self::StripRgb => 0,
            Self::BarRgbw => 1,
            Self::BarWhite => 2,
            Self::VideoLights => 3,
        }
    }
}

/// Navigation state plus the per-mode dial toggle memory.
///
/// The toggle memory lives here, not in the drivers: when another surface
/// zeroes a value externally the remembered target goes stale, and nudging
/// the dial re-arms it.
pub struct DeckSurface {
    fixtures: Arc<Fixtures>,
    scenes: Arc<SceneEngine>,
    tab: Tab,
    mode: Mode,
    toggle_memory: [[i32; 4]; 4],
}

impl DeckSurface {
    pub fn new(fixtures: Arc<Fixtures>, scenes: Arc<SceneEngine>) -> Self {
        Self {
            fixtures,
            scenes,
            tab: Tab::LightControl,
            mode: Mode::StripRgb,
            toggle_memory: [[0; 4]; 4],
        }
    }

    /// Dispatch one device event. Driver errors are logged; the loop keeps
    /// running.
    pub async fn handle_event(&mut self, event: DeckEvent) {
        match event {
            DeckEvent::ButtonPressed(button) => self.button(button).await,
            DeckEvent::DialRotated { dial, ticks } => {
                if dial < 4 && ticks != 0 {
                    self.rotate(dial, ticks).await;
                }
            }
            DeckEvent::DialPressed(dial) => {
                if dial < 4 {
                    self.dial_press(dial).await;
                }
            }
        }
    }

    async fn button(&mut self, button: u8) {
        if let Some(tab) = Tab::from_button(button) {
            self.tab = tab;
            return;
        }
        match self.tab {
            Tab::LightControl => {
                if let Some(mode) = Mode::from_button(button) {
                    self.mode = mode;
                }
            }
            Tab::Scenes => {
                if (4..8).contains(&button) {
                    let slot = i64::from(button - 4);
                    match self.scenes.recall(slot, &self.fixtures).await {
                        Ok(true) => debug!(slot, "scene recalled"),
                        Ok(false) => debug!(slot, "scene slot empty"),
                        Err(e) => warn!(slot, err = %e, "scene recall failed"),
                    }
                }
            }
            Tab::Future3 | Tab::Future4 => {}
        }
    }

    async fn rotate(&mut self, dial: u8, ticks: i32) {
        if self.tab != Tab::LightControl {
            return;
        }
        let step = match self.mode {
            Mode::VideoLights if dial >= 2 => FINE_STEP,
            _ => COARSE_STEP,
        };
        let max = match self.mode {
            Mode::VideoLights => BRIGHTNESS_MAX,
            _ => CHANNEL_MAX,
        };
        let Some(current) = self.current_value(dial).await else {
            return;
        };
        let next = (current + ticks * step).clamp(0, max);
        if next != current {
            if let Err(e) = self.set_value(dial, next).await {
                warn!(dial, err = %e, "deck adjustment failed");
                return;
            }
        }
        if next != 0 {
            self.toggle_memory[self.mode.index()][dial as usize] = next;
        }
    }

    async fn dial_press(&mut self, dial: u8) {
        match self.tab {
            Tab::Scenes => {
                let slot = i64::from(dial);
                if let Err(e) = self.scenes.save(slot, &self.fixtures).await {
                    warn!(slot, err = %e, "scene save failed");
                } else {
                    debug!(slot, "scene saved");
                }
            }
            Tab::LightControl => {
                if self.mode == Mode::VideoLights {
                    let light = &self.fixtures.video[usize::from(dial) % 2];
                    let (on, brightness) = light.state().await;
                    if let Err(e) = light.set_state(!on, i32::from(brightness)).await {
                        warn!(dial, err = %e, "deck toggle failed");
                    }
                    return;
                }
                let Some(current) = self.current_value(dial).await else {
                    return;
                };
                if current != 0 {
                    self.toggle_memory[self.mode.index()][dial as usize] = current;
                    if let Err(e) = self.set_value(dial, 0).await {
                        warn!(dial, err = %e, "deck toggle failed");
                    }
                } else {
                    let remembered = self.toggle_memory[self.mode.index()][dial as usize];
                    if remembered > 0 {
                        if let Err(e) = self.set_value(dial, remembered).await {
                            warn!(dial, err = %e, "deck toggle failed");
                        }
                    }
                }
            }
            Tab::Future3 | Tab::Future4 => {}
        }
    }

    /// Value the dial currently controls; `None` when the dial is inactive
    /// in this mode.
    async fn current_value(&self, dial: u8) -> Option<i32> {
        match self.mode {
            Mode::StripRgb => {
                let (r, g, b) = self.fixtures.strip.color().await;
                match dial {
                    0 => Some(i32::from(r)),
                    1 => Some(i32::from(g)),
                    2 => Some(i32::from(b)),
                    _ => None,
                }
            }
            Mode::BarRgbw => {
                // LED 0 of section 1 is the representative readout.
                let (r, g, b, w) = self.fixtures.bar.rgbw(1, 0).await.ok()?;
                match dial {
                    0 => Some(i32::from(r)),
                    1 => Some(i32::from(g)),
                    2 => Some(i32::from(b)),
                    3 => Some(i32::from(w)),
                    _ => None,
                }
            }
            Mode::BarWhite => match dial {
                0 => self.fixtures.bar.average_white(1).await.ok().map(i32::from),
                1 => self.fixtures.bar.average_white(2).await.ok().map(i32::from),
                _ => None,
            },
            Mode::VideoLights => {
                let light = &self.fixtures.video[usize::from(dial) % 2];
                Some(i32::from(light.state().await.1))
            }
        }
    }

    async fn set_value(&self, dial: u8, value: i32) -> Result<(), LightsError> {
        match self.mode {
            Mode::StripRgb => {
                let (r, g, b) = self.fixtures.strip.color().await;
                let (mut r, mut g, mut b) = (i32::from(r), i32::from(g), i32::from(b));
                match dial {
                    0 => r = value,
                    1 => g = value,
                    2 => b = value,
                    _ => return Ok(()),
                }
                self.fixtures.strip.set_color(r, g, b).await
            }
            Mode::BarRgbw => {
                let (r, g, b, w) = self.fixtures.bar.rgbw(1, 0).await?;
                let (mut r, mut g, mut b, mut w) =
                    (i32::from(r), i32::from(g), i32::from(b), i32::from(w));
                match dial {
                    0 => r = value,
                    1 => g = value,
                    2 => b = value,
                    3 => w = value,
                    _ => return Ok(()),
                }
                self.fixtures.bar.set_all_rgbw(r, g, b, w).await
            }
            Mode::BarWhite => match dial {
                0 => self.fixtures.bar.set_all_white(1, value).await,
                1 => self.fixtures.bar.set_all_white(2, value).await,
                _ => Ok(()),
            },
            Mode::VideoLights => {
                self.fixtures.video[usize::from(dial) % 2].set_brightness(value).await
            }
        }
    }

    /// Build the four touchscreen sections for the current tab and mode.
    pub async fn view(&self) -> [SectionView; 4] {
        match self.tab {
            Tab::LightControl => self.light_control_view().await,
            Tab::Scenes => {
                let mut sections: [SectionView; 4] = Default::default();
                for (slot, section) in sections.iter_mut().enumerate() {
                    let saved = self.scenes.exists(slot as i64).unwrap_or(false);
                    *section = SectionView {
                        label: format!("Scene {slot}"),
                        value: if saved { "saved".to_owned() } else { "empty".to_owned() },
                        active: true,
                    };
                }
                sections
            }
            Tab::Future3 | Tab::Future4 => Default::default(),
        }
    }

    async fn light_control_view(&self) -> [SectionView; 4] {
        let active = |label: &str, value: i32| SectionView {
            label: label.to_owned(),
            value: value.to_string(),
            active: true,
        };
        match self.mode {
            Mode::StripRgb => {
                let (r, g, b) = self.fixtures.strip.color().await;
                [
                    active("Strip R", i32::from(r)),
                    active("Strip G", i32::from(g)),
                    active("Strip B", i32::from(b)),
                    SectionView::default(),
                ]
            }
            Mode::BarRgbw => {
                let (r, g, b, w) = self.fixtures.bar.rgbw(1, 0).await.unwrap_or((0, 0, 0, 0));
                [
                    active("Bar R", i32::from(r)),
                    active("Bar G", i32::from(g)),
                    active("Bar B", i32::from(b)),
                    active("Bar W", i32::from(w)),
                ]
            }
            Mode::BarWhite => {
                let s1 = self.fixtures.bar.average_white(1).await.unwrap_or(0);
                let s2 = self.fixtures.bar.average_white(2).await.unwrap_or(0);
                [
                    active("S1 White", i32::from(s1)),
                    active("S2 White", i32::from(s2)),
                    SectionView::default(),
                    SectionView::default(),
                ]
            }
            Mode::VideoLights => {
                let (on1, b1) = self.fixtures.video[0].state().await;
                let (on2, b2) = self.fixtures.video[1].state().await;
                let value = |on: bool, b: u8| if on { b.to_string() } else { "off".to_owned() };
                [
                    SectionView { label: "VL1".to_owned(), value: value(on1, b1), active: true },
                    SectionView { label: "VL2".to_owned(), value: value(on2, b2), active: true },
                    SectionView {
                        label: "VL1 fine".to_owned(),
                        value: value(on1, b1),
                        active: true,
                    },
                    SectionView {
                        label: "VL2 fine".to_owned(),
                        value: value(on2, b2),
                        active: true,
                    },
                ]
            }
        }
    }
}

/// Drive the surface until shutdown: dispatch device events as they arrive
/// and redraw the touchscreen every 100 ms so external changes show up.
pub async fn run(
    mut surface: DeckSurface,
    mut events: mpsc::Receiver<DeckEvent>,
    mut screen: Box<dyn DeckScreen>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut redraw = tokio::time::interval(Duration::from_millis(100));
    let mut events_open = true;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = redraw.tick() => {
                let view = surface.view().await;
                if let Err(e) = screen.render(&view) {
                    warn!(err = %e, "deck render failed");
                }
            }
            event = events.recv(), if events_open => match event {
                Some(event) => surface.handle_event(event).await,
                None => {
                    events_open = false;
                    debug!("deck event source closed");
                }
            },
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "deck_tests.rs"]
mod tests;
