// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal surface: a cooperative keyboard/tick loop over the drivers.
//!
//! Tab cycles the four fixture sections, arrows pick and adjust controls,
//! Enter toggles booleans. A 100 ms tick re-reads the getters so changes
//! made by other surfaces show up without any event plumbing.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::{Frame, Terminal};
use tokio_util::sync::CancellationToken;

use crate::fixture::strip::Preset;
use crate::fixture::{Fixtures, BRIGHTNESS_MAX, CHANNEL_MAX};

const TICK: Duration = Duration::from_millis(100);

/// One adjustable control inside a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    StripR,
    StripG,
    StripB,
    BarR,
    BarG,
    BarB,
    BarW,
    BarWhite1,
    BarWhite2,
    VlOn(usize),
    VlBrightness(usize),
}

impl Control {
    fn label(self) -> &'static str {
        match self {
            Self::StripR | Self::BarR => "R",
            Self::StripG | Self::BarG => "G",
            Self::StripB | Self::BarB => "B",
            Self::BarW => "W",
            Self::BarWhite1 => "White 1",
            Self::BarWhite2 => "White 2",
            Self::VlOn(_) => "On",
            Self::VlBrightness(_) => "Brightness",
        }
    }
}

/// The four sections and their controls, in focus order.
pub(crate) const SECTIONS: [(&str, &[Control]); 4] = [
    ("Strip", &[Control::StripR, Control::StripG, Control::StripB]),
    (
        "Bar",
        &[
            Control::BarR,
            Control::BarG,
            Control::BarB,
            Control::BarW,
            Control::BarWhite1,
            Control::BarWhite2,
        ],
    ),
    ("Video Light 1", &[Control::VlOn(0), Control::VlBrightness(0)]),
    ("Video Light 2", &[Control::VlOn(1), Control::VlBrightness(1)]),
];

/// Focus state plus the last mutator error for the status line.
pub(crate) struct TuiModel {
    pub(crate) section: usize,
    pub(crate) control: usize,
    pub(crate) status: Option<String>,
}

impl TuiModel {
    pub(crate) fn new() -> Self {
        Self { section: 0, control: 0, status: None }
    }

    pub(crate) fn focused(&self) -> Control {
        SECTIONS[self.section].1[self.control]
    }

    pub(crate) fn next_section(&mut self) {
        self.section = (self.section + 1) % SECTIONS.len();
        self.control = 0;
    }

    pub(crate) fn prev_section(&mut self) {
        self.section = (self.section + SECTIONS.len() - 1) % SECTIONS.len();
        self.control = 0;
    }

    pub(crate) fn next_control(&mut self) {
        let controls = SECTIONS[self.section].1.len();
        self.control = (self.control + 1) % controls;
    }

    pub(crate) fn prev_control(&mut self) {
        let controls = SECTIONS[self.section].1.len();
        self.control = (self.control + controls - 1) % controls;
    }
}

/// Apply an arrow-key delta to the focused control, clamping at the range
/// edges. Booleans ignore deltas; Enter toggles them instead.
pub(crate) async fn adjust(fixtures: &Fixtures, control: Control, delta: i32) -> Option<String> {
    let clamp_channel = |value: i32| value.clamp(0, CHANNEL_MAX);
    let result = match control {
        Control::StripR | Control::StripG | Control::StripB => {
            let (r, g, b) = fixtures.strip.color().await;
            let (mut r, mut g, mut b) = (i32::from(r), i32::from(g), i32::from(b));
            match control {
                Control::StripR => r = clamp_channel(r + delta),
                Control::StripG => g = clamp_channel(g + delta),
                _ => b = clamp_channel(b + delta),
            }
            fixtures.strip.set_color(r, g, b).await
        }
        Control::BarR | Control::BarG | Control::BarB | Control::BarW => {
            match fixtures.bar.rgbw(1, 0).await {
                Ok((r, g, b, w)) => {
                    let (mut r, mut g, mut b, mut w) =
                        (i32::from(r), i32::from(g), i32::from(b), i32::from(w));
                    match control {
                        Control::BarR => r = clamp_channel(r + delta),
                        Control::BarG => g = clamp_channel(g + delta),
                        Control::BarB => b = clamp_channel(b + delta),
                        _ => w = clamp_channel(w + delta),
                    }
                    fixtures.bar.set_all_rgbw(r, g, b, w).await
                }
                Err(e) => Err(e),
            }
        }
        Control::BarWhite1 | Control::BarWhite2 => {
            let section = if control == Control::BarWhite1 { 1 } else { 2 };
            match fixtures.bar.average_white(section).await {
                Ok(avg) => {
                    let next = clamp_channel(i32::from(avg) + delta);
                    fixtures.bar.set_all_white(section, next).await
                }
                Err(e) => Err(e),
            }
        }
        Control::VlOn(_) => Ok(()),
        Control::VlBrightness(light) => {
            let (_, brightness) = fixtures.video[light].state().await;
            let next = (i32::from(brightness) + delta).clamp(0, BRIGHTNESS_MAX);
            fixtures.video[light].set_brightness(next).await
        }
    };
    result.err().map(|e| e.to_string())
}

/// Toggle the focused control if it is a boolean; returns the new status.
pub(crate) async fn toggle(fixtures: &Fixtures, control: Control) -> Option<String> {
    if let Control::VlOn(light) = control {
        let (on, brightness) = fixtures.video[light].state().await;
        return fixtures.video[light]
            .set_state(!on, i32::from(brightness))
            .await
            .err()
            .map(|e| e.to_string());
    }
    None
}

/// Strip colour preset bound to a number key, if any.
pub(crate) fn preset_for_key(c: char) -> Option<Preset> {
    match c {
        '1' => Some(Preset::Red),
        '2' => Some(Preset::Green),
        '3' => Some(Preset::Blue),
        '4' => Some(Preset::White),
        '5' => Some(Preset::Yellow),
        '6' => Some(Preset::Cyan),
        '7' => Some(Preset::Magenta),
        _ => None,
    }
}

/// Handle one key press; returns `true` to quit.
pub(crate) async fn handle_key(
    model: &mut TuiModel,
    fixtures: &Fixtures,
    key: KeyEvent,
) -> bool {
    let step = if key.modifiers.contains(KeyModifiers::SHIFT) { 10 } else { 1 };
    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Tab => model.next_section(),
        KeyCode::BackTab => model.prev_section(),
        KeyCode::Right => model.next_control(),
        KeyCode::Left => model.prev_control(),
        KeyCode::Up => model.status = adjust(fixtures, model.focused(), step).await,
        KeyCode::Down => model.status = adjust(fixtures, model.focused(), -step).await,
        KeyCode::Enter => model.status = toggle(fixtures, model.focused()).await,
        KeyCode::Char(c) => {
            if let Some(preset) = preset_for_key(c) {
                model.status = fixtures.strip.preset(preset).await.err().map(|e| e.to_string());
            }
        }
        _ => {}
    }
    false
}

// -- Rendering ----------------------------------------------------------------

struct Snapshot {
    strip: (u8, u8, u8),
    bar_rgbw: (u8, u8, u8, u8),
    bar_white: (u8, u8),
    video: [(bool, u8); 2],
}

async fn snapshot(fixtures: &Fixtures) -> Snapshot {
    Snapshot {
        strip: fixtures.strip.color().await,
        bar_rgbw: fixtures.bar.rgbw(1, 0).await.unwrap_or((0, 0, 0, 0)),
        bar_white: (
            fixtures.bar.average_white(1).await.unwrap_or(0),
            fixtures.bar.average_white(2).await.unwrap_or(0),
        ),
        video: [fixtures.video[0].state().await, fixtures.video[1].state().await],
    }
}

fn control_value(snapshot: &Snapshot, control: Control) -> String {
    match control {
        Control::StripR => snapshot.strip.0.to_string(),
        Control::StripG => snapshot.strip.1.to_string(),
        Control::StripB => snapshot.strip.2.to_string(),
        Control::BarR => snapshot.bar_rgbw.0.to_string(),
        Control::BarG => snapshot.bar_rgbw.1.to_string(),
        Control::BarB => snapshot.bar_rgbw.2.to_string(),
        Control::BarW => snapshot.bar_rgbw.3.to_string(),
        Control::BarWhite1 => snapshot.bar_white.0.to_string(),
        Control::BarWhite2 => snapshot.bar_white.1.to_string(),
        Control::VlOn(light) => {
            if snapshot.video[light].0 { "on" } else { "off" }.to_owned()
        }
        Control::VlBrightness(light) => snapshot.video[light].1.to_string(),
    }
}

fn draw(frame: &mut Frame<'_>, model: &TuiModel, snapshot: &Snapshot) {
    let rows = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(1),
    ])
    .split(frame.area());

    for (idx, (title, controls)) in SECTIONS.iter().enumerate() {
        let mut spans: Vec<Span<'_>> = Vec::new();
        for (cidx, control) in controls.iter().enumerate() {
            if cidx > 0 {
                spans.push(Span::raw("  "));
            }
            let text = format!("{}: {}", control.label(), control_value(snapshot, *control));
            let focused = idx == model.section && cidx == model.control;
            if focused {
                spans.push(Span::styled(text, Style::default().add_modifier(Modifier::REVERSED)));
            } else {
                spans.push(Span::raw(text));
            }
        }
        let block = if idx == model.section {
            Block::bordered().title(format!("[ {title} ]"))
        } else {
            Block::bordered().title(*title)
        };
        frame.render_widget(Paragraph::new(Line::from(spans)).block(block), rows[idx]);
    }

    let help = match &model.status {
        Some(error) => format!("error: {error}"),
        None => {
            "tab: section  \u{2190}\u{2192}: control  \u{2191}\u{2193}: adjust (shift: x10)  \
             enter: toggle  1-7: strip preset  esc: quit"
                .to_owned()
        }
    };
    frame.render_widget(Paragraph::new(help), rows[4]);
}

/// Run the terminal surface until quit or shutdown.
pub async fn run(fixtures: Arc<Fixtures>, shutdown: CancellationToken) -> anyhow::Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
    let result = event_loop(&fixtures, &shutdown).await;
    crossterm::execute!(io::stdout(), LeaveAlternateScreen)?;
    disable_raw_mode()?;
    result
}

async fn event_loop(fixtures: &Fixtures, shutdown: &CancellationToken) -> anyhow::Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);
    let mut model = TuiModel::new();

    loop {
        let snap = snapshot(fixtures).await;
        terminal.draw(|frame| draw(frame, &model, &snap))?;

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {}
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if handle_key(&mut model, fixtures, key).await {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => anyhow::bail!("terminal event stream failed: {e}"),
                None => break,
            },
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tui_tests.rs"]
mod tests;
