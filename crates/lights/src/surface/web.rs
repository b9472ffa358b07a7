// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surface: JSON read/replace of the full aggregate plus the embedded
//! single-page UI.
//!
//! A POST is applied as one batch under a surface-wide mutex so a concurrent
//! POST can never interleave partial updates: the bar's ~38 sub-updates use
//! the `*_no_publish` mutators and drain as a single broker message.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::error::LightsError;
use crate::fixture::bar::{RGBW_LEDS, WHITE_LEDS};
use crate::fixture::Fixtures;

/// Embedded web bundle.
const INDEX_HTML: &str = include_str!("../../../../web/dist/index.html");
const APP_JS: &str = include_str!("../../../../web/dist/app.js");
const STYLE_CSS: &str = include_str!("../../../../web/dist/style.css");

// -- Aggregate DTOs -----------------------------------------------------------
//
// Numeric fields are i32 on purpose: out-of-range input must deserialize so
// validation can answer with the canonical 400 envelope.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub led_strip: StripDto,
    pub led_bar: BarDto,
    pub video_light1: VideoLightDto,
    pub video_light2: VideoLightDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripDto {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarDto {
    pub section1: BarSectionDto,
    pub section2: BarSectionDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSectionDto {
    pub rgbw: Vec<RgbwDto>,
    pub white: Vec<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RgbwDto {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub w: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoLightDto {
    pub on: bool,
    pub brightness: i32,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- State --------------------------------------------------------------------

/// Shared web surface state: the drivers plus the batch mutex held across
/// each request body's application.
pub struct WebState {
    fixtures: Arc<Fixtures>,
    batch: Mutex<()>,
}

impl WebState {
    pub fn new(fixtures: Arc<Fixtures>) -> Self {
        Self { fixtures, batch: Mutex::new(()) }
    }
}

// -- Handlers -----------------------------------------------------------------

/// `GET /health`
async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// `GET /api` — the full aggregate, read under the surface mutex.
async fn get_api(State(s): State<Arc<WebState>>) -> impl IntoResponse {
    let _guard = s.batch.lock().await;
    Json(read_aggregate(&s.fixtures).await)
}

/// `POST /api` — replace the aggregate; exactly one broker message per
/// fixture that actually changed.
async fn post_api(
    State(s): State<Arc<WebState>>,
    payload: Result<Json<Aggregate>, JsonRejection>,
) -> Response {
    let Json(aggregate) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    if let Err(message) = validate(&aggregate) {
        return error_response(StatusCode::BAD_REQUEST, message);
    }

    let _guard = s.batch.lock().await;
    if let Err(e) = apply(&s.fixtures, &aggregate).await {
        return error_response(
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            e.to_string(),
        );
    }
    Json(read_aggregate(&s.fixtures).await).into_response()
}

/// Apply the posted aggregate in driver-class order: strip, bar, then the
/// video lights. Ranges were validated up front, so any error here is
/// transport.
async fn apply(fixtures: &Fixtures, aggregate: &Aggregate) -> Result<(), LightsError> {
    let strip = &aggregate.led_strip;
    fixtures.strip.set_color(strip.r, strip.g, strip.b).await?;

    for (section, dto) in [(1, &aggregate.led_bar.section1), (2, &aggregate.led_bar.section2)] {
        for (led, rgbw) in dto.rgbw.iter().enumerate() {
            fixtures
                .bar
                .set_rgbw_no_publish(section, led as i32, rgbw.r, rgbw.g, rgbw.b, rgbw.w)
                .await?;
        }
        for (led, value) in dto.white.iter().enumerate() {
            fixtures.bar.set_white_no_publish(section, led as i32, *value).await?;
        }
    }
    fixtures.bar.publish().await?;

    for (light, dto) in
        fixtures.video.iter().zip([&aggregate.video_light1, &aggregate.video_light2])
    {
        if dto.on {
            light.turn_on(dto.brightness).await?;
        } else {
            light.turn_off().await?;
        }
    }
    Ok(())
}

/// Build the canonical aggregate from the drivers' getters.
pub async fn read_aggregate(fixtures: &Fixtures) -> Aggregate {
    let (r, g, b) = fixtures.strip.color().await;
    let channels = fixtures.bar.channels().await;
    let (on1, b1) = fixtures.video[0].state().await;
    let (on2, b2) = fixtures.video[1].state().await;

    let section = |base: usize| BarSectionDto {
        rgbw: (0..RGBW_LEDS as usize)
            .map(|led| {
                let idx = base + led * 4;
                RgbwDto {
                    r: i32::from(channels[idx]),
                    g: i32::from(channels[idx + 1]),
                    b: i32::from(channels[idx + 2]),
                    w: i32::from(channels[idx + 3]),
                }
            })
            .collect(),
        white: channels[base + 24..base + 24 + WHITE_LEDS as usize]
            .iter()
            .map(|v| i32::from(*v))
            .collect(),
    };

    Aggregate {
        led_strip: StripDto { r: i32::from(r), g: i32::from(g), b: i32::from(b) },
        led_bar: BarDto { section1: section(0), section2: section(40) },
        video_light1: VideoLightDto { on: on1, brightness: i32::from(b1) },
        video_light2: VideoLightDto { on: on2, brightness: i32::from(b2) },
    }
}

/// Check every numeric field and both section shapes before any mutation.
fn validate(aggregate: &Aggregate) -> Result<(), String> {
    let channel = |what: &str, value: i32| -> Result<(), String> {
        if !(0..=255).contains(&value) {
            return Err(format!("{what} out of range: {value} not in 0..=255"));
        }
        Ok(())
    };

    channel("ledStrip.r", aggregate.led_strip.r)?;
    channel("ledStrip.g", aggregate.led_strip.g)?;
    channel("ledStrip.b", aggregate.led_strip.b)?;

    for (name, section) in
        [("section1", &aggregate.led_bar.section1), ("section2", &aggregate.led_bar.section2)]
    {
        if section.rgbw.len() != RGBW_LEDS as usize {
            return Err(format!(
                "ledBar.{name}.rgbw must hold exactly {RGBW_LEDS} entries, got {}",
                section.rgbw.len()
            ));
        }
        if section.white.len() != WHITE_LEDS as usize {
            return Err(format!(
                "ledBar.{name}.white must hold exactly {WHITE_LEDS} entries, got {}",
                section.white.len()
            ));
        }
        for (led, rgbw) in section.rgbw.iter().enumerate() {
            channel(&format!("ledBar.{name}.rgbw[{led}].r"), rgbw.r)?;
            channel(&format!("ledBar.{name}.rgbw[{led}].g"), rgbw.g)?;
            channel(&format!("ledBar.{name}.rgbw[{led}].b"), rgbw.b)?;
            channel(&format!("ledBar.{name}.rgbw[{led}].w"), rgbw.w)?;
        }
        for (led, value) in section.white.iter().enumerate() {
            channel(&format!("ledBar.{name}.white[{led}]"), *value)?;
        }
    }

    for (name, light) in
        [("videoLight1", &aggregate.video_light1), ("videoLight2", &aggregate.video_light2)]
    {
        if !(0..=100).contains(&light.brightness) {
            return Err(format!(
                "{name}.brightness out of range: {} not in 0..=100",
                light.brightness
            ));
        }
    }
    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

// -- Router & server ----------------------------------------------------------

/// Build the axum `Router` with all web routes.
pub fn build_router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/", get(|| async { Html(INDEX_HTML) }))
        .route(
            "/static/app.js",
            get(|| async { ([(header::CONTENT_TYPE, "application/javascript")], APP_JS) }),
        )
        .route(
            "/static/style.css",
            get(|| async { ([(header::CONTENT_TYPE, "text/css")], STYLE_CSS) }),
        )
        .route("/health", get(health))
        .route("/api", get(get_api).post(post_api))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the web surface until shutdown.
pub async fn serve(
    listener: TcpListener,
    state: Arc<WebState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let router = build_router(state);
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;
    Ok(())
}

#[cfg(test)]
#[path = "web_tests.rs"]
mod tests;
