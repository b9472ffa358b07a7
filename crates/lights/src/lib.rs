// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Office lights controller: holds the authoritative state of every fixture,
//! mirrors each mutation to the MQTT broker and the SQLite store, and keeps
//! the web, terminal, and Stream Deck surfaces consistent with both.

pub mod config;
pub mod error;
pub mod fixture;
pub mod mqtt;
pub mod scene;
pub mod store;
pub mod surface;
pub mod test_support;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{Config, Surface};
use crate::fixture::Fixtures;
use crate::mqtt::{MqttPublisher, SharedPublisher};
use crate::scene::SceneEngine;
use crate::store::Store;
use crate::surface::deck::{self, DeckSurface, NullScreen};
use crate::surface::tui;
use crate::surface::web::{self, WebState};

/// Run the controller until shutdown.
///
/// Startup order matters: open and seed the store, connect the broker, build
/// the drivers from persisted state, then re-publish every fixture so the
/// physical side resynchronises before any surface accepts input.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();

    let store = Arc::new(Store::open(&config.db_path)?);
    if !store.has_data()? {
        info!(db = %config.db_path.display(), "empty database, seeding fixture defaults");
        store.seed_defaults()?;
    }

    let mqtt = Arc::new(MqttPublisher::connect(&config, shutdown.clone()).await?);
    let publisher: SharedPublisher = Arc::clone(&mqtt) as SharedPublisher;

    let fixtures = Arc::new(Fixtures::from_store(publisher, Arc::clone(&store))?);
    fixtures.publish_all().await;
    let scenes = Arc::new(SceneEngine::new(Arc::clone(&store)));

    let mut tasks: Vec<(&'static str, JoinHandle<anyhow::Result<()>>)> = Vec::new();

    if config.runs(Surface::Web) {
        let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
        info!(port = config.web_port, "web surface listening");
        let state = Arc::new(WebState::new(Arc::clone(&fixtures)));
        tasks.push(("web", tokio::spawn(web::serve(listener, state, shutdown.clone()))));
    }

    if config.runs(Surface::Streamdeck) {
        // The USB transport is wired in from outside this crate; without one
        // the surface still runs its redraw loop against the null screen.
        warn!("no stream deck transport available; surface runs without hardware");
        let (_events_tx, events_rx) = mpsc::channel(16);
        let surface = DeckSurface::new(Arc::clone(&fixtures), Arc::clone(&scenes));
        tasks.push((
            "streamdeck",
            tokio::spawn(deck::run(surface, events_rx, Box::new(NullScreen), shutdown.clone())),
        ));
    }

    if config.runs(Surface::Tui) {
        let fixtures = Arc::clone(&fixtures);
        let tui_shutdown = shutdown.clone();
        // Surfaces are independent workers: quitting the TUI only ends the
        // TUI task, unless it is the sole surface and the process would
        // otherwise linger with nothing to drive.
        let sole_surface = !config.runs(Surface::Web) && !config.runs(Surface::Streamdeck);
        tasks.push((
            "tui",
            tokio::spawn(async move {
                let result = tui::run(fixtures, tui_shutdown.clone()).await;
                if sole_surface {
                    tui_shutdown.cancel();
                }
                result
            }),
        ));
    }

    wait_for_shutdown(&shutdown).await?;
    shutdown.cancel();

    for (name, task) in tasks {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(surface = name, err = %e, "surface exited with error"),
            Err(e) => warn!(surface = name, err = %e, "surface task failed"),
        }
    }

    mqtt.disconnect().await;
    info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown(shutdown: &CancellationToken) -> anyhow::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::signal::ctrl_c() => info!("SIGINT received, shutting down"),
        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
    }
    Ok(())
}
