// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

/// Office lights controller.
#[derive(Debug, Clone, Parser)]
#[command(name = "lights", version, about = "Controller bridging MQTT light fixtures to web, TUI and Stream Deck surfaces.")]
pub struct Config {
    /// MQTT broker URL.
    #[arg(long, default_value = "tcp://localhost:1883", env = "MQTT_URL")]
    pub mqtt_url: String,

    /// MQTT client identity.
    #[arg(long, default_value = "office_lights_controller", env = "MQTT_CLIENT_ID")]
    pub mqtt_client_id: String,

    /// Optional MQTT username.
    #[arg(long, env = "MQTT_USERNAME")]
    pub mqtt_username: Option<String>,

    /// Optional MQTT password.
    #[arg(long, env = "MQTT_PASSWORD")]
    pub mqtt_password: Option<String>,

    /// Path to the SQLite state database.
    #[arg(long, default_value = "lights.sqlite3", env = "DB_PATH")]
    pub db_path: PathBuf,

    /// HTTP port for the web surface.
    #[arg(long, default_value_t = 8080, env = "WEB_PORT")]
    pub web_port: u16,

    /// Surfaces to run; none selected runs headless.
    #[arg(value_enum, env = "SURFACES", value_delimiter = ',')]
    pub surfaces: Vec<Surface>,
}

/// User-facing interaction loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Surface {
    Tui,
    Web,
    Streamdeck,
}

impl Config {
    pub fn runs(&self, surface: Surface) -> bool {
        self.surfaces.contains(&surface)
    }

    /// Reject malformed settings before any side effect (store, broker).
    pub fn validate(&self) -> anyhow::Result<()> {
        crate::mqtt::parse_broker_url(&self.mqtt_url)?;
        anyhow::ensure!(!self.mqtt_client_id.is_empty(), "MQTT client id must not be empty");
        anyhow::ensure!(
            !self.db_path.as_os_str().is_empty(),
            "database path must not be empty"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
