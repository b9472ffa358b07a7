// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable fixture and scene state over SQLite.
//!
//! One connection behind a mutex; every operation is atomic with respect to
//! concurrent callers. WAL journalling with `synchronous=NORMAL` bounds the
//! damage of a crash to the last uncommitted transaction.

pub mod scene;

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::fixture::bar::CHANNEL_COUNT;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ledbars (
    id INTEGER PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS ledbars_leds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ledbar_id INTEGER NOT NULL REFERENCES ledbars(id),
    channel_num INTEGER NOT NULL,
    value INTEGER NOT NULL DEFAULT 0 CHECK (value BETWEEN 0 AND 255),
    UNIQUE (ledbar_id, channel_num)
);
CREATE INDEX IF NOT EXISTS idx_ledbars_leds_channel
    ON ledbars_leds (ledbar_id, channel_num);
CREATE TABLE IF NOT EXISTS ledstrips (
    id INTEGER PRIMARY KEY,
    red INTEGER NOT NULL DEFAULT 0 CHECK (red BETWEEN 0 AND 255),
    green INTEGER NOT NULL DEFAULT 0 CHECK (green BETWEEN 0 AND 255),
    blue INTEGER NOT NULL DEFAULT 0 CHECK (blue BETWEEN 0 AND 255)
);
CREATE TABLE IF NOT EXISTS videolights (
    id INTEGER PRIMARY KEY,
    on_state INTEGER NOT NULL DEFAULT 0 CHECK (on_state IN (0, 1)),
    brightness INTEGER NOT NULL DEFAULT 0 CHECK (brightness BETWEEN 0 AND 100)
);
CREATE TABLE IF NOT EXISTS scenes (
    id INTEGER PRIMARY KEY
);
CREATE TABLE IF NOT EXISTS scenes_ledbars_leds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scene_id INTEGER NOT NULL REFERENCES scenes(id) ON DELETE CASCADE,
    ledbar_id INTEGER NOT NULL,
    channel_num INTEGER NOT NULL,
    value INTEGER NOT NULL CHECK (value BETWEEN 0 AND 255)
);
CREATE INDEX IF NOT EXISTS idx_scenes_ledbars_leds_channel
    ON scenes_ledbars_leds (scene_id, ledbar_id, channel_num);
CREATE TABLE IF NOT EXISTS scenes_ledstrips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scene_id INTEGER NOT NULL REFERENCES scenes(id) ON DELETE CASCADE,
    red INTEGER NOT NULL CHECK (red BETWEEN 0 AND 255),
    green INTEGER NOT NULL CHECK (green BETWEEN 0 AND 255),
    blue INTEGER NOT NULL CHECK (blue BETWEEN 0 AND 255)
);
CREATE TABLE IF NOT EXISTS scenes_videolights (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scene_id INTEGER NOT NULL REFERENCES scenes(id) ON DELETE CASCADE,
    videolight_id INTEGER NOT NULL,
    on_state INTEGER NOT NULL CHECK (on_state IN (0, 1)),
    brightness INTEGER NOT NULL CHECK (brightness BETWEEN 0 AND 100)
);
";

/// Durable state store shared by all drivers and the scene engine.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and apply schema and pragmas.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        // journal_mode returns a row, so it cannot go through pragma_update.
        let _mode: String =
            conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store with the full schema; used by tests and tooling.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// True iff any fixture row exists; gates one-time default seeding.
    pub fn has_data(&self) -> anyhow::Result<bool> {
        let conn = self.conn.lock();
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM ledstrips)
                 OR EXISTS(SELECT 1 FROM videolights)
                 OR EXISTS(SELECT 1 FROM ledbars)",
            [],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Seed default rows for every fixture and the four scene slots.
    pub fn seed_defaults(&self) -> anyhow::Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO ledstrips (id, red, green, blue) VALUES (0, 0, 0, 0)", [])?;
        tx.execute("INSERT OR IGNORE INTO ledbars (id) VALUES (0)", [])?;
        for id in 0..2 {
            tx.execute(
                "INSERT OR IGNORE INTO videolights (id, on_state, brightness) VALUES (?1, 0, 0)",
                params![id],
            )?;
        }
        for id in 0..scene::SCENE_SLOTS {
            tx.execute("INSERT OR IGNORE INTO scenes (id) VALUES (?1)", params![id])?;
        }
        tx.commit()?;
        Ok(())
    }

    // -- Strip --------------------------------------------------------------

    pub fn save_strip(&self, id: i64, r: u8, g: u8, b: u8) -> anyhow::Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO ledstrips (id, red, green, blue) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE
                 SET red = excluded.red, green = excluded.green, blue = excluded.blue",
            params![id, r, g, b],
        )?;
        Ok(())
    }

    /// Missing row yields `(0, 0, 0)` without error.
    pub fn load_strip(&self, id: i64) -> anyhow::Result<(u8, u8, u8)> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT red, green, blue FROM ledstrips WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(row.unwrap_or((0, 0, 0)))
    }

    // -- Bar ----------------------------------------------------------------

    /// Upsert all 77 channels in one transaction; rejects any other length.
    pub fn save_bar_channels(&self, bar_id: i64, channels: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(
            channels.len() == CHANNEL_COUNT,
            "bar channel save needs {CHANNEL_COUNT} values, got {}",
            channels.len()
        );
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO ledbars (id) VALUES (?1)", params![bar_id])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO ledbars_leds (ledbar_id, channel_num, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(ledbar_id, channel_num) DO UPDATE SET value = excluded.value",
            )?;
            for (num, value) in channels.iter().enumerate() {
                stmt.execute(params![bar_id, num as i64, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Missing channels default to 0; the returned array is always full length.
    pub fn load_bar_channels(&self, bar_id: i64) -> anyhow::Result<[u8; CHANNEL_COUNT]> {
        let conn = self.conn.lock();
        let mut channels = [0u8; CHANNEL_COUNT];
        let mut stmt = conn.prepare_cached(
            "SELECT channel_num, value FROM ledbars_leds WHERE ledbar_id = ?1",
        )?;
        let rows = stmt.query_map(params![bar_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, u8>(1)?))
        })?;
        for row in rows {
            let (num, value) = row?;
            if let Ok(idx) = usize::try_from(num) {
                if idx < CHANNEL_COUNT {
                    channels[idx] = value;
                }
            }
        }
        Ok(channels)
    }

    // -- Video lights -------------------------------------------------------

    pub fn save_video_light(&self, id: i64, on: bool, brightness: u8) -> anyhow::Result<()> {
        anyhow::ensure!(brightness <= 100, "brightness {brightness} outside 0..=100");
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO videolights (id, on_state, brightness) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE
                 SET on_state = excluded.on_state, brightness = excluded.brightness",
            params![id, on, brightness],
        )?;
        Ok(())
    }

    /// Missing row yields `(false, 0)`.
    pub fn load_video_light(&self, id: i64) -> anyhow::Result<(bool, u8)> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT on_state, brightness FROM videolights WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row.unwrap_or((false, 0)))
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
