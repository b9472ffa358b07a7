// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scene persistence: one transaction per slot write.
//!
//! A slot is saved iff any child row exists for its id. Bar channels equal
//! to zero are not stored; absent rows read back as zero.

use rusqlite::{params, OptionalExtension};

use super::Store;
use crate::fixture::bar::{BAR_ID, CHANNEL_COUNT};
use crate::scene::SceneSnapshot;

/// Fixed number of scene slots.
pub const SCENE_SLOTS: i64 = 4;

impl Store {
    /// True iff the slot holds a saved snapshot.
    pub fn scene_exists(&self, id: i64) -> anyhow::Result<bool> {
        let conn = self.conn.lock();
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM scenes_ledstrips WHERE scene_id = ?1)
                 OR EXISTS(SELECT 1 FROM scenes_ledbars_leds WHERE scene_id = ?1)
                 OR EXISTS(SELECT 1 FROM scenes_videolights WHERE scene_id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(found)
    }

    /// Replace the slot's contents with `snapshot`, atomically.
    pub fn save_scene(&self, id: i64, snapshot: &SceneSnapshot) -> anyhow::Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO scenes (id) VALUES (?1)", params![id])?;
        tx.execute("DELETE FROM scenes_ledstrips WHERE scene_id = ?1", params![id])?;
        tx.execute("DELETE FROM scenes_ledbars_leds WHERE scene_id = ?1", params![id])?;
        tx.execute("DELETE FROM scenes_videolights WHERE scene_id = ?1", params![id])?;

        let (r, g, b) = snapshot.strip;
        tx.execute(
            "INSERT INTO scenes_ledstrips (scene_id, red, green, blue) VALUES (?1, ?2, ?3, ?4)",
            params![id, r, g, b],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO scenes_ledbars_leds (scene_id, ledbar_id, channel_num, value)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (num, value) in snapshot.bar.iter().enumerate() {
                if *value != 0 {
                    stmt.execute(params![id, BAR_ID, num as i64, value])?;
                }
            }
        }
        for (light, (on, brightness)) in snapshot.video.iter().enumerate() {
            tx.execute(
                "INSERT INTO scenes_videolights (scene_id, videolight_id, on_state, brightness)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, light as i64, on, brightness],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Load the slot; `None` means the slot is empty.
    pub fn load_scene(&self, id: i64) -> anyhow::Result<Option<SceneSnapshot>> {
        let conn = self.conn.lock();

        let strip = conn
            .query_row(
                "SELECT red, green, blue FROM scenes_ledstrips WHERE scene_id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let mut bar = [0u8; CHANNEL_COUNT];
        let mut bar_rows = 0usize;
        {
            let mut stmt = conn.prepare_cached(
                "SELECT channel_num, value FROM scenes_ledbars_leds
                 WHERE scene_id = ?1 AND ledbar_id = ?2",
            )?;
            let rows = stmt.query_map(params![id, BAR_ID], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, u8>(1)?))
            })?;
            for row in rows {
                let (num, value) = row?;
                if let Ok(idx) = usize::try_from(num) {
                    if idx < CHANNEL_COUNT {
                        bar[idx] = value;
                        bar_rows += 1;
                    }
                }
            }
        }

        let mut video = [(false, 0u8); 2];
        let mut video_rows = 0usize;
        {
            let mut stmt = conn.prepare_cached(
                "SELECT videolight_id, on_state, brightness FROM scenes_videolights
                 WHERE scene_id = ?1",
            )?;
            let rows = stmt.query_map(params![id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, bool>(1)?, row.get::<_, u8>(2)?))
            })?;
            for row in rows {
                let (light, on, brightness) = row?;
                if let Ok(idx) = usize::try_from(light) {
                    if idx < video.len() {
                        video[idx] = (on, brightness);
                        video_rows += 1;
                    }
                }
            }
        }

        if strip.is_none() && bar_rows == 0 && video_rows == 0 {
            return Ok(None);
        }
        Ok(Some(SceneSnapshot { strip: strip.unwrap_or((0, 0, 0)), bar, video }))
    }

    /// Empty the slot. The slot row itself stays; slots are fixed for life.
    pub fn delete_scene(&self, id: i64) -> anyhow::Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM scenes_ledstrips WHERE scene_id = ?1", params![id])?;
        tx.execute("DELETE FROM scenes_ledbars_leds WHERE scene_id = ?1", params![id])?;
        tx.execute("DELETE FROM scenes_videolights WHERE scene_id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }
}
