// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::collections::BTreeSet;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    model::{Region, StarSize},
    worlds::{WORLDS, world_index},
};

pub const CHUNK_SIZE: usize = 32;
pub const SCHEMA_VERSION: u32 = 2;
pub const GAME_TIME_FORMAT: &str = "%H:%M";

/// Rejections a user can trigger. Each renders as a reply, never as a crash.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("No table exists yet. Use `/create` first.")]
    NoTable,
    #[error("A table already exists. Use `/clear-all` to reset it.")]
    TableExists,
    #[error("The table is locked. Ask a moderator to `/unlock` it.")]
    Locked,
    #[error("World {0} is not on the world list.")]
    UnknownWorld(u16),
    #[error("This server is not allowed to manage the star table.")]
    GuildNotAllowed,
    #[error("The table was cleared recently. Try again in {}.", format_wait(*remaining_secs))]
    CoolingDown { remaining_secs: i64 },
}

/// Persisted state that does not line up with the current world list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state schema version {found} does not match expected {expected}")]
    SchemaVersion { found: u32, expected: u32 },
    #[error("state has {found} entries, expected {expected}")]
    EntryCount { found: usize, expected: usize },
    #[error("entry {index} is world {found}, expected world {expected}")]
    Misaligned { index: usize, found: u16, expected: u16 },
    #[error("state has {found} chunk messages, expected {expected}")]
    ChunkCount { found: usize, expected: usize },
}

pub fn format_wait(seconds: i64) -> String {
    let seconds = seconds.max(0);
    match (seconds / 60, seconds % 60) {
        (0, secs) => format!("{secs}s"),
        (mins, 0) => format!("{mins}m"),
        (mins, secs) => format!("{mins}m {secs}s"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub world: u16,
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub size: Option<StarSize>,
    #[serde(default)]
    pub game_time: Option<String>,
    #[serde(default)]
    pub game_time_full: Option<DateTime<Utc>>,
}

impl TableEntry {
    pub fn empty(world: u16) -> Self {
        Self {
            world,
            region: None,
            size: None,
            game_time: None,
            game_time_full: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_none()
            && self.size.is_none()
            && self.game_time.is_none()
            && self.game_time_full.is_none()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.game_time_full.is_some_and(|expires| expires <= now)
    }

    fn reset(&mut self) -> bool {
        let changed = !self.is_empty();
        *self = Self::empty(self.world);
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableState {
    /// Missing in documents written before versioning, which then fail validation.
    #[serde(default)]
    pub schema_version: u32,
    pub is_locked: bool,
    pub entries: Vec<TableEntry>,
    pub message_id: Option<u64>,
    pub channel_id: Option<u64>,
    #[serde(default)]
    pub chunk_message_ids: Vec<u64>,
}

impl Default for TableState {
    fn default() -> Self {
        Self::empty()
    }
}

impl TableState {
    pub fn empty() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            is_locked: false,
            entries: Vec::new(),
            message_id: None,
            channel_id: None,
            chunk_message_ids: Vec::new(),
        }
    }

    pub fn exists(&self) -> bool {
        self.message_id.is_some()
    }

    pub fn fresh(channel_id: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            is_locked: false,
            entries: WORLDS.iter().map(|world| TableEntry::empty(world.id)).collect(),
            message_id: None,
            channel_id: Some(channel_id),
            chunk_message_ids: Vec::new(),
        }
    }

    pub fn attach_messages(&mut self, chunk_message_ids: Vec<u64>) {
        self.message_id = chunk_message_ids.first().copied();
        self.chunk_message_ids = chunk_message_ids;
    }

    pub fn chunk_count(&self) -> usize {
        self.entries.len().div_ceil(CHUNK_SIZE)
    }

    pub fn chunk_of(index: usize) -> usize {
        index / CHUNK_SIZE
    }

    pub fn chunk_rows(&self, chunk: usize) -> &[TableEntry] {
        let start = (chunk * CHUNK_SIZE).min(self.entries.len());
        let end = (start + CHUNK_SIZE).min(self.entries.len());
        &self.entries[start..end]
    }

    pub fn chunk_message_id(&self, chunk: usize) -> Option<u64> {
        self.chunk_message_ids.get(chunk).copied()
    }

    pub fn entry(&self, world: u16) -> Result<&TableEntry, TableError> {
        let index = world_index(world).ok_or(TableError::UnknownWorld(world))?;
        self.entries
            .get(index)
            .ok_or(TableError::UnknownWorld(world))
    }

    fn entry_mut(&mut self, world: u16) -> Result<(usize, &mut TableEntry), TableError> {
        let index = world_index(world).ok_or(TableError::UnknownWorld(world))?;
        self.entries
            .get_mut(index)
            .map(|entry| (index, entry))
            .ok_or(TableError::UnknownWorld(world))
    }

    pub fn ensure_mutable(&self, can_override: bool) -> Result<(), TableError> {
        if self.is_locked && !can_override {
            return Err(TableError::Locked);
        }
        Ok(())
    }

    /// Records a star call and returns the chunk that needs re-rendering.
    pub fn call(
        &mut self,
        world: u16,
        region: Region,
        size: StarSize,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<usize, TableError> {
        let expires = expiry_time(now, minutes);
        let (index, entry) = self.entry_mut(world)?;
        entry.region = Some(region);
        entry.size = Some(size);
        entry.game_time = Some(expires.format(GAME_TIME_FORMAT).to_string());
        entry.game_time_full = Some(expires);
        Ok(Self::chunk_of(index))
    }

    pub fn prune(&mut self, world: u16) -> Result<usize, TableError> {
        let (index, entry) = self.entry_mut(world)?;
        entry.reset();
        Ok(Self::chunk_of(index))
    }

    pub fn clear_all_entries(&mut self) -> Vec<usize> {
        self.reset_where(|_| true)
    }

    /// Resets rows whose expiry is at or before `now`.
    pub fn clear_expired(&mut self, now: DateTime<Utc>) -> Vec<usize> {
        self.reset_where(|entry| entry.is_expired(now))
    }

    fn reset_where(&mut self, mut predicate: impl FnMut(&TableEntry) -> bool) -> Vec<usize> {
        let mut touched = BTreeSet::new();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if predicate(entry) && entry.reset() {
                touched.insert(Self::chunk_of(index));
            }
        }
        touched.into_iter().collect()
    }

    pub fn validate(&self) -> Result<(), StateError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(StateError::SchemaVersion {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        let expects_rows = self.exists() || !self.entries.is_empty();
        if expects_rows && self.entries.len() != WORLDS.len() {
            return Err(StateError::EntryCount {
                found: self.entries.len(),
                expected: WORLDS.len(),
            });
        }
        for (index, (entry, world)) in self.entries.iter().zip(WORLDS.iter()).enumerate() {
            if entry.world != world.id {
                return Err(StateError::Misaligned {
                    index,
                    found: entry.world,
                    expected: world.id,
                });
            }
        }
        if self.message_id.is_some() && self.chunk_message_ids.len() != self.chunk_count() {
            return Err(StateError::ChunkCount {
                found: self.chunk_message_ids.len(),
                expected: self.chunk_count(),
            });
        }
        Ok(())
    }
}

/// `now + minutes`, rounded to the nearest minute.
pub fn expiry_time(now: DateTime<Utc>, minutes: u32) -> DateTime<Utc> {
    let raw = now + TimeDelta::minutes(i64::from(minutes));
    raw.duration_round(TimeDelta::minutes(1)).unwrap_or(raw)
}
