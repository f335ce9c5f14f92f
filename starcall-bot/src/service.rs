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

use std::{collections::HashSet, sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use starcall_common::{
    Membership, QueryFilter, Region, StarSize, TableError, TableState, format_results,
    is_known_world, query, render_all, render_chunk,
};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    chat::{ChatApi, ChatError},
    editor::{EditJob, EditQueue},
    report::{ReportEvent, Reporter},
    retry::RetryPolicy,
    store::{StoreError, TableStore},
};

const NO_STARS: &str = "No stars called.";
const PARTIAL_EDIT_NOTICE: &str = " Some table messages could not be updated.";

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rejected(#[from] TableError),
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected(rejection) => rejection.to_string(),
            Self::Chat(_) => "The chat platform rejected the request. Please try again.".to_string(),
            Self::Store(_) => "The table changed but could not be saved. Please tell a moderator.".to_string(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub guild_id: Option<u64>,
    // manage-messages or administrator
    pub can_override: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    User(Caller),
    Sweep,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub allowed_guilds: HashSet<u64>,
    pub chunk_edit_delay: Duration,
    pub restricted_cooldown: TimeDelta,
    pub retry: RetryPolicy,
}

pub struct TableService {
    store: Arc<TableStore>,
    chat: Arc<dyn ChatApi>,
    editor: EditQueue,
    settings: ServiceSettings,
    last_restricted_clear: Mutex<Option<DateTime<Utc>>>,
    reporter: Option<Reporter>,
}

impl TableService {
    pub fn new(
        store: Arc<TableStore>,
        chat: Arc<dyn ChatApi>,
        editor: EditQueue,
        settings: ServiceSettings,
        reporter: Option<Reporter>,
    ) -> Self {
        Self {
            store,
            chat,
            editor,
            settings,
            last_restricted_clear: Mutex::new(None),
            reporter,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &Arc<TableStore> {
        &self.store
    }

    pub fn report_failure(&self, command: &str, error: &dyn std::fmt::Display) {
        if let Some(reporter) = &self.reporter {
            reporter.report(ReportEvent::HandlerFailed {
                command: command.to_string(),
                error: error.to_string(),
            });
        }
    }

    fn authorize(&self, caller: &Caller) -> Result<(), TableError> {
        match caller.guild_id {
            Some(guild_id) if self.settings.allowed_guilds.contains(&guild_id) => Ok(()),
            _ => Err(TableError::GuildNotAllowed),
        }
    }

    pub async fn create(&self, caller: Caller, channel_id: u64) -> Result<String, ServiceError> {
        self.authorize(&caller)?;
        let mut table = self.store.lock().await;
        if table.exists() {
            return Err(TableError::TableExists.into());
        }

        let mut fresh = TableState::fresh(channel_id);
        let mut sent = Vec::new();
        for (chunk, content) in render_all(&fresh).iter().enumerate() {
            if chunk > 0 {
                tokio::time::sleep(self.settings.chunk_edit_delay).await;
            }
            let chat = self.chat.as_ref();
            let body = content.as_str();
            let result = self
                .settings
                .retry
                .run("send table chunk", move || chat.send_message(channel_id, body))
                .await;
            match result {
                Ok(message_id) => sent.push(message_id),
                Err(error) => {
                    warn!(channel_id, chunk, error = %error, "failed to post table chunk");
                    self.delete_messages(channel_id, &sent).await;
                    return Err(error.into());
                }
            }
        }

        fresh.attach_messages(sent);
        if let Err(error) = self.store.persist(&fresh).await {
            self.delete_messages(channel_id, &fresh.chunk_message_ids).await;
            return Err(error.into());
        }
        *table = fresh;
        info!(channel_id, chunks = table.chunk_count(), "star table created");
        Ok("Table created successfully!".to_string())
    }

    pub async fn call(
        &self,
        caller: Caller,
        world: u16,
        region: Region,
        size: StarSize,
        minutes: u32,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        known_world(world)?;
        let mut table = self.store.lock().await;
        ensure_table(&table)?;
        table.ensure_mutable(caller.can_override)?;
        let before = table.clone();
        let chunk = table.call(world, region, size, minutes, now)?;
        self.save_or_restore(&mut table, before).await?;

        let entry = table.entry(world)?.clone();
        match chunk_target(&table, chunk) {
            Some((channel_id, message_id)) => self.editor.enqueue(EditJob {
                channel_id,
                message_id,
                content: render_chunk(&table, chunk),
            }),
            None => warn!(world, chunk, "no message recorded for chunk"),
        }
        drop(table);

        info!(world, region = %region, size = %size, minutes, "star called");
        let expires_at = entry.game_time_full.unwrap_or(now);
        if let Some(reporter) = &self.reporter {
            reporter.report(ReportEvent::StarCalled {
                world,
                region,
                size,
                expires_at,
                guild_id: caller.guild_id,
            });
        }
        Ok(format!(
            "Called world {world}: {} {size}, ends {} (<t:{}:R>).",
            region.name(),
            entry.game_time.unwrap_or_default(),
            expires_at.timestamp()
        ))
    }

    pub async fn set_locked(&self, caller: Caller, locked: bool) -> Result<String, ServiceError> {
        self.authorize(&caller)?;
        let mut table = self.store.lock().await;
        ensure_table(&table)?;
        let before = table.clone();
        table.is_locked = locked;
        self.save_or_restore(&mut table, before).await?;
        info!(locked, "table lock changed");
        Ok(if locked {
            "Table locked.".to_string()
        } else {
            "Table unlocked.".to_string()
        })
    }

    pub async fn prune(&self, caller: Caller, world: u16) -> Result<String, ServiceError> {
        known_world(world)?;
        let mut table = self.store.lock().await;
        ensure_table(&table)?;
        table.ensure_mutable(caller.can_override)?;
        let before = table.clone();
        let chunk = table.prune(world)?;
        self.save_or_restore(&mut table, before).await?;
        let failed = self.edit_chunks_now(&table, &[chunk]).await;
        info!(world, "world pruned");
        Ok(with_edit_notice(format!("Cleared world {world}."), failed))
    }

    pub async fn clear(&self, caller: Caller) -> Result<String, ServiceError> {
        self.authorize(&caller)?;
        let mut table = self.store.lock().await;
        ensure_table(&table)?;
        table.ensure_mutable(caller.can_override)?;
        let before = table.clone();
        let touched = table.clear_all_entries();
        self.save_or_restore(&mut table, before).await?;
        let failed = self.edit_chunks_now(&table, &touched).await;
        info!(chunks = touched.len(), "table cleared");
        Ok(with_edit_notice("Table cleared.".to_string(), failed))
    }

    pub async fn clear_all(&self, caller: Caller) -> Result<String, ServiceError> {
        self.authorize(&caller)?;
        let mut table = self.store.lock().await;
        ensure_table(&table)?;
        table.ensure_mutable(caller.can_override)?;
        self.editor.flush().await;
        let empty = TableState::empty();
        self.store.persist(&empty).await?;
        let old = std::mem::replace(&mut *table, empty);
        if let Some(channel_id) = old.channel_id {
            self.delete_messages(channel_id, &old.chunk_message_ids).await;
        }
        info!("table reset");
        Ok("Table removed. Use `/create` to post a new one.".to_string())
    }

    pub async fn clear_old(&self, caller: Caller, now: DateTime<Utc>) -> Result<String, ServiceError> {
        self.authorize(&caller)?;
        let (cleared, failed) = self.clear_expired(caller.can_override, now).await?;
        Ok(with_edit_notice(cleared_message(cleared), failed))
    }

    /// Expired-entry clear open to everyone and to the sweep, limited by a
    /// shared cooldown.
    pub async fn clear_restricted(
        &self,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let mut last_run = self.last_restricted_clear.lock().await;
        if let Some(previous) = *last_run {
            let elapsed = now - previous;
            if elapsed < self.settings.restricted_cooldown {
                let remaining = self.settings.restricted_cooldown - elapsed;
                return Err(TableError::CoolingDown {
                    remaining_secs: remaining.num_seconds().max(1),
                }
                .into());
            }
        }

        let can_override = match trigger {
            Trigger::User(caller) => caller.can_override,
            Trigger::Sweep => false,
        };
        let (cleared, failed) = self.clear_expired(can_override, now).await?;
        *last_run = Some(now);
        Ok(with_edit_notice(cleared_message(cleared), failed))
    }

    async fn clear_expired(
        &self,
        can_override: bool,
        now: DateTime<Utc>,
    ) -> Result<(usize, usize), ServiceError> {
        let mut table = self.store.lock().await;
        ensure_table(&table)?;
        table.ensure_mutable(can_override)?;
        let expired = table
            .entries
            .iter()
            .filter(|entry| entry.is_expired(now))
            .count();
        let before = table.clone();
        let touched = table.clear_expired(now);
        if touched.is_empty() {
            return Ok((0, 0));
        }
        self.save_or_restore(&mut table, before).await?;
        let failed = self.edit_chunks_now(&table, &touched).await;
        info!(expired, chunks = touched.len(), "expired calls cleared");
        Ok((expired, failed))
    }

    pub async fn find(
        &self,
        membership: Option<Membership>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        let table = self.snapshot().await?;
        let hits = query::find_best(&table, membership, now);
        Ok(format_results(&title("Best stars", membership), &hits, NO_STARS))
    }

    pub async fn find_size(
        &self,
        size: StarSize,
        membership: Option<Membership>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        let table = self.snapshot().await?;
        let filter = QueryFilter {
            membership,
            size: Some(size),
            ..QueryFilter::default()
        };
        let hits = query::find_matching(&table, &filter, now);
        Ok(format_results(
            &title(&format!("Size {size} stars"), membership),
            &hits,
            NO_STARS,
        ))
    }

    pub async fn find_region(
        &self,
        region: Region,
        membership: Option<Membership>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        let table = self.snapshot().await?;
        let filter = QueryFilter {
            membership,
            region: Some(region),
            ..QueryFilter::default()
        };
        let hits = query::find_matching(&table, &filter, now);
        Ok(format_results(
            &title(&format!("Stars in {}", region.name()), membership),
            &hits,
            NO_STARS,
        ))
    }

    pub async fn find_world(&self, world: u16, now: DateTime<Utc>) -> Result<Vec<String>, ServiceError> {
        known_world(world)?;
        let table = self.snapshot().await?;
        let hits: Vec<_> = query::find_world(&table, world, now).into_iter().collect();
        Ok(format_results(
            &format!("World {world}"),
            &hits,
            &format!("No stars called for world {world}."),
        ))
    }

    pub async fn starstruck(
        &self,
        membership: Option<Membership>,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, ServiceError> {
        let table = self.snapshot().await?;
        let hits = query::starstruck(&table, membership, now);
        Ok(format_results(
            &title(
                &format!("Starstruck ({}+)", starcall_common::STARSTRUCK_MIN_SIZE),
                membership,
            ),
            &hits,
            NO_STARS,
        ))
    }

    /// Saves `table`, or puts `before` back if the write fails.
    async fn save_or_restore(
        &self,
        table: &mut TableState,
        before: TableState,
    ) -> Result<(), StoreError> {
        if let Err(error) = self.store.persist(table).await {
            warn!(error = %error, "failed to save table; change rolled back");
            *table = before;
            return Err(error);
        }
        Ok(())
    }

    async fn snapshot(&self) -> Result<TableState, ServiceError> {
        let table = self.store.snapshot().await;
        ensure_table(&table)?;
        Ok(table)
    }

    /// Edits the given chunks one by one with the fixed spacing between
    /// them. Queued edits are drained first so they cannot land afterwards
    /// with older content. Returns the number of chunks that failed.
    async fn edit_chunks_now(&self, table: &TableState, chunks: &[usize]) -> usize {
        self.editor.flush().await;
        let mut failed = 0;
        for (position, &chunk) in chunks.iter().enumerate() {
            if position > 0 {
                tokio::time::sleep(self.settings.chunk_edit_delay).await;
            }
            let Some((channel_id, message_id)) = chunk_target(table, chunk) else {
                warn!(chunk, "no message recorded for chunk");
                failed += 1;
                continue;
            };
            let content = render_chunk(table, chunk);
            let chat = self.chat.as_ref();
            let body = content.as_str();
            let result = self
                .settings
                .retry
                .run("edit table chunk", move || {
                    chat.edit_message(channel_id, message_id, body)
                })
                .await;
            if let Err(error) = result {
                warn!(chunk, message_id, error = %error, "failed to edit table chunk");
                failed += 1;
            }
        }
        failed
    }

    async fn delete_messages(&self, channel_id: u64, message_ids: &[u64]) {
        for &message_id in message_ids {
            let chat = self.chat.as_ref();
            let result = self
                .settings
                .retry
                .run("delete table chunk", move || {
                    chat.delete_message(channel_id, message_id)
                })
                .await;
            match result {
                Ok(()) | Err(ChatError::NotFound) => {}
                Err(error) => {
                    warn!(channel_id, message_id, error = %error, "failed to delete table chunk")
                }
            }
        }
    }
}

fn ensure_table(table: &TableState) -> Result<(), TableError> {
    if table.exists() {
        Ok(())
    } else {
        Err(TableError::NoTable)
    }
}

fn known_world(world: u16) -> Result<(), TableError> {
    if is_known_world(world) {
        Ok(())
    } else {
        Err(TableError::UnknownWorld(world))
    }
}

fn chunk_target(table: &TableState, chunk: usize) -> Option<(u64, u64)> {
    Some((table.channel_id?, table.chunk_message_id(chunk)?))
}

fn with_edit_notice(message: String, failed: usize) -> String {
    if failed == 0 {
        message
    } else {
        format!("{message}{PARTIAL_EDIT_NOTICE}")
    }
}

fn cleared_message(cleared: usize) -> String {
    match cleared {
        0 => "No expired calls to clear.".to_string(),
        1 => "Cleared 1 expired call.".to_string(),
        n => format!("Cleared {n} expired calls."),
    }
}

fn title(base: &str, membership: Option<Membership>) -> String {
    match membership {
        Some(Membership::FreeToPlay) => format!("{base} (F2P)"),
        Some(Membership::Members) => format!("{base} (members)"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::RecordingChat;
    use chrono::TimeZone;
    use starcall_common::{CHUNK_SIZE, WORLDS, worlds::world_index};
    use tempfile::TempDir;

    const GUILD: u64 = 4242;
    const CHANNEL: u64 = 31;

    struct Harness {
        dir: TempDir,
        chat: Arc<RecordingChat>,
        service: TableService,
    }

    fn settings() -> ServiceSettings {
        ServiceSettings {
            allowed_guilds: HashSet::from([GUILD]),
            chunk_edit_delay: Duration::ZERO,
            restricted_cooldown: TimeDelta::minutes(10),
            retry: RetryPolicy {
                max_attempts: 3,
                initial_backoff: Duration::from_millis(1),
                max_backoff: Duration::from_millis(2),
            },
        }
    }

    async fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            TableStore::load(dir.path().join("table_data.json"))
                .await
                .unwrap(),
        );
        let chat = Arc::new(RecordingChat::default());
        let settings = settings();
        let editor = EditQueue::spawn(chat.clone(), settings.retry.clone(), Duration::ZERO);
        let service = TableService::new(store, chat.clone(), editor, settings, None);
        Harness {
            dir,
            chat,
            service,
        }
    }

    async fn created() -> Harness {
        let harness = harness().await;
        harness.service.create(moderator(), CHANNEL).await.unwrap();
        harness
    }

    fn member() -> Caller {
        Caller {
            guild_id: Some(GUILD),
            can_override: false,
        }
    }

    fn moderator() -> Caller {
        Caller {
            guild_id: Some(GUILD),
            can_override: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 9, 16, 0, 0).unwrap()
    }

    fn chunk_message(harness: &Harness, world: u16) -> u64 {
        harness.chat.sent_ids()[world_index(world).unwrap() / CHUNK_SIZE]
    }

    #[tokio::test]
    async fn create_posts_aligned_table_once() {
        let harness = created().await;
        let table = harness.service.store().snapshot().await;
        assert!(table.exists());
        for (entry, world) in table.entries.iter().zip(WORLDS.iter()) {
            assert_eq!(entry.world, world.id);
        }
        assert_eq!(table.chunk_message_ids, harness.chat.sent_ids());
        assert_eq!(table.chunk_message_ids.len(), table.chunk_count());
        assert_eq!(table.channel_id, Some(CHANNEL));

        let again = harness.service.create(moderator(), CHANNEL).await;
        assert!(matches!(
            again,
            Err(ServiceError::Rejected(TableError::TableExists))
        ));
        assert_eq!(harness.chat.sent_ids().len(), table.chunk_count());
    }

    #[tokio::test]
    async fn gated_commands_require_allowed_guild() {
        let harness = harness().await;
        let stranger = Caller {
            guild_id: Some(1),
            can_override: true,
        };
        let result = harness.service.create(stranger, CHANNEL).await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(TableError::GuildNotAllowed))
        ));
        assert!(harness.chat.sent_ids().is_empty());
    }

    #[tokio::test]
    async fn commands_without_table_are_rejected() {
        let harness = harness().await;
        let call = harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S5, 10, now())
            .await;
        assert!(matches!(call, Err(ServiceError::Rejected(TableError::NoTable))));
        let find = harness.service.find(None, now()).await;
        assert!(matches!(find, Err(ServiceError::Rejected(TableError::NoTable))));
    }

    #[tokio::test]
    async fn call_then_find_size_shows_world() {
        let harness = created().await;
        let reply = harness
            .service
            .call(member(), 48, Region::Wilderness, StarSize::S8, 17, now())
            .await
            .unwrap();
        assert!(reply.starts_with("Called world 48: Wilderness s8, ends 16:17"));

        let pages = harness
            .service
            .find_size(StarSize::S8, None, now())
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].contains("**W48**"));
        assert!(pages[0].contains("[Wilderness]"));
        let expected = now() + TimeDelta::minutes(17);
        assert!(pages[0].contains(&format!("<t:{}:R>", expected.timestamp())));
    }

    #[tokio::test]
    async fn call_edits_its_chunk_through_the_queue() {
        let harness = created().await;
        harness
            .service
            .call(member(), 259, Region::Varlamore, StarSize::S2, 5, now())
            .await
            .unwrap();
        harness.service.editor.flush().await;

        let edits = harness.chat.edits();
        assert_eq!(edits.len(), 1);
        let (channel, message, content) = &edits[0];
        assert_eq!(*channel, CHANNEL);
        assert_eq!(*message, chunk_message(&harness, 259));
        assert!(content.contains("Varlamore"));
    }

    #[tokio::test]
    async fn call_rejects_unknown_world_without_change() {
        let harness = created().await;
        let before = harness.service.store().snapshot().await;
        let result = harness
            .service
            .call(member(), 13, Region::Asgarnia, StarSize::S1, 5, now())
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(TableError::UnknownWorld(13)))
        ));
        assert_eq!(harness.service.store().snapshot().await, before);
    }

    #[tokio::test]
    async fn locked_table_rejects_member_mutations() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Kandarin, StarSize::S4, 30, now())
            .await
            .unwrap();
        harness.service.set_locked(moderator(), true).await.unwrap();
        let before = harness.service.store().snapshot().await.entries;

        let call = harness
            .service
            .call(member(), 2, Region::Kandarin, StarSize::S4, 30, now())
            .await;
        let prune = harness.service.prune(member(), 1).await;
        let clear = harness.service.clear(member()).await;
        for result in [call, prune, clear] {
            assert!(matches!(result, Err(ServiceError::Rejected(TableError::Locked))));
        }
        assert_eq!(harness.service.store().snapshot().await.entries, before);

        harness
            .service
            .call(moderator(), 2, Region::Kandarin, StarSize::S4, 30, now())
            .await
            .unwrap();
        harness.service.set_locked(moderator(), false).await.unwrap();
        harness.service.prune(member(), 2).await.unwrap();
    }

    #[tokio::test]
    async fn prune_then_find_world_reports_nothing() {
        let harness = created().await;
        harness
            .service
            .call(member(), 7, Region::Misthalin, StarSize::S3, 20, now())
            .await
            .unwrap();
        let reply = harness.service.prune(member(), 7).await.unwrap();
        assert_eq!(reply, "Cleared world 7.");

        let pages = harness.service.find_world(7, now()).await.unwrap();
        assert_eq!(pages, vec!["**World 7**\nNo stars called for world 7.".to_string()]);
        let last_edit = harness.chat.edits().pop().unwrap();
        assert_eq!(last_edit.1, chunk_message(&harness, 7));
        assert!(!last_edit.2.contains("Misthalin"));
    }

    #[tokio::test]
    async fn find_world_rejects_unknown_world() {
        let harness = created().await;
        let result = harness.service.find_world(999, now()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Rejected(TableError::UnknownWorld(999)))
        ));
    }

    #[tokio::test]
    async fn clear_old_only_resets_expired_rows() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        harness
            .service
            .call(member(), 259, Region::Asgarnia, StarSize::S9, 90, now())
            .await
            .unwrap();
        let later = now() + TimeDelta::minutes(30);
        let reply = harness.service.clear_old(moderator(), later).await.unwrap();
        assert_eq!(reply, "Cleared 1 expired call.");

        let table = harness.service.store().snapshot().await;
        assert!(table.entry(1).unwrap().is_empty());
        assert!(!table.entry(259).unwrap().is_empty());
    }

    #[tokio::test]
    async fn clear_restricted_enforces_cooldown() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        let first_run = now() + TimeDelta::minutes(6);
        let first = harness
            .service
            .clear_restricted(Trigger::User(member()), first_run)
            .await
            .unwrap();
        assert_eq!(first, "Cleared 1 expired call.");

        harness
            .service
            .call(member(), 2, Region::Asgarnia, StarSize::S4, 1, first_run)
            .await
            .unwrap();
        let before = harness.service.store().snapshot().await;
        let second = harness
            .service
            .clear_restricted(Trigger::Sweep, first_run + TimeDelta::minutes(4))
            .await;
        match second {
            Err(ServiceError::Rejected(TableError::CoolingDown { remaining_secs })) => {
                assert_eq!(remaining_secs, 360)
            }
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert_eq!(harness.service.store().snapshot().await, before);

        let third = harness
            .service
            .clear_restricted(Trigger::Sweep, first_run + TimeDelta::minutes(11))
            .await
            .unwrap();
        assert_eq!(third, "Cleared 1 expired call.");
    }

    #[tokio::test]
    async fn sweep_leaves_locked_table_alone() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        harness.service.set_locked(moderator(), true).await.unwrap();
        let later = now() + TimeDelta::minutes(10);
        let result = harness.service.clear_restricted(Trigger::Sweep, later).await;
        assert!(matches!(result, Err(ServiceError::Rejected(TableError::Locked))));
        assert!(!harness.service.store().snapshot().await.entry(1).unwrap().is_empty());

        let retry = harness
            .service
            .clear_restricted(Trigger::User(moderator()), later)
            .await
            .unwrap();
        assert_eq!(retry, "Cleared 1 expired call.");
    }

    #[tokio::test]
    async fn clear_all_removes_messages_and_allows_recreate() {
        let harness = created().await;
        let posted = harness.chat.sent_ids();
        harness.service.clear_all(moderator()).await.unwrap();

        assert_eq!(harness.chat.deleted_ids(), posted);
        assert!(!harness.service.store().snapshot().await.exists());

        harness.service.create(moderator(), CHANNEL).await.unwrap();
        assert!(harness.service.store().snapshot().await.exists());
    }

    #[tokio::test]
    async fn clear_retries_rate_limited_chunk_edit() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        harness.service.editor.flush().await;
        harness
            .chat
            .fail_next_edits([ChatError::RateLimited { retry_after: None }]);

        let reply = harness.service.clear(moderator()).await.unwrap();
        assert_eq!(reply, "Table cleared.");
        let last = harness.chat.edits().pop().unwrap();
        assert_eq!(last.1, chunk_message(&harness, 1));
    }

    #[tokio::test]
    async fn failed_chunk_edit_is_reported_to_user() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        harness.service.editor.flush().await;
        harness.chat.fail_next_edits([ChatError::NotFound]);
        let reply = harness.service.prune(member(), 1).await.unwrap();
        assert_eq!(reply, format!("Cleared world 1.{PARTIAL_EDIT_NOTICE}"));
    }

    #[tokio::test]
    async fn starstruck_and_f2p_queries() {
        let harness = created().await;
        for (world, size) in [(1, StarSize::S9), (3, StarSize::S6), (8, StarSize::S2)] {
            harness
                .service
                .call(member(), world, Region::Morytania, size, 30, now())
                .await
                .unwrap();
        }
        let all = harness.service.starstruck(None, now()).await.unwrap();
        assert!(all[0].starts_with("**Starstruck (s6+)**"));
        assert!(all[0].contains("**W1**") && all[0].contains("**W3**"));
        assert!(!all[0].contains("**W8**"));

        let f2p = harness
            .service
            .find(Some(Membership::FreeToPlay), now())
            .await
            .unwrap();
        assert!(f2p[0].starts_with("**Best stars (F2P)**"));
        assert!(f2p[0].contains("**W3**") && !f2p[0].contains("**W1**"));

        let region = harness
            .service
            .find_region(Region::Morytania, Some(Membership::FreeToPlay), now())
            .await
            .unwrap();
        assert!(region[0].contains("**W3**") && region[0].contains("**W8**"));
    }

    #[tokio::test]
    async fn mutations_are_persisted() {
        let harness = created().await;
        harness
            .service
            .call(member(), 100, Region::Tirannwn, StarSize::S5, 12, now())
            .await
            .unwrap();
        let path = harness.service.store().path().to_path_buf();
        let reloaded = TableStore::load(path).await.unwrap();
        assert_eq!(
            reloaded.snapshot().await,
            harness.service.store().snapshot().await
        );
    }

    fn block_state_writes(harness: &Harness) -> std::path::PathBuf {
        let tmp = harness.dir.path().join("table_data.json.tmp");
        std::fs::create_dir(&tmp).unwrap();
        tmp
    }

    #[tokio::test]
    async fn create_removes_posted_chunks_when_a_send_fails() {
        let harness = harness().await;
        harness
            .chat
            .fail_next_sends([None, None, Some(ChatError::Other("missing access".into()))]);

        let result = harness.service.create(moderator(), CHANNEL).await;
        assert!(matches!(result, Err(ServiceError::Chat(ChatError::Other(_)))));
        let posted = harness.chat.sent_ids();
        assert_eq!(posted.len(), 2);
        assert_eq!(harness.chat.deleted_ids(), posted);
        assert!(!harness.service.store().snapshot().await.exists());
        assert!(!harness.dir.path().join("table_data.json").exists());
    }

    #[tokio::test]
    async fn create_removes_posted_chunks_when_save_fails() {
        let harness = harness().await;
        block_state_writes(&harness);

        let result = harness.service.create(moderator(), CHANNEL).await;
        assert!(matches!(result, Err(ServiceError::Store(_))));
        let posted = harness.chat.sent_ids();
        assert_eq!(posted.len(), TableState::fresh(CHANNEL).chunk_count());
        assert_eq!(harness.chat.deleted_ids(), posted);
        assert!(!harness.service.store().snapshot().await.exists());
    }

    #[tokio::test]
    async fn failed_save_rolls_back_call() {
        let harness = created().await;
        harness.service.editor.flush().await;
        let before = harness.service.store().snapshot().await;
        let blocked = block_state_writes(&harness);

        let result = harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await;
        assert!(matches!(result, Err(ServiceError::Store(_))));
        assert_eq!(harness.service.store().snapshot().await, before);
        harness.service.editor.flush().await;
        assert!(harness.chat.edits().is_empty());
        let pages = harness.service.find_world(1, now()).await.unwrap();
        assert!(pages[0].contains("No stars called for world 1."));

        std::fs::remove_dir(&blocked).unwrap();
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        assert!(!harness.service.store().snapshot().await.entry(1).unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_save_rolls_back_lock_and_clear() {
        let harness = created().await;
        harness
            .service
            .call(member(), 1, Region::Asgarnia, StarSize::S4, 5, now())
            .await
            .unwrap();
        harness.service.editor.flush().await;
        let before = harness.service.store().snapshot().await;
        let edits = harness.chat.edits().len();
        block_state_writes(&harness);

        let locked = harness.service.set_locked(moderator(), true).await;
        assert!(matches!(locked, Err(ServiceError::Store(_))));
        let cleared = harness.service.clear(moderator()).await;
        assert!(matches!(cleared, Err(ServiceError::Store(_))));
        let pruned = harness.service.prune(member(), 1).await;
        assert!(matches!(pruned, Err(ServiceError::Store(_))));

        assert_eq!(harness.service.store().snapshot().await, before);
        assert_eq!(harness.chat.edits().len(), edits);
    }

    #[tokio::test]
    async fn clear_all_on_locked_table_needs_override() {
        let harness = created().await;
        harness.service.set_locked(moderator(), true).await.unwrap();
        let result = harness.service.clear_all(member()).await;
        assert!(matches!(result, Err(ServiceError::Rejected(TableError::Locked))));
        assert!(harness.chat.deleted_ids().is_empty());
        assert!(harness.service.store().snapshot().await.exists());
    }
}
