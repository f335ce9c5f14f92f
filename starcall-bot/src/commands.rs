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

use std::sync::Arc;

use chrono::Utc;
use poise::{CreateReply, serenity_prelude as serenity};
use starcall_common::{Membership, Region, StarSize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::service::{Caller, ServiceError, TableService, Trigger};

pub struct Data {
    pub service: Arc<TableService>,
}

pub type Context<'a> = poise::Context<'a, Data, CommandError>;
type CommandResult = Result<(), CommandError>;

const QUERY_CATEGORY: &str = "Queries";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Discord(#[from] serenity::Error),
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RegionChoice {
    Asgarnia,
    #[name = "Crandor/Karamja"]
    CrandorKaramja,
    #[name = "Feldip Hills/Isle of Souls"]
    FeldipHills,
    #[name = "Fossil Island/Mos Le'Harmless"]
    FossilIsland,
    #[name = "Fremennik Lands/Lunar Isle"]
    Fremennik,
    Kandarin,
    #[name = "Kebos Lands"]
    KebosLands,
    #[name = "Kharidian Desert"]
    KharidianDesert,
    Misthalin,
    Morytania,
    #[name = "Piscatoris/Gnome Stronghold"]
    Piscatoris,
    Tirannwn,
    Wilderness,
    Varlamore,
}

impl From<RegionChoice> for Region {
    fn from(choice: RegionChoice) -> Self {
        match choice {
            RegionChoice::Asgarnia => Region::Asgarnia,
            RegionChoice::CrandorKaramja => Region::CrandorKaramja,
            RegionChoice::FeldipHills => Region::FeldipHills,
            RegionChoice::FossilIsland => Region::FossilIsland,
            RegionChoice::Fremennik => Region::Fremennik,
            RegionChoice::Kandarin => Region::Kandarin,
            RegionChoice::KebosLands => Region::KebosLands,
            RegionChoice::KharidianDesert => Region::KharidianDesert,
            RegionChoice::Misthalin => Region::Misthalin,
            RegionChoice::Morytania => Region::Morytania,
            RegionChoice::Piscatoris => Region::Piscatoris,
            RegionChoice::Tirannwn => Region::Tirannwn,
            RegionChoice::Wilderness => Region::Wilderness,
            RegionChoice::Varlamore => Region::Varlamore,
        }
    }
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum SizeChoice {
    #[name = "s1"]
    S1,
    #[name = "s2"]
    S2,
    #[name = "s3"]
    S3,
    #[name = "s4"]
    S4,
    #[name = "s5"]
    S5,
    #[name = "s6"]
    S6,
    #[name = "s7"]
    S7,
    #[name = "s8"]
    S8,
    #[name = "s9"]
    S9,
    #[name = "s10"]
    S10,
}

impl From<SizeChoice> for StarSize {
    fn from(choice: SizeChoice) -> Self {
        match choice {
            SizeChoice::S1 => StarSize::S1,
            SizeChoice::S2 => StarSize::S2,
            SizeChoice::S3 => StarSize::S3,
            SizeChoice::S4 => StarSize::S4,
            SizeChoice::S5 => StarSize::S5,
            SizeChoice::S6 => StarSize::S6,
            SizeChoice::S7 => StarSize::S7,
            SizeChoice::S8 => StarSize::S8,
            SizeChoice::S9 => StarSize::S9,
            SizeChoice::S10 => StarSize::S10,
        }
    }
}

pub fn all() -> Vec<poise::Command<Data, CommandError>> {
    vec![
        create(),
        call(),
        lock(),
        unlock(),
        clear(),
        clear_all(),
        clear_old(),
        clear_restricted(),
        prune(),
        find(),
        find_size(),
        find_region(),
        find_world(),
        find_f2p(),
        find_size_f2p(),
        find_region_f2p(),
        starstruck(),
        starstruck_f2p(),
    ]
}

async fn caller(ctx: Context<'_>) -> Caller {
    let can_override = ctx
        .author_member()
        .await
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.administrator() || permissions.manage_messages());
    Caller {
        guild_id: ctx.guild_id().map(|id| id.get()),
        can_override,
    }
}

fn replies_publicly(command: &poise::Command<Data, CommandError>) -> bool {
    command.category.as_deref() == Some(QUERY_CATEGORY)
}

/// Acknowledges the interaction before the handler waits on the table.
/// Queries are answered publicly, everything else privately.
async fn acknowledge(ctx: Context<'_>) -> CommandResult {
    if replies_publicly(ctx.command()) {
        ctx.defer().await?;
    } else {
        ctx.defer_ephemeral().await?;
    }
    Ok(())
}

async fn reply_private(ctx: Context<'_>, content: impl Into<String>) -> CommandResult {
    ctx.send(CreateReply::default().content(content).ephemeral(true))
        .await?;
    Ok(())
}

async fn reply_pages(ctx: Context<'_>, pages: Vec<String>) -> CommandResult {
    for page in pages {
        ctx.say(page).await?;
    }
    Ok(())
}

/// Post a new star table in this channel
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    category = "Table"
)]
pub async fn create(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx
        .data()
        .service
        .create(caller, ctx.channel_id().get())
        .await?;
    reply_private(ctx, outcome).await
}

/// Call a star on the table
#[poise::command(slash_command, guild_only, category = "Table")]
pub async fn call(
    ctx: Context<'_>,
    #[description = "World number"] world: u16,
    #[description = "Region the star landed in"] region: RegionChoice,
    #[description = "Star size"] size: SizeChoice,
    #[description = "Minutes until the star is depleted"]
    #[min = 0]
    #[max = 240]
    minutes: u32,
) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx
        .data()
        .service
        .call(caller, world, region.into(), size.into(), minutes, Utc::now())
        .await?;
    reply_private(ctx, outcome).await
}

/// Lock the table so only moderators can change it
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    category = "Table"
)]
pub async fn lock(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx.data().service.set_locked(caller, true).await?;
    reply_private(ctx, outcome).await
}

/// Unlock the table
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    category = "Table"
)]
pub async fn unlock(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx.data().service.set_locked(caller, false).await?;
    reply_private(ctx, outcome).await
}

/// Empty every row of the table
#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "ADMINISTRATOR",
    category = "Table"
)]
pub async fn clear(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx.data().service.clear(caller).await?;
    reply_private(ctx, outcome).await
}

/// Delete the table messages and forget the table
#[poise::command(
    slash_command,
    guild_only,
    rename = "clear-all",
    default_member_permissions = "ADMINISTRATOR",
    category = "Table"
)]
pub async fn clear_all(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx.data().service.clear_all(caller).await?;
    reply_private(ctx, outcome).await
}

/// Remove calls whose star has already depleted
#[poise::command(
    slash_command,
    guild_only,
    rename = "clear-old",
    default_member_permissions = "ADMINISTRATOR",
    category = "Table"
)]
pub async fn clear_old(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx.data().service.clear_old(caller, Utc::now()).await?;
    reply_private(ctx, outcome).await
}

/// Remove depleted calls (limited to once per cooldown window)
#[poise::command(slash_command, guild_only, rename = "clear-restricted", category = "Table")]
pub async fn clear_restricted(ctx: Context<'_>) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx
        .data()
        .service
        .clear_restricted(Trigger::User(caller), Utc::now())
        .await?;
    reply_private(ctx, outcome).await
}

/// Clear a single world from the table
#[poise::command(slash_command, guild_only, category = "Table")]
pub async fn prune(
    ctx: Context<'_>,
    #[description = "World number"] world: u16,
) -> CommandResult {
    acknowledge(ctx).await?;
    let caller = caller(ctx).await;
    let outcome = ctx.data().service.prune(caller, world).await?;
    reply_private(ctx, outcome).await
}

async fn run_find(ctx: Context<'_>, membership: Option<Membership>) -> CommandResult {
    acknowledge(ctx).await?;
    let pages = ctx.data().service.find(membership, Utc::now()).await?;
    reply_pages(ctx, pages).await
}

async fn run_find_size(
    ctx: Context<'_>,
    size: SizeChoice,
    membership: Option<Membership>,
) -> CommandResult {
    acknowledge(ctx).await?;
    let pages = ctx
        .data()
        .service
        .find_size(size.into(), membership, Utc::now())
        .await?;
    reply_pages(ctx, pages).await
}

async fn run_find_region(
    ctx: Context<'_>,
    region: RegionChoice,
    membership: Option<Membership>,
) -> CommandResult {
    acknowledge(ctx).await?;
    let pages = ctx
        .data()
        .service
        .find_region(region.into(), membership, Utc::now())
        .await?;
    reply_pages(ctx, pages).await
}

async fn run_starstruck(ctx: Context<'_>, membership: Option<Membership>) -> CommandResult {
    acknowledge(ctx).await?;
    let pages = ctx.data().service.starstruck(membership, Utc::now()).await?;
    reply_pages(ctx, pages).await
}

/// Show the biggest active stars
#[poise::command(slash_command, guild_only, category = "Queries")]
pub async fn find(ctx: Context<'_>) -> CommandResult {
    run_find(ctx, None).await
}

/// Show the biggest active stars on free-to-play worlds
#[poise::command(slash_command, guild_only, rename = "find-f2p", category = "Queries")]
pub async fn find_f2p(ctx: Context<'_>) -> CommandResult {
    run_find(ctx, Some(Membership::FreeToPlay)).await
}

/// Show active stars of one size
#[poise::command(slash_command, guild_only, rename = "find-size", category = "Queries")]
pub async fn find_size(
    ctx: Context<'_>,
    #[description = "Star size"] size: SizeChoice,
) -> CommandResult {
    run_find_size(ctx, size, None).await
}

/// Show active stars of one size on free-to-play worlds
#[poise::command(slash_command, guild_only, rename = "find-size-f2p", category = "Queries")]
pub async fn find_size_f2p(
    ctx: Context<'_>,
    #[description = "Star size"] size: SizeChoice,
) -> CommandResult {
    run_find_size(ctx, size, Some(Membership::FreeToPlay)).await
}

/// Show active stars in one region
#[poise::command(slash_command, guild_only, rename = "find-region", category = "Queries")]
pub async fn find_region(
    ctx: Context<'_>,
    #[description = "Region"] region: RegionChoice,
) -> CommandResult {
    run_find_region(ctx, region, None).await
}

/// Show active stars in one region on free-to-play worlds
#[poise::command(
    slash_command,
    guild_only,
    rename = "find-region-f2p",
    category = "Queries"
)]
pub async fn find_region_f2p(
    ctx: Context<'_>,
    #[description = "Region"] region: RegionChoice,
) -> CommandResult {
    run_find_region(ctx, region, Some(Membership::FreeToPlay)).await
}

/// Show the call for one world
#[poise::command(slash_command, guild_only, rename = "find-world", category = "Queries")]
pub async fn find_world(
    ctx: Context<'_>,
    #[description = "World number"] world: u16,
) -> CommandResult {
    acknowledge(ctx).await?;
    let pages = ctx.data().service.find_world(world, Utc::now()).await?;
    reply_pages(ctx, pages).await
}

/// Show active stars big enough for the starstruck achievement
#[poise::command(slash_command, guild_only, category = "Queries")]
pub async fn starstruck(ctx: Context<'_>) -> CommandResult {
    run_starstruck(ctx, None).await
}

/// Show starstruck-sized stars on free-to-play worlds
#[poise::command(slash_command, guild_only, rename = "starstruck-f2p", category = "Queries")]
pub async fn starstruck_f2p(ctx: Context<'_>) -> CommandResult {
    run_starstruck(ctx, Some(Membership::FreeToPlay)).await
}

pub async fn on_error(error: poise::FrameworkError<'_, Data, CommandError>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            error!(error = %error, "framework setup failed");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            let command = ctx.command().qualified_name.clone();
            let message = match &error {
                CommandError::Service(service_error) if service_error.is_rejection() => {
                    info!(command = %command, reason = %service_error, "command rejected");
                    service_error.user_message()
                }
                CommandError::Service(service_error) => {
                    error!(command = %command, error = %service_error, "command failed");
                    ctx.data().service.report_failure(&command, service_error);
                    service_error.user_message()
                }
                CommandError::Discord(discord_error) => {
                    error!(command = %command, error = %discord_error, "command failed");
                    ctx.data().service.report_failure(&command, discord_error);
                    "Something went wrong while handling that command.".to_string()
                }
            };
            let reply = CreateReply::default()
                .content(message)
                .ephemeral(!replies_publicly(ctx.command()));
            if let Err(reply_error) = ctx.send(reply).await {
                warn!(command = %command, error = %reply_error, "failed to send error reply");
            }
        }
        other => {
            if let Err(handler_error) = poise::builtins::on_error(other).await {
                warn!(error = %handler_error, "failed to handle framework error");
            }
        }
    }
}
