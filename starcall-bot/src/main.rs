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

mod chat;
mod commands;
mod config;
mod editor;
mod health;
mod report;
mod retry;
mod service;
mod store;
mod sweep;

use std::sync::Arc;

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tracing::{error, info};

use crate::{
    chat::SerenityChat,
    commands::Data,
    config::BotConfig,
    editor::EditQueue,
    report::Reporter,
    service::TableService,
    store::TableStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "starcall_bot=debug,tower_http=info".to_string()),
        )
        .init();

    let config = BotConfig::load()?;
    let store = Arc::new(
        TableStore::load(config.state_path.clone())
            .await
            .with_context(|| {
                format!(
                    "failed to load table state from {}",
                    config.state_path.display()
                )
            })?,
    );
    info!(
        path = %store.path().display(),
        table = store.snapshot().await.exists(),
        "table state loaded"
    );

    let reporter = config.report_url.as_deref().map(Reporter::new);

    if let Some(bind_addr) = config.health_bind {
        let health_store = store.clone();
        tokio::spawn(async move {
            if let Err(error) = health::serve(bind_addr, health_store).await {
                error!(error = %error, "health endpoint stopped");
            }
        });
    }

    let settings = config.service_settings();
    let edit_delay = config.edit_delay;
    let sweep_interval = config.sweep_interval;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            on_error: |error| Box::pin(commands::on_error(error)),
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        command = %ctx.command().qualified_name,
                        user = %ctx.author().name,
                        "command received"
                    );
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!(user = %ready.user.name, "connected to Discord");
                let chat = Arc::new(SerenityChat::new(ctx.http.clone()));
                let editor = EditQueue::spawn(chat.clone(), settings.retry.clone(), edit_delay);
                let service = Arc::new(TableService::new(store, chat, editor, settings, reporter));
                tokio::spawn(sweep::run_sweep(service.clone(), sweep_interval));
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                info!(commands = framework.options().commands.len(), "slash commands registered");
                Ok(Data { service })
            })
        })
        .build();

    serenity::ClientBuilder::new(&config.token, serenity::GatewayIntents::non_privileged())
        .framework(framework)
        .await
        .context("failed to build Discord client")?
        .start()
        .await
        .context("Discord client stopped")?;

    Ok(())
}
