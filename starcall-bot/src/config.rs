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

use std::{collections::HashSet, net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use chrono::TimeDelta;
use serde::Deserialize;
use starcall_common::expand_env_vars;
use tracing::info;

use crate::{retry::RetryPolicy, service::ServiceSettings};

const DEFAULT_STATE_PATH: &str = "table_data.json";
const DEFAULT_EDIT_DELAY_MS: u64 = 1500;
const DEFAULT_CHUNK_EDIT_DELAY_MS: u64 = 1000;
const DEFAULT_RESTRICTED_COOLDOWN_SECS: u64 = 600;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 900;
/// Upper bound for every configured delay and interval (one week).
const MAX_DELAY_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub report_url: Option<String>,
    pub allowed_guilds: HashSet<u64>,
    pub state_path: PathBuf,
    pub health_bind: Option<SocketAddr>,
    pub edit_delay: Duration,
    pub chunk_edit_delay: Duration,
    pub restricted_cooldown: Duration,
    pub sweep_interval: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    report_url: Option<String>,
    #[serde(default)]
    allowed_guilds: Option<Vec<u64>>,
    #[serde(default)]
    state_path: Option<String>,
    #[serde(default)]
    health_bind: Option<String>,
    #[serde(default)]
    edit_delay_ms: Option<u64>,
    #[serde(default)]
    chunk_edit_delay_ms: Option<u64>,
    #[serde(default)]
    restricted_cooldown_secs: Option<u64>,
    #[serde(default)]
    sweep_interval_secs: Option<u64>,
    #[serde(default)]
    retry_max_attempts: Option<u32>,
    #[serde(default)]
    retry_initial_backoff_ms: Option<u64>,
    #[serde(default)]
    retry_max_backoff_ms: Option<u64>,
}

impl BotConfig {
    pub fn load() -> anyhow::Result<Self> {
        let file = match normalize_optional_string(std::env::var("STARCALL_CONFIG_PATH").ok()) {
            Some(path) => load_config_file(&path)?,
            None => ConfigFile::default(),
        };
        Self::from_sources(|key| std::env::var(key).ok(), file)
    }

    fn from_sources(env: impl Fn(&str) -> Option<String>, file: ConfigFile) -> anyhow::Result<Self> {
        let var = |key: &str| normalize_optional_string(env(key));
        let millis = |key: &str, file_value: Option<u64>, default: u64| {
            Duration::from_millis(
                var(key)
                    .and_then(|value| value.parse::<u64>().ok())
                    .or(file_value)
                    .unwrap_or(default)
                    .min(MAX_DELAY_SECS * 1000),
            )
        };
        let secs = |key: &str, file_value: Option<u64>, default: u64| {
            Duration::from_secs(
                var(key)
                    .and_then(|value| value.parse::<u64>().ok())
                    .or(file_value)
                    .unwrap_or(default)
                    .clamp(1, MAX_DELAY_SECS),
            )
        };

        let token = var("DISCORD_TOKEN")
            .or_else(|| var("token"))
            .or_else(|| normalize_optional_string(file.token.clone()))
            .context("missing bot token; set DISCORD_TOKEN")?;

        let allowed_guilds = match var("STARCALL_ALLOWED_GUILDS") {
            Some(raw) => parse_guild_list(&raw)?,
            None => file.allowed_guilds.clone().unwrap_or_default().into_iter().collect(),
        };

        let health_bind = var("STARCALL_HEALTH_BIND")
            .or_else(|| normalize_optional_string(file.health_bind.clone()))
            .map(|value| {
                value
                    .parse::<SocketAddr>()
                    .context(format!("invalid STARCALL_HEALTH_BIND `{value}`"))
            })
            .transpose()?;

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: var("STARCALL_RETRY_MAX_ATTEMPTS")
                .and_then(|value| value.parse::<u32>().ok())
                .or(file.retry_max_attempts)
                .unwrap_or(defaults.max_attempts)
                .max(1),
            initial_backoff: millis(
                "STARCALL_RETRY_INITIAL_BACKOFF_MS",
                file.retry_initial_backoff_ms,
                defaults.initial_backoff.as_millis() as u64,
            ),
            max_backoff: millis(
                "STARCALL_RETRY_MAX_BACKOFF_MS",
                file.retry_max_backoff_ms,
                defaults.max_backoff.as_millis() as u64,
            ),
        };

        Ok(Self {
            token,
            report_url: var("STARCALL_REPORT_URL")
                .or_else(|| normalize_optional_string(file.report_url.clone())),
            allowed_guilds,
            state_path: PathBuf::from(
                var("STARCALL_STATE_PATH")
                    .or_else(|| normalize_optional_string(file.state_path.clone()))
                    .unwrap_or_else(|| DEFAULT_STATE_PATH.to_string()),
            ),
            health_bind,
            edit_delay: millis("STARCALL_EDIT_DELAY_MS", file.edit_delay_ms, DEFAULT_EDIT_DELAY_MS),
            chunk_edit_delay: millis(
                "STARCALL_CHUNK_EDIT_DELAY_MS",
                file.chunk_edit_delay_ms,
                DEFAULT_CHUNK_EDIT_DELAY_MS,
            ),
            restricted_cooldown: secs(
                "STARCALL_RESTRICTED_COOLDOWN_SECS",
                file.restricted_cooldown_secs,
                DEFAULT_RESTRICTED_COOLDOWN_SECS,
            ),
            sweep_interval: secs(
                "STARCALL_SWEEP_INTERVAL_SECS",
                file.sweep_interval_secs,
                DEFAULT_SWEEP_INTERVAL_SECS,
            ),
            retry,
        })
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            allowed_guilds: self.allowed_guilds.clone(),
            chunk_edit_delay: self.chunk_edit_delay,
            restricted_cooldown: TimeDelta::from_std(self.restricted_cooldown)
                .unwrap_or(TimeDelta::MAX),
            retry: self.retry.clone(),
        }
    }
}

fn load_config_file(path: &str) -> anyhow::Result<ConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {path}"))?;
    let config = parse_config_file(&raw).with_context(|| format!("invalid config file {path}"))?;
    info!(path = %path, "loaded config file");
    Ok(config)
}

fn parse_config_file(raw: &str) -> anyhow::Result<ConfigFile> {
    let expanded = expand_env_vars(raw);
    if expanded.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    Ok(serde_yaml::from_str(&expanded)?)
}

fn parse_guild_list(raw: &str) -> anyhow::Result<HashSet<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<u64>()
                .with_context(|| format!("invalid guild id `{value}` in STARCALL_ALLOWED_GUILDS"))
        })
        .collect()
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
