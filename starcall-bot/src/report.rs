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

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use starcall_common::{Region, StarSize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    StarCalled {
        world: u16,
        region: Region,
        size: StarSize,
        expires_at: DateTime<Utc>,
        guild_id: Option<u64>,
    },
    HandlerFailed {
        command: String,
        error: String,
    },
}

#[derive(Clone)]
pub struct Reporter {
    client: reqwest::Client,
    url: String,
}

impl Reporter {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn report(&self, event: ReportEvent) {
        let reporter = self.clone();
        tokio::spawn(async move {
            if let Err(error) = reporter.post(&event).await {
                warn!(error = %error, url = %reporter.url, "failed to deliver report");
            }
        });
    }

    async fn post(&self, event: &ReportEvent) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .context("report request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("report endpoint returned {}: {}", status, body);
        }
        Ok(())
    }
}
