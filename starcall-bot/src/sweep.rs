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

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use starcall_common::TableError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::service::{ServiceError, TableService, Trigger};

/// Runs the restricted clear on a fixed interval. The first run happens one
/// full interval after startup.
pub async fn run_sweep(service: Arc<TableService>, every: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = every.as_secs(), "expired-call sweep started");
    loop {
        ticker.tick().await;
        sweep_once(&service, Utc::now()).await;
    }
}

pub async fn sweep_once(service: &TableService, now: DateTime<Utc>) -> Result<String, ServiceError> {
    let result = service.clear_restricted(Trigger::Sweep, now).await;
    match &result {
        Ok(summary) => info!(summary = %summary, "sweep finished"),
        Err(
            skipped @ ServiceError::Rejected(
                TableError::NoTable | TableError::Locked | TableError::CoolingDown { .. },
            ),
        ) => debug!(reason = %skipped, "sweep skipped"),
        Err(error) => {
            warn!(error = %error, "sweep failed");
            service.report_failure("sweep", error);
        }
    }
    result
}
