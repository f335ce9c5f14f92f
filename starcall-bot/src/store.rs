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

use std::path::{Path, PathBuf};

use starcall_common::{StateError, TableState};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state file does not match this version: {0}")]
    Invalid(#[from] StateError),
}

pub struct TableStore {
    path: PathBuf,
    table: Mutex<TableState>,
}

impl TableStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let table = match tokio::fs::read(&path).await {
            Ok(raw) => {
                let table: TableState = serde_json::from_slice(&raw)?;
                table.validate()?;
                info!(
                    path = %path.display(),
                    exists = table.exists(),
                    locked = table.is_locked,
                    "loaded star table"
                );
                table
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no state file; starting without a table");
                TableState::empty()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive access to the table. Hold the guard across mutate and [`Self::persist`].
    pub async fn lock(&self) -> MutexGuard<'_, TableState> {
        self.table.lock().await
    }

    pub async fn snapshot(&self) -> TableState {
        self.table.lock().await.clone()
    }

    pub async fn persist(&self, table: &TableState) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(table)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &payload)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|source| StoreError::Io {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), bytes = payload.len(), "star table saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use starcall_common::{Region, SCHEMA_VERSION, StarSize};

    fn posted_table() -> TableState {
        let mut table = TableState::fresh(77);
        let ids = (0..table.chunk_count() as u64).map(|i| 500 + i).collect();
        table.attach_messages(ids);
        table
    }

    #[tokio::test]
    async fn missing_file_starts_without_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = TableStore::load(dir.path().join("table_data.json"))
            .await
            .unwrap();
        assert!(!store.snapshot().await.exists());
    }

    #[tokio::test]
    async fn persisted_state_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_data.json");
        let store = TableStore::load(&path).await.unwrap();
        {
            let mut table = store.lock().await;
            *table = posted_table();
            let now = Utc.with_ymd_and_hms(2026, 2, 2, 20, 15, 0).unwrap();
            table
                .call(55, Region::FeldipHills, StarSize::S3, 33, now)
                .unwrap();
            table.is_locked = true;
            store.persist(&table).await.unwrap();
        }

        let reloaded = TableStore::load(&path).await.unwrap();
        assert_eq!(reloaded.snapshot().await, store.snapshot().await);
        assert!(!dir.path().join("table_data.json.tmp").exists());
    }

    #[tokio::test]
    async fn mismatched_schema_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_data.json");
        let mut table = posted_table();
        table.schema_version = SCHEMA_VERSION - 1;
        std::fs::write(&path, serde_json::to_vec(&table).unwrap()).unwrap();

        let error = TableStore::load(&path).await.err().unwrap();
        assert!(matches!(
            error,
            StoreError::Invalid(StateError::SchemaVersion { .. })
        ));
    }

    #[tokio::test]
    async fn garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table_data.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(
            TableStore::load(&path).await,
            Err(StoreError::Json(_))
        ));
    }
}
