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

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use thiserror::Error;

const UNKNOWN_MESSAGE_CODE: isize = 10008;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("rate limited by the chat platform")]
    RateLimited { retry_after: Option<Duration> },
    #[error("message or channel not found")]
    NotFound,
    #[error("chat request failed: {0}")]
    Other(String),
}

impl ChatError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

impl From<serenity::Error> for ChatError {
    fn from(error: serenity::Error) -> Self {
        if let serenity::Error::Http(serenity::HttpError::UnsuccessfulRequest(response)) = &error {
            if response.status_code.as_u16() == 429 {
                return Self::RateLimited { retry_after: None };
            }
            if response.status_code.as_u16() == 404 || response.error.code == UNKNOWN_MESSAGE_CODE {
                return Self::NotFound;
            }
        }
        Self::Other(error.to_string())
    }
}

/// The chat operations the table needs. Ids are raw snowflakes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64, ChatError>;
    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> Result<(), ChatError>;
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), ChatError>;
}

pub struct SerenityChat {
    http: Arc<serenity::Http>,
}

impl SerenityChat {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

fn channel(id: u64) -> Result<serenity::ChannelId, ChatError> {
    if id == 0 {
        return Err(ChatError::NotFound);
    }
    Ok(serenity::ChannelId::new(id))
}

fn message(id: u64) -> Result<serenity::MessageId, ChatError> {
    if id == 0 {
        return Err(ChatError::NotFound);
    }
    Ok(serenity::MessageId::new(id))
}

#[async_trait]
impl ChatApi for SerenityChat {
    async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64, ChatError> {
        let sent = channel(channel_id)?
            .send_message(
                self.http.as_ref(),
                serenity::CreateMessage::new().content(content),
            )
            .await?;
        Ok(sent.id.get())
    }

    async fn edit_message(
        &self,
        channel_id: u64,
        message_id: u64,
        content: &str,
    ) -> Result<(), ChatError> {
        channel(channel_id)?
            .edit_message(
                self.http.as_ref(),
                message(message_id)?,
                serenity::EditMessage::new().content(content),
            )
            .await?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), ChatError> {
        channel(channel_id)?
            .delete_message(self.http.as_ref(), message(message_id)?)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub mod testing {
    use std::{
        collections::VecDeque,
        sync::{
            Mutex,
            atomic::{AtomicU64, Ordering},
        },
    };

    use super::*;

    #[derive(Default)]
    pub struct RecordingChat {
        next_id: AtomicU64,
        pub sent: Mutex<Vec<(u64, u64, String)>>,
        pub edits: Mutex<Vec<(u64, u64, String)>>,
        pub deleted: Mutex<Vec<(u64, u64)>>,
        pub edit_failures: Mutex<VecDeque<ChatError>>,
        pub send_outcomes: Mutex<VecDeque<Option<ChatError>>>,
    }

    impl RecordingChat {
        pub fn fail_next_edits(&self, errors: impl IntoIterator<Item = ChatError>) {
            self.edit_failures.lock().unwrap().extend(errors);
        }

        /// Scripts upcoming sends in order: `None` lets one through, `Some`
        /// fails it.
        pub fn fail_next_sends(&self, outcomes: impl IntoIterator<Item = Option<ChatError>>) {
            self.send_outcomes.lock().unwrap().extend(outcomes);
        }

        pub fn deleted_ids(&self) -> Vec<u64> {
            self.deleted.lock().unwrap().iter().map(|(_, id)| *id).collect()
        }

        pub fn edits(&self) -> Vec<(u64, u64, String)> {
            self.edits.lock().unwrap().clone()
        }

        pub fn sent_ids(&self) -> Vec<u64> {
            self.sent.lock().unwrap().iter().map(|(_, id, _)| *id).collect()
        }
    }

    #[async_trait]
    impl ChatApi for RecordingChat {
        async fn send_message(&self, channel_id: u64, content: &str) -> Result<u64, ChatError> {
            if let Some(Some(error)) = self.send_outcomes.lock().unwrap().pop_front() {
                return Err(error);
            }
            let id = 9000 + self.next_id.fetch_add(1, Ordering::SeqCst);
            self.sent
                .lock()
                .unwrap()
                .push((channel_id, id, content.to_string()));
            Ok(id)
        }

        async fn edit_message(
            &self,
            channel_id: u64,
            message_id: u64,
            content: &str,
        ) -> Result<(), ChatError> {
            if let Some(error) = self.edit_failures.lock().unwrap().pop_front() {
                return Err(error);
            }
            self.edits
                .lock()
                .unwrap()
                .push((channel_id, message_id, content.to_string()));
            Ok(())
        }

        async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), ChatError> {
            self.deleted.lock().unwrap().push((channel_id, message_id));
            Ok(())
        }
    }
}
