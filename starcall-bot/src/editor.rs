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

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::{chat::ChatApi, retry::RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditJob {
    pub channel_id: u64,
    pub message_id: u64,
    pub content: String,
}

enum QueueItem {
    Edit(EditJob),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct EditQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl EditQueue {
    pub fn spawn(chat: Arc<dyn ChatApi>, retry: RetryPolicy, post_edit_delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_edit_worker(rx, chat, retry, post_edit_delay));
        Self { tx }
    }

    pub fn enqueue(&self, job: EditJob) {
        let message_id = job.message_id;
        if self.tx.send(QueueItem::Edit(job)).is_err() {
            warn!(message_id, "edit queue worker stopped; dropping edit");
        }
    }

    /// Resolves once every edit queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(QueueItem::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_edit_worker(
    mut rx: mpsc::UnboundedReceiver<QueueItem>,
    chat: Arc<dyn ChatApi>,
    retry: RetryPolicy,
    post_edit_delay: Duration,
) {
    while let Some(item) = rx.recv().await {
        let job = match item {
            QueueItem::Edit(job) => job,
            QueueItem::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        let api = chat.as_ref();
        let job_ref = &job;
        let result = retry
            .run("queued table edit", move || {
                api.edit_message(job_ref.channel_id, job_ref.message_id, &job_ref.content)
            })
            .await;
        match result {
            Ok(()) => debug!(
                channel_id = job.channel_id,
                message_id = job.message_id,
                "table chunk edited"
            ),
            Err(error) => warn!(
                channel_id = job.channel_id,
                message_id = job.message_id,
                error = %error,
                "dropping table edit"
            ),
        }

        tokio::time::sleep(post_edit_delay).await;
    }
    debug!("edit queue closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatError, testing::RecordingChat};

    fn quick_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    fn job(message_id: u64, content: &str) -> EditJob {
        EditJob {
            channel_id: 1,
            message_id,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn edits_are_applied_in_order() {
        let chat = Arc::new(RecordingChat::default());
        let queue = EditQueue::spawn(chat.clone(), quick_retry(), Duration::from_millis(1));
        queue.enqueue(job(10, "first"));
        queue.enqueue(job(11, "second"));
        queue.enqueue(job(10, "third"));
        queue.flush().await;

        let contents: Vec<String> = chat.edits().into_iter().map(|(_, _, c)| c).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn rate_limited_edit_is_retried() {
        let chat = Arc::new(RecordingChat::default());
        chat.fail_next_edits([ChatError::RateLimited { retry_after: None }]);
        let queue = EditQueue::spawn(chat.clone(), quick_retry(), Duration::ZERO);
        queue.enqueue(job(10, "content"));
        queue.flush().await;
        assert_eq!(chat.edits(), vec![(1, 10, "content".to_string())]);
    }

    #[tokio::test]
    async fn failed_edit_is_dropped_and_queue_continues() {
        let chat = Arc::new(RecordingChat::default());
        chat.fail_next_edits([ChatError::NotFound]);
        let queue = EditQueue::spawn(chat.clone(), quick_retry(), Duration::ZERO);
        queue.enqueue(job(10, "lost"));
        queue.enqueue(job(11, "kept"));
        queue.flush().await;
        assert_eq!(chat.edits(), vec![(1, 11, "kept".to_string())]);
    }
}
