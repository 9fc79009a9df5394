use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::studyspace::messages::Message;

/// Notification that a message was persisted to a group. Carries only ids;
/// the watcher fetches the full row so the denormalized author name is
/// resolved the same way on both feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePush {
    pub group_id: Uuid,
    pub message_id: Uuid,
}

/// A live view of one group's messages.
///
/// `snapshots` always holds the full, deduplicated, ascending-ordered
/// timeline; every borrow observes a consistent state. Dropping the watch (or
/// calling [`stop`](Self::stop)) tears down the background task, its
/// broadcast subscription, and the refresh timer.
pub struct GroupMessageWatch {
    pub(super) snapshots: watch::Receiver<Vec<Message>>,
    pub(super) shutdown: watch::Sender<bool>,
    pub(super) handle: Option<JoinHandle<()>>,
}

impl GroupMessageWatch {
    /// The current timeline.
    pub fn messages(&self) -> Vec<Message> {
        self.snapshots.borrow().clone()
    }

    /// Waits until the timeline changes, then returns the new snapshot.
    /// Returns `None` once the background task has stopped.
    pub async fn changed(&mut self) -> Option<Vec<Message>> {
        match self.snapshots.changed().await {
            Ok(()) => Some(self.snapshots.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// Stops the background task and waits for it to finish. Preferred over
    /// plain drop when the caller wants release to be observable.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for GroupMessageWatch {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for GroupMessageWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupMessageWatch")
            .field("messages", &self.snapshots.borrow().len())
            .finish()
    }
}
