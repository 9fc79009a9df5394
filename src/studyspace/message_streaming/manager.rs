use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::types::MessagePush;

/// Capacity of each group's push channel. A watch that falls further behind
/// than this recovers through a full refresh, so the buffer stays small.
const PUSH_BUFFER: usize = 100;

/// Push fan-out for live watches, one broadcast channel per group.
///
/// Channels exist only while a group is watched: [`attach`](Self::attach)
/// creates the channel on demand, and [`notify`](Self::notify) prunes it
/// once the last watch has gone away. Groups nobody watches never allocate a
/// channel and their pushes are dropped outright.
pub(crate) struct GroupStreams {
    channels: DashMap<Uuid, broadcast::Sender<MessagePush>>,
}

impl GroupStreams {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Opens a push receiver for the group, creating its channel on first
    /// attach.
    pub fn attach(&self, group_id: &Uuid) -> broadcast::Receiver<MessagePush> {
        match self.channels.entry(*group_id) {
            Entry::Occupied(entry) => entry.get().subscribe(),
            Entry::Vacant(entry) => {
                let (sender, receiver) = broadcast::channel(PUSH_BUFFER);
                entry.insert(sender);
                receiver
            }
        }
    }

    /// Delivers a push to every watch of its group.
    pub fn notify(&self, push: MessagePush) {
        let Some(sender) = self.channels.get(&push.group_id) else {
            return;
        };
        if sender.send(push).is_ok() {
            return;
        }
        // Send failed: every watch has detached since the channel was
        // created. Drop the map guard before removing the entry.
        drop(sender);
        if self
            .channels
            .remove_if(&push.group_id, |_, sender| sender.receiver_count() == 0)
            .is_some()
        {
            tracing::debug!(
                target: "studyspace::message_streaming",
                "Pruned push channel for unwatched group {}",
                push.group_id,
            );
        }
    }

    /// Number of watches currently attached to the group.
    pub fn watch_count(&self, group_id: &Uuid) -> usize {
        self.channels
            .get(group_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for GroupStreams {
    fn default() -> Self {
        Self::new()
    }
}
