use std::collections::HashSet;

use uuid::Uuid;

use crate::studyspace::messages::Message;

/// Deduplicated, ascending-ordered view fed by the refresh and push feeds.
///
/// Pushes [`insert`](Self::insert) single messages; a full refresh
/// [`replace`](Self::replace)s the whole view, which makes the refresh
/// authoritative for deletions as well as additions. A message id is
/// admitted exactly once no matter which feed delivers it first or how
/// often it is re-delivered. Order is by `(created_at, id)`, the same total
/// order the database query uses, so a snapshot built from pushes matches
/// one built from a full refresh.
pub(crate) struct MessageTimeline {
    seen: HashSet<Uuid>,
    messages: Vec<Message>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self {
            seen: HashSet::new(),
            messages: Vec::new(),
        }
    }

    /// Inserts one message at its sorted position. Returns `false` for
    /// duplicates.
    pub fn insert(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        let key = (message.created_at, message.id);
        let pos = self
            .messages
            .partition_point(|m| (m.created_at, m.id) < key);
        self.messages.insert(pos, message);
        true
    }

    /// Wholesale replacement by an authoritative full-fetch batch: the
    /// timeline becomes exactly the batch, so rows deleted since the last
    /// refresh disappear from the view. Returns `true` when the snapshot
    /// changed.
    pub fn replace(&mut self, batch: Vec<Message>) -> bool {
        let mut next = MessageTimeline::new();
        for message in batch {
            next.insert(message);
        }
        if next.messages == self.messages {
            return false;
        }
        *self = next;
        true
    }

    /// The current snapshot, in ascending order.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }
}
