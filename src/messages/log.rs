use super::types::Message;
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only message log for one session
///
/// Insertion order is significant. There is deliberately no removal or
/// mutation API; the log lives exactly as long as the session and is never
/// persisted. Clones share the same underlying storage.
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn append(&self, message: Message) {
        self.messages.write().push(message);
    }

    pub fn all(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Author;

    #[test]
    fn test_append_preserves_order() {
        let log = MessageLog::new();
        log.append(Message::user("first"));
        log.append(Message::assistant("second"));
        log.append(Message::user("third"));

        let all = log.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "first");
        assert_eq!(all[1].content, "second");
        assert_eq!(all[2].content, "third");
        assert_eq!(all[1].author, Author::Assistant);
    }

    #[test]
    fn test_clones_share_storage() {
        let log = MessageLog::new();
        let view = log.clone();

        log.append(Message::user("hello"));
        assert_eq!(view.len(), 1);
        assert_eq!(view.last().unwrap().content, "hello");
    }

    #[test]
    fn test_empty_log() {
        let log = MessageLog::new();
        assert!(log.is_empty());
        assert!(log.last().is_none());
    }
}
