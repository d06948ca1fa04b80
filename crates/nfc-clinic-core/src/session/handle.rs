//! Cross-thread hand-off into the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::identity::UidSink;

/// Monotonic sequence shared by every load and save of one session.
#[derive(Debug, Clone, Default)]
pub struct Sequencer(Arc<AtomicU64>);

impl Sequencer {
    /// Allocate the next sequence number (first is 1).
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Messages handed from background tasks to the interactive thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    UidDetected { seq: u64, uid: String },
}

/// Clonable, `Send` producer side of the session queue.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: Sender<SessionMessage>,
    sequencer: Sequencer,
}

impl SessionHandle {
    pub(crate) fn new(tx: Sender<SessionMessage>, sequencer: Sequencer) -> Self {
        Self { tx, sequencer }
    }

    /// Enqueue a detected UID stamped with the next sequence number.
    ///
    /// Returns the sequence number, or `None` if the session is gone.
    pub fn post_uid(&self, uid: impl Into<String>) -> Option<u64> {
        let seq = self.sequencer.next();
        self.tx
            .send(SessionMessage::UidDetected {
                seq,
                uid: uid.into(),
            })
            .ok()
            .map(|_| seq)
    }
}

impl UidSink for SessionHandle {
    fn uid_detected(&self, uid: String) -> bool {
        self.post_uid(uid).is_some()
    }
}
