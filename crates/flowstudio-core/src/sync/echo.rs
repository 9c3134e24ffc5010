use std::collections::VecDeque;

/// Recognizes our own writes when the watcher reports them back.
///
/// Tracks the last serialization plus every queued write that has not yet
/// been superseded on disk by a later completed write.
#[derive(Debug, Default)]
pub struct EchoFilter {
    last: String,
    outbound: VecDeque<(u64, String)>,
}

impl EchoFilter {
    /// Last serialization known to match the in-memory flow
    pub fn last(&self) -> &str {
        &self.last
    }

    /// Record a serialization queued for writing under `seq`.
    pub fn record_outbound(&mut self, seq: u64, text: String) {
        self.last = text.clone();
        self.outbound.push_back((seq, text));
    }

    /// Forget pending writes and take `text` as the current state (a read
    /// from disk was applied).
    pub fn reset(&mut self, text: impl Into<String>) {
        self.last = text.into();
        self.outbound.clear();
    }

    /// True when `text` is something we wrote (or are writing).
    ///
    /// `written` is the sequence number of the last completed write.
    pub fn is_echo(&mut self, text: &str, written: u64) -> bool {
        while self.outbound.len() > 1 && self.outbound[1].0 <= written {
            self.outbound.pop_front();
        }
        text == self.last || self.outbound.iter().any(|(_, t)| t == text)
    }

    pub fn pending(&self) -> usize {
        self.outbound.len()
    }
}
