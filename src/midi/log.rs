//! Bounded MIDI message history
//!
//! Written by the driver callback thread, read by the UI thread. Every access
//! goes through the same mutex, so readers always see driver delivery order.

use parking_lot::Mutex;
use std::collections::VecDeque;

/// Default number of messages kept before the oldest are evicted
pub const MAX_LOG_SIZE: usize = 1000;

/// Display category of a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Note On / Note Off
    Note,
    ControlChange,
    PitchBend,
    System,
    /// Synthetic connection-audit entry (no bytes)
    Status,
    Other,
}

/// One entry of the message log
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    /// Raw bytes as delivered by the driver, empty for status entries
    pub data: Vec<u8>,
    /// Seconds since the driver handle was created
    pub timestamp: f64,
    pub description: String,
}

impl RawMessage {
    pub fn new(data: Vec<u8>, timestamp: f64, description: String) -> Self {
        Self {
            data,
            timestamp,
            description,
        }
    }

    /// Status-only entry such as "Connected to: ..."
    pub fn status(description: impl Into<String>) -> Self {
        Self::new(Vec::new(), 0.0, description.into())
    }

    pub fn is_status(&self) -> bool {
        self.data.is_empty()
    }

    pub fn kind(&self) -> MessageKind {
        match self.data.first().map(|status| status & 0xF0) {
            None => MessageKind::Status,
            Some(0x80) | Some(0x90) => MessageKind::Note,
            Some(0xB0) => MessageKind::ControlChange,
            Some(0xE0) => MessageKind::PitchBend,
            Some(0xF0) => MessageKind::System,
            Some(_) => MessageKind::Other,
        }
    }
}

struct LogInner {
    entries: VecDeque<RawMessage>,
    total: u64,
}

/// Thread-safe, append-only message log with FIFO eviction
pub struct MessageLog {
    inner: Mutex<LogInner>,
    limit: usize,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::with_limit(MAX_LOG_SIZE)
    }

    /// Create a log holding at most `limit` entries (at least one)
    pub fn with_limit(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            inner: Mutex::new(LogInner {
                entries: VecDeque::with_capacity(limit.min(MAX_LOG_SIZE)),
                total: 0,
            }),
            limit,
        }
    }

    /// Append a message, evicting from the head once the bound is exceeded
    pub fn push(&self, message: RawMessage) {
        let mut inner = self.inner.lock();
        inner.entries.push_back(message);
        inner.total += 1;
        while inner.entries.len() > self.limit {
            inner.entries.pop_front();
        }
    }

    /// Up to `max_count` most recent messages, oldest first
    pub fn recent(&self, max_count: usize) -> Vec<RawMessage> {
        let inner = self.inner.lock();
        let skip = inner.entries.len().saturating_sub(max_count);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of messages ever appended; unaffected by eviction and `clear`
    pub fn total_appended(&self) -> u64 {
        self.inner.lock().total
    }

    /// Entries appended after the first `seen` appends that are still held,
    /// oldest first, together with the current append total.
    pub fn entries_since(&self, seen: u64) -> (Vec<RawMessage>, u64) {
        let inner = self.inner.lock();
        let fresh = usize::try_from(inner.total.saturating_sub(seen)).unwrap_or(usize::MAX);
        let skip = inner.entries.len().saturating_sub(fresh);
        let entries = inner.entries.iter().skip(skip).cloned().collect();
        (entries, inner.total)
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
    use std::sync::Arc;
    use std::thread;

    fn numbered(n: usize) -> RawMessage {
        RawMessage::new(vec![0x90, (n % 128) as u8, 100], n as f64, format!("msg {}", n))
    }

    #[test]
    fn test_eviction_keeps_newest() {
        let log = MessageLog::new();
        for n in 1..=1001 {
            log.push(numbered(n));
        }

        assert_eq!(log.len(), 1000);
        let all = log.recent(usize::MAX);
        assert_eq!(all.first().unwrap().description, "msg 2");
        assert_eq!(all.last().unwrap().description, "msg 1001");
        assert!(all.iter().all(|m| m.description != "msg 1"));
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let log = MessageLog::new();
        for n in 1..=1000 {
            log.push(numbered(n));
        }

        let recent = log.recent(50);
        assert_eq!(recent.len(), 50);
        let expected: Vec<String> = (951..=1000).map(|n| format!("msg {}", n)).collect();
        let got: Vec<String> = recent.into_iter().map(|m| m.description).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_recent_with_fewer_entries() {
        let log = MessageLog::new();
        log.push(numbered(1));
        log.push(numbered(2));

        let recent = log.recent(50);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].description, "msg 1");
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_clear() {
        let log = MessageLog::with_limit(10);
        for n in 0..5 {
            log.push(numbered(n));
        }
        log.clear();

        assert!(log.is_empty());
        assert_eq!(log.total_appended(), 5);
    }

    #[test]
    fn test_entries_since() {
        let log = MessageLog::with_limit(4);
        for n in 1..=3 {
            log.push(numbered(n));
        }

        let (entries, total) = log.entries_since(1);
        assert_eq!(total, 3);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "msg 2");

        for n in 4..=9 {
            log.push(numbered(n));
        }
        let (entries, total) = log.entries_since(3);
        assert_eq!(total, 9);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].description, "msg 6");

        assert!(log.entries_since(9).0.is_empty());
    }

    #[test]
    fn test_kind_and_status() {
        assert_eq!(RawMessage::status("Connected to: X").kind(), MessageKind::Status);
        assert!(RawMessage::status("x").is_status());
        assert_eq!(numbered(1).kind(), MessageKind::Note);
        assert_eq!(RawMessage::new(vec![0xB1, 1, 2], 0.0, String::new()).kind(), MessageKind::ControlChange);
        assert_eq!(RawMessage::new(vec![0xE0, 0, 64], 0.0, String::new()).kind(), MessageKind::PitchBend);
        assert_eq!(RawMessage::new(vec![0xF8], 0.0, String::new()).kind(), MessageKind::System);
        assert_eq!(RawMessage::new(vec![0xC0, 1], 0.0, String::new()).kind(), MessageKind::Other);
    }

    #[test]
    fn test_concurrent_writer_preserves_order() {
        let log = Arc::new(MessageLog::with_limit(100));
        let writer_log = log.clone();

        let writer = thread::spawn(move || {
            for n in 0..500 {
                writer_log.push(numbered(n));
            }
        });

        for _ in 0..100 {
            let snapshot = log.recent(100);
            assert!(snapshot.len() <= 100);
            assert!(snapshot.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        }

        writer.join().unwrap();
        assert_eq!(log.len(), 100);
        assert_eq!(log.total_appended(), 500);
        assert_eq!(log.recent(1)[0].description, "msg 499");
    }
}
