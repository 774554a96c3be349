// src/history.rs
//! Bounded in-memory log of dispatched replies, for diagnostics.
//! The ledger is the durable record; this is the cheap "what did the bot
//! just do" view exposed to logs and tests.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct ReplyEvent {
    pub ts_unix: u64,
    pub author: String,
    pub category: &'static str,
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<ReplyEvent>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(10_000))),
            cap: cap.min(10_000),
        }
    }

    pub fn push(&self, author: &str, category: &'static str) {
        let entry = ReplyEvent {
            ts_unix: now_unix(),
            author: author.to_string(),
            category,
        };
        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<ReplyEvent> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capped_log_drops_oldest_first() {
        let h = History::with_capacity(3);
        for name in ["a", "b", "c", "d"] {
            h.push(name, "price");
        }
        let snap = h.snapshot_last_n(10);
        assert_eq!(snap.len(), 3);
        assert_eq!(snap[0].author, "b");
        assert_eq!(snap[2].author, "d");
    }
}
