// src/source/mod.rs
//! Ports to the external content source and reply channel.
//!
//! The browser driver owns page loading, scrolling and DOM selectors; the
//! engine only consumes "snapshot the rendered comment list" and "submit
//! reply text". Everything behind these traits can be swapped for the
//! in-memory doubles below, which the integration tests do.

pub mod snapshot;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One row of the scraped comment snapshot. Either field can be missing
/// when extraction fails driver-side; such rows are skipped upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedComment {
    pub author: Option<String>,
    pub text: Option<String>,
}

impl ScrapedComment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            text: Some(text.into()),
        }
    }

    /// Both fields, or `None` when extraction failed for this row.
    pub fn parts(&self) -> Option<(&str, &str)> {
        match (self.author.as_deref(), self.text.as_deref()) {
            (Some(a), Some(t)) => Some((a, t)),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    /// Comment section not rendered/interactable yet; retry next cycle.
    #[error("comment section not ready: {0}")]
    NotReady(String),
    /// Page load or scrape transport failure; retry next cycle.
    #[error("source transport error: {0}")]
    Transport(String),
    /// Authenticated session gone; no amount of polling will recover.
    #[error("session lost: {0}")]
    SessionLost(String),
}

impl SourceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::SessionLost(_))
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("reply box unavailable: {0}")]
    ReplyBoxUnavailable(String),
    #[error("reply submit failed: {0}")]
    SubmitFailed(String),
}

/// Content source port: reload the target page and snapshot the currently
/// rendered comments. A snapshot, not a stream — comments rendered later
/// are picked up by later cycles.
#[async_trait]
pub trait CommentFeed: Send + Sync {
    async fn fetch_comments(&self) -> Result<Vec<ScrapedComment>, SourceError>;
    fn name(&self) -> &'static str;
}

/// Reply channel port: open the reply box for `target`, type, submit.
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    async fn send_reply(&self, target: &ScrapedComment, text: &str) -> Result<(), DispatchError>;
}

// --- Test doubles ---

type QueuedFetch = Result<Vec<ScrapedComment>, SourceError>;

/// Scripted feed: queued pages/failures are served in order, after which
/// every fetch repeats the configured snapshot (the re-scrape model).
#[derive(Default)]
pub struct MockFeed {
    queue: Mutex<VecDeque<QueuedFetch>>,
    repeat: Mutex<Vec<ScrapedComment>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch returns the same snapshot.
    pub fn repeating(comments: Vec<ScrapedComment>) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            repeat: Mutex::new(comments),
        }
    }

    pub fn push_page(&self, comments: Vec<ScrapedComment>) {
        self.queue.lock().unwrap().push_back(Ok(comments));
    }

    pub fn push_failure(&self, err: SourceError) {
        self.queue.lock().unwrap().push_back(Err(err));
    }
}

#[async_trait]
impl CommentFeed for MockFeed {
    async fn fetch_comments(&self) -> Result<Vec<ScrapedComment>, SourceError> {
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            return next;
        }
        Ok(self.repeat.lock().unwrap().clone())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Records every dispatched reply; can fail the first N sends to exercise
/// the skip-without-recording path.
#[derive(Default)]
pub struct RecordingReplyChannel {
    sent: Mutex<Vec<(String, String)>>,
    fail_remaining: AtomicUsize,
}

impl RecordingReplyChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_remaining: AtomicUsize::new(n),
        }
    }

    /// `(author, reply text)` pairs in dispatch order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyChannel for RecordingReplyChannel {
    async fn send_reply(&self, target: &ScrapedComment, text: &str) -> Result<(), DispatchError> {
        if self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DispatchError::SubmitFailed("scripted failure".into()));
        }
        let author = target.author.clone().unwrap_or_default();
        self.sent.lock().unwrap().push((author, text.to_string()));
        Ok(())
    }
}
