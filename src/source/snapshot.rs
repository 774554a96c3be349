// src/source/snapshot.rs
//! File-bridge adapters for running without a live browser driver.
//!
//! `SnapshotFeed` re-reads a JSON snapshot of the comment section on every
//! fetch, matching the full re-render the real driver produces each cycle.
//! `OutboxReplyChannel` appends every dispatched reply as a JSON line, so a
//! dry run leaves an auditable trail instead of touching the platform.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use super::{CommentFeed, DispatchError, ReplyChannel, ScrapedComment, SourceError};

pub struct SnapshotFeed {
    path: PathBuf,
}

impl SnapshotFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CommentFeed for SnapshotFeed {
    async fn fetch_comments(&self) -> Result<Vec<ScrapedComment>, SourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            SourceError::NotReady(format!("snapshot {}: {e}", self.path.display()))
        })?;
        let comments: Vec<ScrapedComment> = serde_json::from_str(&raw)
            .map_err(|e| SourceError::Transport(format!("snapshot parse: {e}")))?;
        tracing::debug!(count = comments.len(), "snapshot feed fetched");
        Ok(comments)
    }

    fn name(&self) -> &'static str {
        "snapshot"
    }
}

pub struct OutboxReplyChannel {
    path: PathBuf,
}

impl OutboxReplyChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Serialize)]
struct OutboxLine<'a> {
    ts: String,
    author: &'a str,
    reply: &'a str,
}

#[async_trait]
impl ReplyChannel for OutboxReplyChannel {
    async fn send_reply(&self, target: &ScrapedComment, text: &str) -> Result<(), DispatchError> {
        let author = target.author.as_deref().unwrap_or_default();
        let line = OutboxLine {
            ts: chrono::Utc::now().to_rfc3339(),
            author,
            reply: text,
        };
        let json = serde_json::to_string(&line)
            .map_err(|e| DispatchError::SubmitFailed(format!("encode: {e}")))?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .map_err(|e| DispatchError::ReplyBoxUnavailable(e.to_string()))?;
            }
        }
        let mut f = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| DispatchError::ReplyBoxUnavailable(e.to_string()))?;
        writeln!(f, "{json}").map_err(|e| DispatchError::SubmitFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_feed_rereads_file_each_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comments.json");
        fs::write(&path, r#"[{"author":"a","text":"harga dong"}]"#).unwrap();

        let feed = SnapshotFeed::new(&path);
        assert_eq!(feed.fetch_comments().await.unwrap().len(), 1);

        fs::write(
            &path,
            r#"[{"author":"a","text":"harga dong"},{"author":"b","text":"mantap"}]"#,
        )
        .unwrap();
        assert_eq!(feed.fetch_comments().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_snapshot_is_a_transient_error() {
        let feed = SnapshotFeed::new("/definitely/not/here.json");
        let err = feed.fetch_comments().await.unwrap_err();
        assert!(matches!(err, SourceError::NotReady(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn outbox_appends_one_line_per_reply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let channel = OutboxReplyChannel::new(&path);

        let c = ScrapedComment::new("x", "berapa harga?");
        channel.send_reply(&c, "@x halo").await.unwrap();
        channel.send_reply(&c, "@x halo lagi").await.unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["author"], "x");
        assert_eq!(first["reply"], "@x halo");
    }
}
