// src/ledger.rs
//! Durable record of comments already answered.
//!
//! The feed is re-scraped from scratch on every poll, so this file is the
//! only thing standing between the bot and replying to the same comment
//! twice. One record per answered comment, keyed by the exact
//! `(username, normalized comment)` pair. The whole sequence is rewritten on
//! every successful append; a missing, empty, or mangled file is treated as
//! an empty ledger and must never block startup.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One answered comment. Serialized as a human-diffable JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub username: String,
    pub comment: String,
}

#[derive(Debug)]
pub struct ReplyLedger {
    path: PathBuf,
    records: Vec<ReplyRecord>,
}

impl ReplyLedger {
    /// Load the ledger from `path`. Corruption is non-fatal: any read or
    /// parse failure yields an empty ledger (logged, not raised).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(s) if s.trim().is_empty() => Vec::new(),
            Ok(s) => match serde_json::from_str::<Vec<ReplyRecord>>(&s) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %path.display(),
                        "reply ledger unparseable, starting empty"
                    );
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self { path, records }
    }

    /// Exact-match membership test; equality on both fields, not substring.
    pub fn contains(&self, username: &str, comment: &str) -> bool {
        self.records
            .iter()
            .any(|r| r.username == username && r.comment == comment)
    }

    /// Append the record in memory, then rewrite the file. If the write
    /// fails the in-memory record is kept, so the next successful persist
    /// still includes it; the caller only reports the error.
    pub fn append_and_persist(&mut self, username: &str, comment: &str) -> io::Result<()> {
        self.records.push(ReplyRecord {
            username: username.to_string(),
            comment: comment.to_string(),
        });
        self.persist()
    }

    /// Rewrite the whole sequence atomically (tmp file + rename).
    pub fn persist(&self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ReplyRecord] {
        &self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
