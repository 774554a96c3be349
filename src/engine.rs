// src/engine.rs
//! Poll-process-reply orchestrator.
//!
//! One unbounded loop: snapshot the comment section, run every comment
//! through extract → normalize → dedup → classify → render → dispatch →
//! record, then sleep out the cooldown and go again. A failure processing
//! one comment never touches the rest of the cycle; a transient source
//! failure backs the whole cycle off with a bounded retry budget; only a
//! lost session (or an exhausted budget) ends the run.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::classify::Classifier;
use crate::history::History;
use crate::ledger::ReplyLedger;
use crate::normalize::normalize;
use crate::respond::ReplyTemplates;
use crate::source::{CommentFeed, ReplyChannel, ScrapedComment, SourceError};

/// One-time metrics registration (so series show up on whatever exporter
/// the deployment installs).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("cycles_total", "Completed poll cycles.");
        describe_counter!("comments_fetched_total", "Comments seen across all snapshots.");
        describe_counter!("replies_sent_total", "Replies dispatched successfully.");
        describe_counter!(
            "comments_deduped_total",
            "Comments skipped because the ledger already holds them."
        );
        describe_counter!(
            "comments_skipped_total",
            "Comments skipped for extraction/classification/dispatch failures."
        );
        describe_histogram!("cycle_ms", "Wall time of one poll cycle in milliseconds.");
        describe_gauge!("last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cooldown between successful cycles.
    pub poll_interval_secs: u64,
    /// Bound on waiting for the comment section snapshot.
    pub section_timeout_secs: u64,
    /// Random pacing delay after each dispatched reply.
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    /// Consecutive transient cycle failures tolerated before giving up.
    pub max_transient_retries: u32,
    pub backoff_base_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            section_timeout_secs: 20,
            pacing_min_ms: 800,
            pacing_max_ms: 2500,
            max_transient_retries: 5,
            backoff_base_secs: 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("transient source failure: {0}")]
    Transient(SourceError),
    #[error("fatal source failure: {0}")]
    Fatal(SourceError),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("comment source failed {attempts} consecutive cycles, giving up: {last}")]
    SourceExhausted { attempts: u32, last: SourceError },
    #[error("unrecoverable source failure: {0}")]
    Fatal(SourceError),
}

/// Per-cycle tallies, logged as the cycle tick report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub replied: usize,
    pub already_replied: usize,
    pub skipped_extract: usize,
    pub skipped_classify: usize,
    pub skipped_dispatch: usize,
}

enum CommentOutcome {
    Replied,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    MissingFields,
    AlreadyReplied,
    Classification,
    Dispatch,
}

pub struct ReplyEngine {
    cfg: EngineConfig,
    feed: Arc<dyn CommentFeed>,
    replier: Arc<dyn ReplyChannel>,
    classifier: Classifier,
    templates: ReplyTemplates,
    ledger: ReplyLedger,
    history: History,
}

impl ReplyEngine {
    pub fn new(
        cfg: EngineConfig,
        feed: Arc<dyn CommentFeed>,
        replier: Arc<dyn ReplyChannel>,
        classifier: Classifier,
        templates: ReplyTemplates,
        ledger: ReplyLedger,
    ) -> Self {
        Self {
            cfg,
            feed,
            replier,
            classifier,
            templates,
            ledger,
            history: History::with_capacity(512),
        }
    }

    pub fn ledger(&self) -> &ReplyLedger {
        &self.ledger
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Unbounded loop. Returns only on an unrecoverable failure: a fatal
    /// source error, or the transient retry budget running dry.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        let mut failures: u32 = 0;
        loop {
            match self.run_cycle().await {
                Ok(_report) => {
                    failures = 0;
                    debug!(secs = self.cfg.poll_interval_secs, "cooldown");
                    tokio::time::sleep(Duration::from_secs(self.cfg.poll_interval_secs)).await;
                }
                Err(CycleError::Fatal(e)) => {
                    error!(error = %e, "fatal source failure, stopping");
                    return Err(EngineError::Fatal(e));
                }
                Err(CycleError::Transient(e)) => {
                    failures += 1;
                    if failures >= self.cfg.max_transient_retries {
                        return Err(EngineError::SourceExhausted {
                            attempts: failures,
                            last: e,
                        });
                    }
                    let backoff = self.backoff_delay(failures);
                    warn!(
                        error = %e,
                        attempt = failures,
                        backoff_secs = backoff.as_secs(),
                        "transient cycle failure, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// One pass: fetch the snapshot within the section timeout, process
    /// every comment with isolated failure handling, report tallies.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        ensure_metrics_described();
        let t0 = Instant::now();

        debug!(feed = self.feed.name(), "fetching comment snapshot");
        let timeout = Duration::from_secs(self.cfg.section_timeout_secs);
        let comments = match tokio::time::timeout(timeout, self.feed.fetch_comments()).await {
            Err(_elapsed) => {
                return Err(CycleError::Transient(SourceError::NotReady(format!(
                    "comment section not interactable within {}s",
                    self.cfg.section_timeout_secs
                ))))
            }
            Ok(Err(e)) if e.is_fatal() => return Err(CycleError::Fatal(e)),
            Ok(Err(e)) => return Err(CycleError::Transient(e)),
            Ok(Ok(v)) => v,
        };

        let mut report = CycleReport {
            fetched: comments.len(),
            ..Default::default()
        };
        counter!("comments_fetched_total").increment(comments.len() as u64);

        for comment in &comments {
            match Self::process_comment(
                &mut self.ledger,
                &self.history,
                &self.classifier,
                &self.templates,
                self.replier.as_ref(),
                comment,
            )
            .await
            {
                CommentOutcome::Replied => {
                    report.replied += 1;
                    counter!("replies_sent_total").increment(1);
                    self.pace().await;
                }
                CommentOutcome::Skipped(SkipReason::AlreadyReplied) => {
                    report.already_replied += 1;
                    counter!("comments_deduped_total").increment(1);
                }
                CommentOutcome::Skipped(reason) => {
                    match reason {
                        SkipReason::MissingFields => report.skipped_extract += 1,
                        SkipReason::Classification => report.skipped_classify += 1,
                        SkipReason::Dispatch => report.skipped_dispatch += 1,
                        SkipReason::AlreadyReplied => unreachable!(),
                    }
                    counter!("comments_skipped_total").increment(1);
                }
            }
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        counter!("cycles_total").increment(1);
        gauge!("last_cycle_ts").set(now as f64);
        histogram!("cycle_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        info!(
            fetched = report.fetched,
            replied = report.replied,
            deduped = report.already_replied,
            skipped_extract = report.skipped_extract,
            skipped_classify = report.skipped_classify,
            skipped_dispatch = report.skipped_dispatch,
            "cycle complete"
        );
        Ok(report)
    }

    /// Associated fn rather than a method so the per-comment pipeline can
    /// borrow ledger mutably while the rest stays shared.
    async fn process_comment(
        ledger: &mut ReplyLedger,
        history: &History,
        classifier: &Classifier,
        templates: &ReplyTemplates,
        replier: &dyn ReplyChannel,
        comment: &ScrapedComment,
    ) -> CommentOutcome {
        let Some((author, raw_text)) = comment.parts() else {
            debug!("comment row missing author or text, skipping");
            return CommentOutcome::Skipped(SkipReason::MissingFields);
        };

        let normalized = normalize(raw_text);
        if normalized.is_empty() {
            debug!(author, "comment empty after normalization, skipping");
            return CommentOutcome::Skipped(SkipReason::MissingFields);
        }

        if ledger.contains(author, &normalized) {
            debug!(author, "already answered, skipping");
            return CommentOutcome::Skipped(SkipReason::AlreadyReplied);
        }

        let outcome = match classifier.classify(&normalized).await {
            Ok(c) => c,
            Err(e) => {
                warn!(author, error = %e, "classification failed, leaving for next cycle");
                return CommentOutcome::Skipped(SkipReason::Classification);
            }
        };

        let reply = templates.render(&outcome, author);
        if let Err(e) = replier.send_reply(comment, &reply).await {
            warn!(author, error = %e, "reply dispatch failed, will retry next cycle");
            return CommentOutcome::Skipped(SkipReason::Dispatch);
        }

        info!(author, category = outcome.category(), "reply dispatched");
        history.push(author, outcome.category());

        // Dispatch succeeded; the pair must land in the ledger. A failed
        // write keeps the record in memory so the next persist includes it.
        if let Err(e) = ledger.append_and_persist(author, &normalized) {
            error!(
                error = %e,
                path = %ledger.path().display(),
                "ledger persist failed; record kept in memory"
            );
        }
        CommentOutcome::Replied
    }

    /// Bounded random delay between replies. Pacing, not correctness.
    async fn pace(&self) {
        let lo = self.cfg.pacing_min_ms.min(self.cfg.pacing_max_ms);
        let hi = self.cfg.pacing_min_ms.max(self.cfg.pacing_max_ms);
        if hi == 0 {
            return;
        }
        let ms = {
            use rand::Rng;
            rand::thread_rng().gen_range(lo..=hi)
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.cfg.backoff_base_secs.max(1);
        let secs = base.saturating_mul(1u64 << attempt.saturating_sub(1).min(8));
        Duration::from_secs(secs.min(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(cfg: EngineConfig) -> ReplyEngine {
        let dir = std::env::temp_dir().join("autoresponder-backoff-test");
        ReplyEngine::new(
            cfg,
            Arc::new(crate::source::MockFeed::new()),
            Arc::new(crate::source::RecordingReplyChannel::new()),
            Classifier::new(
                crate::classify::RuleTable::default(),
                Arc::new(crate::classify::LexiconOracle::new()),
            ),
            ReplyTemplates::default(),
            ReplyLedger::load(dir.join("replied.json")),
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let engine = engine_with(EngineConfig {
            backoff_base_secs: 2,
            ..Default::default()
        });
        assert_eq!(engine.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(engine.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(engine.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(engine.backoff_delay(10), Duration::from_secs(60));
    }
}
