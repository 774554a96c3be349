// src/classify/oracle.rs
//! Sentiment oracle port + providers.
//!
//! The engine only ever sees `SentimentOracle`; which provider sits behind
//! it is wiring. The lexicon provider keeps the bot fully functional
//! offline, the HTTP provider delegates to a remote model service, and the
//! memoizing wrapper makes remote answers deterministic for identical input
//! within a session while enforcing a daily call budget.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::OracleConfig;

/// Discrete sentiment label. Remote providers speak 0/1/2; the mapping into
/// this enum lives at the adapter boundary, not in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub fn from_index(idx: i64) -> Option<Self> {
        match idx {
            0 => Some(SentimentLabel::Negative),
            1 => Some(SentimentLabel::Neutral),
            2 => Some(SentimentLabel::Positive),
            _ => None,
        }
    }

    pub fn as_index(&self) -> i64 {
        match self {
            SentimentLabel::Negative => 0,
            SentimentLabel::Neutral => 1,
            SentimentLabel::Positive => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle transport error: {0}")]
    Transport(String),
    #[error("oracle returned malformed output: {0}")]
    Malformed(String),
    #[error("oracle daily budget exhausted")]
    BudgetExhausted,
    #[error("oracle disabled")]
    Disabled,
}

/// Classification oracle port: comment text in, discrete label out.
#[async_trait]
pub trait SentimentOracle: Send + Sync {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, OracleError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynOracle = std::sync::Arc<dyn SentimentOracle>;

/// Build an oracle according to config. Unknown providers fall back to the
/// lexicon with a warning rather than refusing to start.
pub fn build_oracle(cfg: &OracleConfig) -> DynOracle {
    match cfg.provider.to_ascii_lowercase().as_str() {
        "lexicon" => std::sync::Arc::new(LexiconOracle::new()),
        "http" => {
            let inner = HttpOracle::from_config(cfg);
            std::sync::Arc::new(MemoOracle::new(inner, cfg.daily_limit))
        }
        "disabled" => std::sync::Arc::new(DisabledOracle),
        other => {
            tracing::warn!(provider = other, "unknown oracle provider, using lexicon");
            std::sync::Arc::new(LexiconOracle::new())
        }
    }
}

// ------------------------------------------------------------
// Lexicon provider
// ------------------------------------------------------------

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Local word-score sentiment. Sums lexicon scores over alphanumeric
/// tokens, inverting a word's sign when a negator appears in the preceding
/// 1..=3 tokens ("tidak bagus" scores negative).
#[derive(Debug, Clone, Default)]
pub struct LexiconOracle;

impl LexiconOracle {
    pub fn new() -> Self {
        Self
    }

    fn score_text(&self, text: &str) -> i32 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score = 0i32;
        for i in 0..tokens.len() {
            let base = *LEXICON.get(tokens[i].as_str()).unwrap_or(&0);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }
        score
    }
}

#[async_trait]
impl SentimentOracle for LexiconOracle {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, OracleError> {
        let score = self.score_text(text);
        Ok(match score {
            s if s > 0 => SentimentLabel::Positive,
            s if s < 0 => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        })
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Alphanumeric tokens, lowercase.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "tidak" | "bukan" | "gak" | "ga" | "nggak" | "jangan" | "kurang" | "not" | "no" | "never"
    )
}

// ------------------------------------------------------------
// HTTP provider
// ------------------------------------------------------------

/// Remote model service: POST `{"text": ...}`, expect `{"label": 0|1|2}`.
pub struct HttpOracle {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpOracle {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("comment-autoresponder/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(cfg: &OracleConfig) -> Self {
        Self::new(cfg.endpoint.clone().unwrap_or_default(), cfg.resolved_api_key())
    }
}

#[async_trait]
impl SentimentOracle for HttpOracle {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, OracleError> {
        if self.endpoint.is_empty() {
            return Err(OracleError::Disabled);
        }

        #[derive(Serialize)]
        struct Req<'a> {
            text: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            label: i64,
        }

        let mut req = self.http.post(&self.endpoint).json(&Req { text });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(OracleError::Transport(format!(
                "status {}",
                resp.status()
            )));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        SentimentLabel::from_index(body.label)
            .ok_or_else(|| OracleError::Malformed(format!("label out of range: {}", body.label)))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// ------------------------------------------------------------
// Disabled + mock providers
// ------------------------------------------------------------

/// Always errors; comments with no rule match are skipped and retried.
pub struct DisabledOracle;

#[async_trait]
impl SentimentOracle for DisabledOracle {
    async fn classify(&self, _text: &str) -> Result<SentimentLabel, OracleError> {
        Err(OracleError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Fixed-answer oracle for tests and dry runs; counts invocations so tests
/// can assert the rule short-circuit never reached it.
pub struct MockOracle {
    pub fixed: SentimentLabel,
    calls: AtomicUsize,
}

impl MockOracle {
    pub fn new(fixed: SentimentLabel) -> Self {
        Self {
            fixed,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SentimentOracle for MockOracle {
    async fn classify(&self, _text: &str) -> Result<SentimentLabel, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.fixed)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Oracle that always fails, for exercising the skip-and-retry path.
pub struct FailingOracle;

#[async_trait]
impl SentimentOracle for FailingOracle {
    async fn classify(&self, _text: &str) -> Result<SentimentLabel, OracleError> {
        Err(OracleError::Transport("synthetic failure".into()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

// ------------------------------------------------------------
// Memoizing wrapper (session cache + daily budget)
// ------------------------------------------------------------

/// Wraps a provider with a per-session answer cache and a daily call
/// budget. Cache hits do not consume budget; identical input always yields
/// the identical label within a session.
pub struct MemoOracle<O> {
    inner: O,
    state: Mutex<MemoState>,
    daily_limit: u32,
}

#[derive(Debug)]
struct MemoState {
    memo: HashMap<String, SentimentLabel>,
    day: u64,
    calls_today: u32,
}

impl<O: SentimentOracle> MemoOracle<O> {
    pub fn new(inner: O, daily_limit: u32) -> Self {
        Self {
            inner,
            state: Mutex::new(MemoState {
                memo: HashMap::new(),
                day: today(),
                calls_today: 0,
            }),
            daily_limit,
        }
    }
}

#[async_trait]
impl<O: SentimentOracle> SentimentOracle for MemoOracle<O> {
    async fn classify(&self, text: &str) -> Result<SentimentLabel, OracleError> {
        {
            let mut g = self.state.lock().expect("memo oracle mutex poisoned");
            let now = today();
            if g.day != now {
                g.day = now;
                g.calls_today = 0;
            }
            if let Some(hit) = g.memo.get(text) {
                return Ok(*hit);
            }
            if g.calls_today >= self.daily_limit {
                return Err(OracleError::BudgetExhausted);
            }
        }

        let label = self.inner.classify(text).await?;

        let mut g = self.state.lock().expect("memo oracle mutex poisoned");
        g.calls_today = g.calls_today.saturating_add(1);
        if let Entry::Vacant(e) = g.memo.entry(text.to_string()) {
            e.insert(label);
        }
        Ok(label)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

/// Days since the UNIX epoch; equality is all the rollover check needs.
fn today() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        / 86_400
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lexicon_scores_positive_negative_neutral() {
        let oracle = LexiconOracle::new();
        assert_eq!(
            oracle.classify("bagus banget, suka!").await.unwrap(),
            SentimentLabel::Positive
        );
        assert_eq!(
            oracle.classify("kecewa, barang rusak").await.unwrap(),
            SentimentLabel::Negative
        );
        assert_eq!(
            oracle.classify("baru lihat video ini").await.unwrap(),
            SentimentLabel::Neutral
        );
    }

    #[tokio::test]
    async fn negation_flips_word_score() {
        let oracle = LexiconOracle::new();
        assert_eq!(
            oracle.classify("tidak bagus").await.unwrap(),
            SentimentLabel::Negative
        );
        assert_eq!(
            oracle.classify("ga jelek kok").await.unwrap(),
            SentimentLabel::Positive
        );
    }

    #[tokio::test]
    async fn memo_serves_repeats_without_spending_budget() {
        let memo = MemoOracle::new(MockOracle::new(SentimentLabel::Positive), 10);
        let first = memo.classify("keren").await.unwrap();
        let second = memo.classify("keren").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(memo.inner.calls(), 1);
    }

    #[tokio::test]
    async fn budget_exhaustion_is_reported_not_guessed() {
        let memo = MemoOracle::new(MockOracle::new(SentimentLabel::Neutral), 1);
        memo.classify("satu").await.unwrap();
        let err = memo.classify("dua").await.unwrap_err();
        assert!(matches!(err, OracleError::BudgetExhausted));
        // cached answer still served after exhaustion
        assert_eq!(
            memo.classify("satu").await.unwrap(),
            SentimentLabel::Neutral
        );
    }

    #[test]
    fn label_index_mapping_is_stable() {
        for idx in 0..=2 {
            let label = SentimentLabel::from_index(idx).unwrap();
            assert_eq!(label.as_index(), idx);
        }
        assert!(SentimentLabel::from_index(3).is_none());
        assert!(SentimentLabel::from_index(-1).is_none());
    }
}
