// src/classify/mod.rs
//! Rule-first, oracle-fallback comment triage.
//!
//! Common commercial questions carry an unambiguous lexical signal, so the
//! ordered keyword table answers those without touching the model. Only
//! comments with no rule match are sent to the sentiment oracle.

pub mod oracle;
pub mod rules;

use serde::{Deserialize, Serialize};

pub use oracle::{
    build_oracle, DisabledOracle, DynOracle, FailingOracle, HttpOracle, LexiconOracle, MemoOracle,
    MockOracle, OracleError, SentimentLabel, SentimentOracle,
};
pub use rules::{load_rule_table, Intent, IntentRule, RuleTable};

/// Triage outcome for one comment: either a fixed commercial intent from
/// the rule table, or a sentiment label from the oracle. Exactly one of the
/// two is ever meaningful, which this enum encodes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Intent(Intent),
    Sentiment(SentimentLabel),
}

impl Classification {
    /// Short category name for logs and history entries.
    pub fn category(&self) -> &'static str {
        match self {
            Classification::Intent(i) => i.as_str(),
            Classification::Sentiment(_) => "sentiment",
        }
    }
}

pub struct Classifier {
    rules: RuleTable,
    oracle: DynOracle,
}

impl Classifier {
    pub fn new(rules: RuleTable, oracle: DynOracle) -> Self {
        Self { rules, oracle }
    }

    /// Classify normalized comment text. An oracle failure fails the whole
    /// classification; the caller skips the comment and it stays eligible
    /// for the next cycle.
    pub async fn classify(&self, normalized: &str) -> Result<Classification, OracleError> {
        if let Some(intent) = self.rules.first_match(normalized) {
            return Ok(Classification::Intent(intent));
        }
        let label = self.oracle.classify(normalized).await?;
        Ok(Classification::Sentiment(label))
    }

    pub fn oracle_name(&self) -> &'static str {
        self.oracle.name()
    }
}
