// src/classify/rules.rs
//! Ordered keyword rule table for the fixed commercial intents.
//!
//! Table order is a total priority: the first rule whose trigger set has a
//! member contained in the (already normalized) comment wins, so a comment
//! carrying both a price and an hours trigger classifies as price. The
//! built-in table can be replaced from a JSON file of the same shape:
//!
//! ```json
//! { "rules": [ { "intent": "price", "triggers": ["harga", "berapa"] } ] }
//! ```

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Fixed commercial intents answered without consulting the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Price,
    Hours,
    HowToBuy,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Price => "price",
            Intent::Hours => "hours",
            Intent::HowToBuy => "how_to_buy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentRule {
    pub intent: Intent,
    pub triggers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTable {
    pub rules: Vec<IntentRule>,
}

impl Default for RuleTable {
    /// Built-in storefront table; trigger phrases are stored lowercase
    /// because matching runs against normalized text.
    fn default() -> Self {
        Self {
            rules: vec![
                IntentRule {
                    intent: Intent::Price,
                    triggers: vec![
                        "harga".into(),
                        "berapa".into(),
                        "diskon".into(),
                        "price".into(),
                    ],
                },
                IntentRule {
                    intent: Intent::Hours,
                    triggers: vec![
                        "jam buka".into(),
                        "jam tutup".into(),
                        "jam operasional".into(),
                        "buka sampai".into(),
                        "opening hours".into(),
                    ],
                },
                IntentRule {
                    intent: Intent::HowToBuy,
                    triggers: vec![
                        "cara beli".into(),
                        "cara order".into(),
                        "cara pesan".into(),
                        "beli dimana".into(),
                        "how to buy".into(),
                    ],
                },
            ],
        }
    }
}

impl RuleTable {
    /// First matching rule wins; `None` routes the comment to the oracle.
    pub fn first_match(&self, normalized: &str) -> Option<Intent> {
        self.rules
            .iter()
            .find(|r| r.triggers.iter().any(|t| normalized.contains(t.as_str())))
            .map(|r| r.intent)
    }
}

pub fn load_rule_table(path: &Path) -> io::Result<RuleTable> {
    let bytes = std::fs::read(path)?;
    let table: RuleTable = serde_json::from_slice(&bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_outranks_hours() {
        let table = RuleTable::default();
        assert_eq!(
            table.first_match("berapa harga dan jam buka?"),
            Some(Intent::Price)
        );
    }

    #[test]
    fn hours_outranks_how_to_buy() {
        let table = RuleTable::default();
        assert_eq!(
            table.first_match("jam buka kapan? cara beli gimana?"),
            Some(Intent::Hours)
        );
    }

    #[test]
    fn unmatched_text_falls_through() {
        let table = RuleTable::default();
        assert_eq!(table.first_match("bagus banget videonya"), None);
    }

    #[test]
    fn custom_table_parses_and_keeps_order() {
        let json = r#"{
            "rules": [
                { "intent": "how_to_buy", "triggers": ["order"] },
                { "intent": "price", "triggers": ["order", "harga"] }
            ]
        }"#;
        let table: RuleTable = serde_json::from_str(json).unwrap();
        // both rules trigger on "order"; the earlier one must win
        assert_eq!(table.first_match("mau order dong"), Some(Intent::HowToBuy));
    }
}
