// src/respond.rs
//! Reply text generation: a pure lookup from classification to a template,
//! with `{author}` interpolation. No I/O and no failure modes; an override
//! file may replace individual templates, and any entry left empty falls
//! back to the generic thank-you so the bot can never post a blank reply.

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::{Classification, Intent, SentimentLabel};

const FALLBACK: &str = "@{author} Terima kasih atas komentarnya!";

fn default_price() -> String {
    "@{author} Halo kak! Harga lengkapnya bisa dicek di keranjang kuning ya. Terima kasih!".into()
}
fn default_hours() -> String {
    "@{author} Kami buka setiap hari pukul 09.00-21.00 WIB ya kak!".into()
}
fn default_how_to_buy() -> String {
    "@{author} Cara belinya gampang kak: klik keranjang kuning, pilih varian, lalu checkout ya!"
        .into()
}
fn default_negative() -> String {
    "@{author} Mohon maaf atas pengalamannya kak. Silakan DM kami supaya bisa dibantu ya.".into()
}
fn default_neutral() -> String {
    "@{author} Terima kasih atas komentarnya kak!".into()
}
fn default_positive() -> String {
    "@{author} Terima kasih banyak kak, senang sekali kamu suka!".into()
}
fn default_fallback() -> String {
    FALLBACK.into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyTemplates {
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_hours")]
    pub hours: String,
    #[serde(default = "default_how_to_buy")]
    pub how_to_buy: String,
    #[serde(default = "default_negative")]
    pub negative: String,
    #[serde(default = "default_neutral")]
    pub neutral: String,
    #[serde(default = "default_positive")]
    pub positive: String,
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

impl Default for ReplyTemplates {
    fn default() -> Self {
        Self {
            price: default_price(),
            hours: default_hours(),
            how_to_buy: default_how_to_buy(),
            negative: default_negative(),
            neutral: default_neutral(),
            positive: default_positive(),
            fallback: default_fallback(),
        }
    }
}

impl ReplyTemplates {
    /// Load overrides from a JSON file; absent fields keep their defaults.
    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Deterministic template lookup + `{author}` interpolation.
    pub fn render(&self, outcome: &Classification, author: &str) -> String {
        let template: &str = match outcome {
            Classification::Intent(Intent::Price) => &self.price,
            Classification::Intent(Intent::Hours) => &self.hours,
            Classification::Intent(Intent::HowToBuy) => &self.how_to_buy,
            Classification::Sentiment(SentimentLabel::Negative) => &self.negative,
            Classification::Sentiment(SentimentLabel::Neutral) => &self.neutral,
            Classification::Sentiment(SentimentLabel::Positive) => &self.positive,
        };
        let template: &str = if template.trim().is_empty() {
            if self.fallback.trim().is_empty() {
                FALLBACK
            } else {
                &self.fallback
            }
        } else {
            template
        };
        template.replace("{author}", author)
    }
}
