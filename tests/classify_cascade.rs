// tests/classify_cascade.rs
use std::sync::Arc;

use comment_autoresponder::classify::{
    Classification, Classifier, Intent, LexiconOracle, MockOracle, RuleTable, SentimentLabel,
};
use comment_autoresponder::respond::ReplyTemplates;

#[tokio::test]
async fn keyword_rules_short_circuit_the_oracle() {
    let oracle = Arc::new(MockOracle::new(SentimentLabel::Positive));
    let classifier = Classifier::new(RuleTable::default(), oracle.clone());

    let got = classifier
        .classify("berapa harga dan jam buka?")
        .await
        .unwrap();

    // price is listed before hours, so it wins even with both triggers present
    assert_eq!(got, Classification::Intent(Intent::Price));
    assert_eq!(oracle.calls(), 0, "rule match must not invoke the oracle");
}

#[tokio::test]
async fn unmatched_comment_falls_back_to_oracle_label() {
    let oracle = Arc::new(MockOracle::new(SentimentLabel::Negative));
    let classifier = Classifier::new(RuleTable::default(), oracle.clone());

    let got = classifier.classify("video ini biasa aja").await.unwrap();
    assert_eq!(got, Classification::Sentiment(SentimentLabel::Negative));
    assert_eq!(oracle.calls(), 1);

    // the oracle's label flows unchanged into the rendered reply
    let templates = ReplyTemplates::default();
    let reply = templates.render(&got, "dina");
    assert_eq!(reply, templates.render(&Classification::Sentiment(SentimentLabel::Negative), "dina"));
    assert!(reply.starts_with("@dina "));
}

#[tokio::test]
async fn lexicon_backed_cascade_end_to_end() {
    let classifier = Classifier::new(RuleTable::default(), Arc::new(LexiconOracle::new()));

    assert_eq!(
        classifier.classify("bagus banget videonya").await.unwrap(),
        Classification::Sentiment(SentimentLabel::Positive)
    );
    assert_eq!(
        classifier.classify("cara beli gimana kak").await.unwrap(),
        Classification::Intent(Intent::HowToBuy)
    );
}
