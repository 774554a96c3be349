// tests/engine_dedup.rs
// Dedup is keyed on the (author, normalized comment) pair and must hold
// across normalization noise, repeated snapshots, and process restarts.

use std::sync::Arc;

use comment_autoresponder::classify::{Classifier, LexiconOracle, RuleTable};
use comment_autoresponder::engine::{EngineConfig, ReplyEngine};
use comment_autoresponder::ledger::ReplyLedger;
use comment_autoresponder::respond::ReplyTemplates;
use comment_autoresponder::source::{MockFeed, RecordingReplyChannel, ScrapedComment};

fn test_engine_config() -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 0,
        section_timeout_secs: 5,
        pacing_min_ms: 0,
        pacing_max_ms: 0,
        max_transient_retries: 2,
        backoff_base_secs: 1,
    }
}

#[tokio::test]
async fn answered_author_is_skipped_but_other_author_with_same_text_is_not() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("replied.json");

    // a previous run already answered alice
    let mut seeded = ReplyLedger::load(&ledger_path);
    seeded.append_and_persist("alice", "harga dong").unwrap();
    drop(seeded);

    let feed = Arc::new(MockFeed::repeating(vec![
        // raw text differs from the recorded pair only by case + timestamp noise
        ScrapedComment::new("alice", "Harga dong 3d ago"),
        ScrapedComment::new("bob", "Harga dong"),
    ]));
    let replier = Arc::new(RecordingReplyChannel::new());

    let mut engine = ReplyEngine::new(
        test_engine_config(),
        feed,
        replier.clone(),
        Classifier::new(RuleTable::default(), Arc::new(LexiconOracle::new())),
        ReplyTemplates::default(),
        ReplyLedger::load(&ledger_path),
    );

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.already_replied, 1);
    assert_eq!(report.replied, 1);

    let sent = replier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "bob");
}

#[tokio::test]
async fn restart_reloads_every_answered_pair() {
    let dir = tempfile::tempdir().unwrap();
    let ledger_path = dir.path().join("replied.json");

    let snapshot = vec![
        ScrapedComment::new("x", "Berapa harga baju ini?"),
        ScrapedComment::new("y", "jam buka sampai kapan?"),
        ScrapedComment::new("z", "mantap banget"),
    ];

    {
        let replier = Arc::new(RecordingReplyChannel::new());
        let mut engine = ReplyEngine::new(
            test_engine_config(),
            Arc::new(MockFeed::repeating(snapshot.clone())),
            replier.clone(),
            Classifier::new(RuleTable::default(), Arc::new(LexiconOracle::new())),
            ReplyTemplates::default(),
            ReplyLedger::load(&ledger_path),
        );
        let report = engine.run_cycle().await.unwrap();
        assert_eq!(report.replied, 3);
    }

    // "process restart": fresh engine, fresh ledger load, same snapshot
    let replier = Arc::new(RecordingReplyChannel::new());
    let reloaded = ReplyLedger::load(&ledger_path);
    assert_eq!(reloaded.len(), 3);
    for record in reloaded.records() {
        assert!(reloaded.contains(&record.username, &record.comment));
    }

    let mut engine = ReplyEngine::new(
        test_engine_config(),
        Arc::new(MockFeed::repeating(snapshot)),
        replier.clone(),
        Classifier::new(RuleTable::default(), Arc::new(LexiconOracle::new())),
        ReplyTemplates::default(),
        reloaded,
    );
    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.replied, 0);
    assert_eq!(report.already_replied, 3);
    assert!(replier.sent().is_empty());
}

#[tokio::test]
async fn duplicate_rows_in_one_snapshot_get_one_reply() {
    let dir = tempfile::tempdir().unwrap();
    let feed = Arc::new(MockFeed::repeating(vec![
        ScrapedComment::new("alice", "harga dong"),
        ScrapedComment::new("alice", "harga dong  2h ago"),
    ]));
    let replier = Arc::new(RecordingReplyChannel::new());

    let mut engine = ReplyEngine::new(
        test_engine_config(),
        feed,
        replier.clone(),
        Classifier::new(RuleTable::default(), Arc::new(LexiconOracle::new())),
        ReplyTemplates::default(),
        ReplyLedger::load(dir.path().join("replied.json")),
    );

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.replied, 1);
    assert_eq!(report.already_replied, 1);
    assert_eq!(replier.sent().len(), 1);
}
