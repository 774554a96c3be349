//! Comment Autoresponder — Binary Entrypoint
//! Wires the configured feed/reply adapters, classifier and ledger into the
//! poll-process-reply engine and runs it until it fails unrecoverably.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use comment_autoresponder::classify::{build_oracle, load_rule_table, Classifier, RuleTable};
use comment_autoresponder::config::BotConfig;
use comment_autoresponder::engine::ReplyEngine;
use comment_autoresponder::ledger::ReplyLedger;
use comment_autoresponder::respond::ReplyTemplates;
use comment_autoresponder::source::snapshot::{OutboxReplyChannel, SnapshotFeed};

#[derive(Parser, Debug)]
#[command(version, about = "Comment triage and auto-reply engine")]
struct Args {
    #[arg(long, env = "AUTORESPONDER_CONFIG", default_value = "config/autoresponder.toml")]
    config: PathBuf,

    /// Target content page; overrides the config file.
    #[arg(long, env = "TARGET_VIDEO_URL")]
    video_url: Option<String>,

    /// Reply ledger location; overrides the config file.
    #[arg(long, env = "REPLY_LEDGER_PATH")]
    ledger: Option<PathBuf>,

    /// Run a single poll cycle and exit.
    #[arg(long)]
    once: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("comment_autoresponder=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op where the environment is set for real.
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Args::parse();
    let mut cfg = BotConfig::load_or_default(&args.config)?;
    if let Some(url) = args.video_url {
        cfg.video_url = url;
    }
    if let Some(path) = args.ledger {
        cfg.ledger_path = path;
    }

    let rules = match &cfg.rules_path {
        Some(path) => load_rule_table(path)
            .with_context(|| format!("loading rule table from {}", path.display()))?,
        None => RuleTable::default(),
    };
    let templates = match &cfg.templates_path {
        Some(path) => ReplyTemplates::load(path)
            .with_context(|| format!("loading reply templates from {}", path.display()))?,
        None => ReplyTemplates::default(),
    };

    let oracle = build_oracle(&cfg.oracle);
    let classifier = Classifier::new(rules, oracle);

    let ledger = ReplyLedger::load(&cfg.ledger_path);
    tracing::info!(
        records = ledger.len(),
        path = %cfg.ledger_path.display(),
        "reply ledger loaded"
    );

    // The browser driver is an external collaborator; the shipped adapters
    // bridge through files so the engine can run (and be audited) without it.
    let feed = Arc::new(SnapshotFeed::new(&cfg.snapshot_path));
    let replier = Arc::new(OutboxReplyChannel::new(&cfg.outbox_path));

    tracing::info!(
        video_url = %cfg.video_url,
        oracle = classifier.oracle_name(),
        "starting comment autoresponder"
    );

    let mut engine = ReplyEngine::new(
        cfg.engine,
        feed,
        replier,
        classifier,
        templates,
        ledger,
    );

    if args.once {
        let report = engine
            .run_cycle()
            .await
            .context("single poll cycle failed")?;
        tracing::info!(replied = report.replied, fetched = report.fetched, "single cycle done");
        return Ok(());
    }

    engine.run().await.context("engine stopped")?;
    Ok(())
}
