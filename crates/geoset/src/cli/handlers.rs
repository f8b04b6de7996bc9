//! CLI command handlers that bridge between `clap` and the commands

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use geoset_core::{config::Overrides, QueueStatus};

use crate::commands::{
    bbox_size::{self, BboxSizeOptions},
    queue::{self, QueueAction, QueueOptions},
    run::{self, RunOptions},
};

const DEFAULT_QUEUE_DB: &str = "output_queue.db";

/// Initialize tracing to stderr. `RUST_LOG` wins over `--verbose`.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}

/// Format an error for user display (no stack traces)
pub fn format_error(err: &anyhow::Error) -> String {
    let msg = err.to_string();
    if let Some(source) = err.source() {
        let source_msg = source.to_string();
        if !msg.contains(&source_msg) && !source_msg.is_empty() {
            return format!("{msg}\nCause: {source_msg}");
        }
    }
    msg
}

pub async fn dispatch(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("run", sub_m)) => handle_run(sub_m).await,
        Some(("queue", sub_m)) => handle_queue(sub_m).await,
        Some(("bbox-size", sub_m)) => handle_bbox_size(sub_m),
        _ => anyhow::bail!("Unknown command. Run 'geoset --help' for usage."),
    }
}

fn count_arg(sub_m: &ArgMatches, name: &str) -> Result<Option<usize>> {
    sub_m
        .get_one::<u64>(name)
        .map(|&n| usize::try_from(n).with_context(|| format!("--{name} is too large")))
        .transpose()
}

pub async fn handle_run(sub_m: &ArgMatches) -> Result<()> {
    let options = RunOptions {
        config: sub_m.get_one::<PathBuf>("config").cloned(),
        overrides: Overrides {
            max_unprocessed: count_arg(sub_m, "max-unprocessed")?,
            queue_db: sub_m.get_one::<PathBuf>("queue-db").cloned(),
            batch_size: count_arg(sub_m, "batch-size")?,
            num_workers: count_arg(sub_m, "num-workers")?,
        },
    };
    run::run(&options).await
}

/// `--queue-db`, else `GEOSET_QUEUE_DB`, else the default file name.
fn queue_db_path(sub_m: &ArgMatches) -> PathBuf {
    sub_m
        .get_one::<PathBuf>("queue-db")
        .cloned()
        .or_else(|| {
            std::env::var("GEOSET_QUEUE_DB")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_QUEUE_DB))
}

fn key_arg(sub_m: &ArgMatches) -> Result<String> {
    sub_m
        .get_one::<String>("key")
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("KEY is required"))
}

pub async fn handle_queue(sub_m: &ArgMatches) -> Result<()> {
    let (action, action_m) = match sub_m.subcommand() {
        Some(("status", m)) => (QueueAction::Status, m),
        Some(("list", m)) => {
            let status = m
                .get_one::<String>("status")
                .map(|s| s.parse::<QueueStatus>())
                .transpose()?;
            (QueueAction::List { status }, m)
        }
        Some(("next", m)) => (QueueAction::Next, m),
        Some(("claim", m)) => (QueueAction::Claim { key: key_arg(m)? }, m),
        Some(("complete", m)) => (QueueAction::Complete { key: key_arg(m)? }, m),
        Some(("sweep", m)) => (QueueAction::Sweep, m),
        _ => anyhow::bail!("Unknown queue subcommand. Run 'geoset queue --help' for usage."),
    };

    let options = QueueOptions {
        db_path: queue_db_path(action_m),
        json: action_m.get_flag("json"),
        action,
    };
    queue::run(&options).await
}

pub fn handle_bbox_size(sub_m: &ArgMatches) -> Result<()> {
    let width = sub_m.get_one::<u32>("width").copied();
    let height = sub_m.get_one::<u32>("height").copied();
    let zoom = sub_m.get_one::<u8>("zoom").copied().unwrap_or(18);

    let (Some(width), Some(height)) = (width, height) else {
        anyhow::bail!("--width and --height are required");
    };

    bbox_size::run(&BboxSizeOptions {
        width,
        height,
        zoom,
        json: sub_m.get_flag("json"),
    })
}
