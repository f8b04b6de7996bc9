//! Run command implementation
//!
//! Loads the layered config, builds the item source once, then drives every
//! configured modality through the worker pool against a shared output queue.
//! A modality that fails to set up or aborts mid-run is reported and the next
//! one still runs; only a shutdown signal stops the whole invocation.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use geoset_core::{
    config::{load_config, ModalityConfig, Overrides, ResolvedOutput, SourceConfig},
    geo::{FeatureSource, GridSource, Region, TmsProducer},
    output::{ArchiveWriter, GeoTiffWriter, OutputFormat},
    pipeline::{ChunkProgress, ItemSource, ModalityOutcome, ModalityReport, RunSummary},
    AdmissionController, BatchCoordinator, Config, Error, OutputQueue, OutputSink, QueueRepository,
    RunStatistics, ShutdownCoordinator, WorkerPool,
};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
}

/// Run the producer over every configured modality
///
/// # Errors
///
/// Returns an error if the config cannot be loaded, the source cannot be
/// built, the queue cannot be opened, or the run was interrupted
pub async fn run(options: &RunOptions) -> Result<()> {
    let config = load_config(options.config.as_deref(), &options.overrides)
        .context("Failed to load configuration")?;

    if config.modalities.is_empty() {
        tracing::warn!("No modalities configured; nothing to do");
        println!("No modalities configured. Add a [[modalities]] table to the config.");
        return Ok(());
    }

    let shutdown = ShutdownCoordinator::new();
    shutdown.listen_for_signals()?;

    let source = build_source(&config).context("Failed to build item source")?;

    let queue = OutputQueue::open_with_timeout(&config.queue.db_path, config.busy_timeout())
        .await
        .with_context(|| {
            format!(
                "Failed to open output queue {}",
                config.queue.db_path.display()
            )
        })?;
    let queue = Arc::new(queue);

    let mut summary = RunSummary::default();
    for modality in &config.modalities {
        println!();
        println!("=== Modality: {} ===", modality.name);

        let report = run_modality(&config, modality, source.as_ref(), &queue, &shutdown).await;
        let cancelled = report.outcome == ModalityOutcome::Cancelled;
        summary.push(report);
        if cancelled || shutdown.is_shutting_down() {
            break;
        }
    }

    queue.close().await;
    print_summary(&summary);
    finish(&summary, shutdown.is_shutting_down())
}

/// Skipped or aborted modalities still exit 0; only a signal changes the
/// status.
fn finish(summary: &RunSummary, interrupted: bool) -> Result<()> {
    if interrupted || summary.was_cancelled() {
        return Err(Error::cancelled("Run interrupted by signal").into());
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════
// SETUP
// ═══════════════════════════════════════════════════════════════════════════

/// Build the item source shared by every modality.
///
/// A grid is materialized up front unless `incremental` is set, so each
/// modality iterates the same list without recomputing the region filter.
pub fn build_source(config: &Config) -> geoset_core::Result<Box<dyn ItemSource>> {
    match &config.source {
        None => Err(Error::config("No source configured")),
        Some(SourceConfig::File(file)) => {
            let source = FeatureSource::open(&file.path, &file.id_column, &file.label_column)?;
            println!(
                "Loaded {} items from {}",
                source.len(),
                source.path().display()
            );
            Ok(Box::new(source))
        }
        Some(SourceConfig::Grid(grid)) => {
            let region = grid
                .region
                .as_ref()
                .map(|r| Region::load(&r.path, &r.column, &r.value))
                .transpose()?;
            let source = GridSource::new(
                grid.bbox(),
                grid.spacing,
                grid.start_id,
                grid.start_label,
                region,
            )?;

            let info = source.grid_info();
            println!("Grid bbox:     {}", info.bbox);
            println!(
                "Grid spacing:  {:.6}° ({:.1} m)",
                info.spacing_degrees, info.spacing_meters
            );
            println!(
                "Grid points:   {} x {} = {}",
                info.num_points_x, info.num_points_y, info.total_points
            );
            if let Some(filter) = &info.region_filter {
                println!(
                    "Region filter: {} where {} = {}",
                    filter.path.display(),
                    filter.column,
                    filter.value
                );
            }

            if grid.incremental {
                Ok(Box::new(source))
            } else {
                let items = source.materialize();
                println!("Grid items after filtering: {}", items.size_hint());
                Ok(Box::new(items))
            }
        }
    }
}

/// Writer for a resolved output: GeoTIFF per item, or one archive per run.
pub fn build_sink(output: &ResolvedOutput, modality_name: &str) -> geoset_core::Result<OutputSink> {
    match output.format {
        OutputFormat::Tif => {
            let writer = GeoTiffWriter::new(&output.dir, &output.crs, output.compression)?;
            Ok(OutputSink::PerItem(Arc::new(writer)))
        }
        OutputFormat::Archive => {
            let writer = ArchiveWriter::new(&output.dir, modality_name)?;
            Ok(OutputSink::Batched(Arc::new(writer)))
        }
    }
}

fn build_producer(modality: &ModalityConfig) -> geoset_core::Result<TmsProducer> {
    if modality.kind != "tms" {
        return Err(Error::config(format!(
            "Unsupported modality type '{}' for '{}' (expected 'tms')",
            modality.kind, modality.name
        )));
    }
    TmsProducer::new(
        modality.tile_server.clone(),
        modality.bbox_size,
        modality.zoom_level,
        modality.blank_on_fetch_error,
    )
}

// ═══════════════════════════════════════════════════════════════════════════
// EXECUTION
// ═══════════════════════════════════════════════════════════════════════════

async fn run_modality(
    config: &Config,
    modality: &ModalityConfig,
    source: &dyn ItemSource,
    queue: &Arc<OutputQueue>,
    shutdown: &ShutdownCoordinator,
) -> ModalityReport {
    let setup = config.output_for(modality).and_then(|output| {
        let producer = build_producer(modality)?;
        let sink = build_sink(&output, &modality.name)?;
        Ok((output, producer, sink))
    });
    let (output, producer, sink) = match setup {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!(modality = %modality.name, error = %e, "Skipping modality");
            println!("Skipping {}: {e}", modality.name);
            return ModalityReport::aborted(&modality.name, RunStatistics::default(), e.to_string());
        }
    };

    println!(
        "Output: {} -> {} (zoom {}, {} px, {})",
        output.format,
        output.dir.display(),
        modality.zoom_level,
        producer.target_size(),
        modality.tile_server
    );

    let queue: Arc<dyn QueueRepository> = Arc::clone(queue) as Arc<dyn QueueRepository>;
    let admission = AdmissionController::new(queue, config.queue.max_unprocessed)
        .with_policy(config.queue.ceiling)
        .with_poll_interval(config.poll_interval())
        .with_shutdown(shutdown.token());
    let pool = WorkerPool::new(
        Arc::new(admission),
        Arc::new(producer),
        config.run.num_workers,
    );
    let coordinator = BatchCoordinator::new(pool, config.run.batch_size);
    let admission = coordinator.pool().admission();
    println!(
        "Run: batch size {}, {} worker(s), ceiling {} {} output(s)",
        coordinator.batch_size(),
        coordinator.pool().num_workers(),
        admission.max_unprocessed(),
        admission.policy()
    );

    let mut partial = RunStatistics::default();
    let result = coordinator
        .run_with_progress(source, &sink, |progress: &ChunkProgress| {
            print_progress(progress);
            partial = progress.totals;
        })
        .await;

    match result {
        Ok(stats) => ModalityReport::completed(&modality.name, stats),
        Err(Error::Cancelled(msg)) => {
            tracing::warn!(modality = %modality.name, "Run cancelled: {msg}");
            ModalityReport::cancelled(&modality.name, partial)
        }
        Err(e) => {
            tracing::error!(modality = %modality.name, error = %e, "Modality aborted");
            println!("Aborted {}: {e}", modality.name);
            ModalityReport::aborted(&modality.name, partial, e.to_string())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════

fn print_progress(progress: &ChunkProgress) {
    let chunk = &progress.chunk_stats;
    println!(
        "Chunk {}: {}/{} items | saved {} | skipped {} | failed {}",
        progress.chunk,
        progress.processed,
        progress.expected,
        chunk.saved,
        chunk.skipped,
        chunk.failed
    );
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Summary:");
    for report in &summary.modalities {
        let status = match &report.outcome {
            ModalityOutcome::Completed => "completed".to_string(),
            ModalityOutcome::Aborted { error } => format!("aborted ({error})"),
            ModalityOutcome::Cancelled => "cancelled".to_string(),
        };
        println!("  {}: {} [{status}]", report.name, report.stats);
    }
    println!("  Total: {}", summary.total);
}
