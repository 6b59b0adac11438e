//! Directory ingestion: streamed batches, progress, and a closing summary.

use std::io::Write;
use std::time::{Duration, Instant};

use proview_core::pipeline::FileDiscovery;
use proview_core::{IngestStats, RecordWriter};

use super::{prepare_record, OpenArgs, OpenContext};

/// Ingest `args.input` as a directory, writing records as each batch settles.
pub async fn ingest_directory<W: Write>(
    ctx: &OpenContext,
    args: &OpenArgs,
    mut writer: RecordWriter<W>,
) -> anyhow::Result<(IngestStats, W)> {
    let coordinator = ctx.proview.coordinator();
    let listing = coordinator.list(&args.input).await?;

    let total_bytes = FileDiscovery::total_size(&listing.files);
    let mut stats = IngestStats {
        truncated: listing.truncated,
        ..IngestStats::default()
    };
    tracing::info!("Found {} asset(s) to ingest", listing.files.len());

    let progress = create_progress_bar(listing.files.len() as u64);
    let start_time = Instant::now();
    let mut batches = coordinator.ingest_listing(listing);

    while let Some(mut batch) = batches.recv().await {
        for record in &mut batch.records {
            prepare_record(record, args)?;
        }
        writer.write_batch(&batch)?;

        for failure in &batch.failures {
            tracing::error!("Failed: {:?} - {}", failure.path, failure.error);
        }
        stats.succeeded += batch.records.len();
        stats.failed += batch.failures.len();

        progress.inc((batch.records.len() + batch.failures.len()) as u64);
        let elapsed = start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let rate = (stats.succeeded + stats.failed) as f64 / elapsed;
            progress.set_message(format!("batch {} - {:.1} files/sec", batch.index + 1, rate));
        }
    }

    let out = writer.finish()?;
    progress.finish_and_clear();

    let elapsed = start_time.elapsed();
    stats.total_seconds = elapsed.as_secs_f64();
    print_summary(&stats, total_bytes, elapsed);

    Ok((stats, out))
}

/// Create a progress bar for directory ingestion.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    match ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => tracing::debug!("Default progress style: {e}"),
    }
    pb.set_message("listing...");
    pb
}

/// Print a formatted summary table to stderr.
fn print_summary(stats: &IngestStats, total_bytes: u64, elapsed: Duration) {
    let total = stats.succeeded + stats.failed;
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { total as f64 / secs } else { 0.0 };
    let throughput = if secs > 0.0 {
        total_bytes as f64 / 1_000_000.0 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Ingested:     {:>8}", stats.succeeded);
    if stats.failed > 0 {
        eprintln!("    Failed:       {:>8}", stats.failed);
    }
    if stats.truncated > 0 {
        eprintln!("    Over cap:     {:>8}", stats.truncated);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} files/sec", rate);
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    eprintln!("  ====================================");
}
