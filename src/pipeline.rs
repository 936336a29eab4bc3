use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::discovery::PairValidation;
use crate::label_map::LabelMap;
use crate::masker::{mask_document, MaskOptions, MaskStats};
use crate::reader::{DocumentReader, ReaderConfig};

/// Per-document processing status values used in stats output.
pub const STATUS_MASKED: &str = "masked";
pub const STATUS_SKIPPED: &str = "skipped";
pub const STATUS_FAILED: &str = "failed";

/// Batch driver configuration, resolved once from the CLI.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Abort the whole batch on the first document failure.
    pub fail_fast: bool,
    /// Process documents concurrently (bounded by the CPU count).
    pub parallel: bool,
    pub show_progress: bool,
    pub reader: ReaderConfig,
    pub mask: MaskOptions,
}

/// Per-file processing statistics.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileStats {
    pub stem: String,
    /// Source document path.
    pub path: String,
    #[serde(flatten)]
    pub counts: MaskStats,
    pub processing_time_ms: u64,
    /// Processing status (masked, skipped, failed).
    pub status: String,
    pub error: Option<String>,
}

/// Aggregate statistics for one corpus run, written as JSON to the stats path.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunStats {
    pub files_discovered: u64,
    pub files_masked: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub spans_masked: u64,
    pub overlaps_dropped: u64,
    pub malformed_lines: u64,
    pub total_processing_time_ms: u64,
    pub file_stats: Vec<FileStats>,
}

/// One document's result: its stats row and the console lines to print.
///
/// Diagnostics are rendered inside the document's future but printed by the
/// driver as completions arrive, so concurrent documents never interleave
/// output.
struct DocumentOutcome {
    stats: FileStats,
    messages: Vec<String>,
}

/// Process every discovered pair: read, mask, write `<stem>.txt` into the
/// output directory. Unpaired documents are skipped, failing documents are
/// recorded and the batch continues unless `fail_fast` is set.
pub async fn process_corpus(
    pairs: &[PairValidation],
    output_dir: &Path,
    label_map: Option<&LabelMap>,
    config: &PipelineConfig,
) -> Result<RunStats> {
    let run_start = Instant::now();
    let width = if config.parallel { num_cpus::get().max(1) } else { 1 };
    let reader = DocumentReader::new(config.reader.clone());

    info!(
        "Processing {} documents with concurrency {}",
        pairs.len(),
        width
    );

    let progress = if config.show_progress && !pairs.is_empty() {
        let bar = ProgressBar::new(pairs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let mut run = RunStats {
        files_discovered: pairs.len() as u64,
        ..Default::default()
    };

    let mut outcomes = stream::iter(pairs.iter().map(|pair| {
        let reader = reader.clone();
        async move { process_pair(pair, output_dir, label_map, config, &reader).await }
    }))
    .buffer_unordered(width);

    while let Some(outcome) = outcomes.next().await {
        let outcome = outcome?;
        progress.inc(1);

        for line in &outcome.messages {
            println!("{line}");
        }

        match outcome.stats.status.as_str() {
            STATUS_MASKED => run.files_masked += 1,
            STATUS_SKIPPED => run.files_skipped += 1,
            _ => run.files_failed += 1,
        }
        run.spans_masked += outcome.stats.counts.spans_masked;
        run.overlaps_dropped += outcome.stats.counts.overlaps_dropped;
        run.malformed_lines += outcome.stats.counts.malformed_lines;
        run.file_stats.push(outcome.stats);
    }
    progress.finish_and_clear();

    run.total_processing_time_ms = run_start.elapsed().as_millis() as u64;
    info!(
        "Corpus processing completed: {} masked, {} skipped, {} failed",
        run.files_masked, run.files_skipped, run.files_failed
    );
    Ok(run)
}

async fn process_pair(
    pair: &PairValidation,
    output_dir: &Path,
    label_map: Option<&LabelMap>,
    config: &PipelineConfig,
    reader: &DocumentReader,
) -> Result<DocumentOutcome> {
    let start = Instant::now();
    let verbosity = config.mask.verbosity;
    let mut messages = Vec::new();

    if let Some(ref error) = pair.error {
        if verbosity.reports() {
            messages.push(format!("\t{error}"));
        }
        return Ok(DocumentOutcome {
            stats: stats_without_output(pair, STATUS_SKIPPED, Some(error.clone()), start),
            messages,
        });
    }

    let text = match reader.read_document(&pair.text_path).await {
        Ok(text) => text,
        Err(e) => return document_failure(pair, e, config, verbosity.reports(), start),
    };
    let lines = match reader.read_annotation_lines(&pair.annotation_path).await {
        Ok(lines) => lines,
        Err(e) => return document_failure(pair, e, config, verbosity.reports(), start),
    };

    let outcome = mask_document(&text, &lines, label_map, &config.mask);
    for diagnostic in &outcome.diagnostics {
        messages.push(format!("\t{}: {}", pair.stem, diagnostic));
    }

    let output_path = output_dir.join(format!("{}.txt", pair.stem));
    if let Err(e) = tokio::fs::write(&output_path, &outcome.text)
        .await
        .with_context(|| format!("cannot write output file {}", output_path.display()))
    {
        return document_failure(pair, e, config, verbosity.reports(), start);
    }

    Ok(DocumentOutcome {
        stats: FileStats {
            stem: pair.stem.clone(),
            path: pair.text_path.display().to_string(),
            counts: outcome.stats,
            processing_time_ms: start.elapsed().as_millis() as u64,
            status: STATUS_MASKED.to_string(),
            error: None,
        },
        messages,
    })
}

fn document_failure(
    pair: &PairValidation,
    error: anyhow::Error,
    config: &PipelineConfig,
    reports: bool,
    start: Instant,
) -> Result<DocumentOutcome> {
    warn!("Failed to process {}: {:#}", pair.stem, error);
    if config.fail_fast {
        return Err(error);
    }

    let rendered = format!("{error:#}");
    let mut messages = Vec::new();
    if reports {
        messages.push(format!("\t{rendered}"));
    }
    Ok(DocumentOutcome {
        stats: stats_without_output(pair, STATUS_FAILED, Some(rendered), start),
        messages,
    })
}

fn stats_without_output(
    pair: &PairValidation,
    status: &str,
    error: Option<String>,
    start: Instant,
) -> FileStats {
    FileStats {
        stem: pair.stem.clone(),
        path: pair.text_path.display().to_string(),
        counts: MaskStats::default(),
        processing_time_ms: start.elapsed().as_millis() as u64,
        status: status.to_string(),
        error,
    }
}

/// Serialize run statistics to a JSON file.
pub async fn write_run_stats(stats: &RunStats, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("cannot serialize run stats")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("cannot write stats file {}", path.display()))
}
