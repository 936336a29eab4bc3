use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use shroud::diagnostics::Verbosity;
use shroud::discovery::{self, DiscoveryConfig};
use shroud::label_map::LabelMap;
use shroud::masker::MaskOptions;
use shroud::pipeline::{self, PipelineConfig};
use shroud::reader::ReaderConfig;

#[derive(Parser, Debug)]
#[command(name = "shroud")]
#[command(about = "Mask a plain-text corpus using Brat standoff annotations")]
#[command(version)]
struct Args {
    /// Folder with the original input files
    #[arg(short = 'i', long, default_value = "input")]
    input_dir: PathBuf,

    /// Folder with Brat annotation files
    #[arg(short = 't', long, default_value = "tagged")]
    tagged_dir: PathBuf,

    /// Folder to store the output masked files
    #[arg(short = 'o', long, default_value = "output")]
    output_dir: PathBuf,

    /// Path to file with custom masks for annotations
    #[arg(short = 'c', long)]
    custom_file: Option<PathBuf>,

    /// Use only labels in the custom masks file
    #[arg(long, requires = "custom_file")]
    custom_only: bool,

    /// Increase output verbosity
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Do not print anything
    #[arg(short, long)]
    quiet: bool,

    /// Abort on first document failure
    #[arg(long)]
    fail_fast: bool,

    /// Process documents concurrently
    #[arg(long)]
    parallel: bool,

    /// Suppress console progress bar
    #[arg(long)]
    no_progress: bool,

    /// Use memory-mapped I/O for document text
    #[arg(long)]
    use_mmap: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Operational logs go to stderr; stdout stays reserved for diagnostics.
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let run_start = Instant::now();
    let args = Args::parse();
    let verbosity = Verbosity::from_flags(args.verbose, args.quiet);

    info!("Starting shroud");
    info!(?args, "Parsed CLI arguments");

    for (dir, what) in [(&args.input_dir, "Input"), (&args.tagged_dir, "Tagged")] {
        if !dir.exists() {
            anyhow::bail!("{} directory does not exist: {}", what, dir.display());
        }
        if !dir.is_dir() {
            anyhow::bail!("{} path is not a directory: {}", what, dir.display());
        }
    }
    tokio::fs::create_dir_all(&args.output_dir).await?;

    // Load the custom table before touching any document; a broken table must
    // stop the run, not silently change masking semantics.
    let label_map = match args.custom_file {
        Some(ref path) => Some(LabelMap::load(path).await?),
        None => None,
    };
    if let Some(ref map) = label_map {
        info!("Loaded custom mask table with {} entries", map.len());
    }

    if verbosity.reports() {
        println!("Masking your corpus...\n");
        println!("Loading list of files...");
    }

    let discovery_config = DiscoveryConfig {
        fail_fast: args.fail_fast,
    };
    let pairs = if args.parallel {
        discovery::collect_document_pairs_parallel(
            &args.input_dir,
            &args.tagged_dir,
            discovery_config,
        )
        .await?
    } else {
        discovery::collect_document_pairs(&args.input_dir, &args.tagged_dir, discovery_config)
            .await?
    };

    if verbosity.reports() {
        println!("Corpus file list loaded!\n");
        println!("Processing corpus...");
    }

    let pipeline_config = PipelineConfig {
        fail_fast: args.fail_fast,
        parallel: args.parallel,
        show_progress: !args.no_progress && verbosity.reports(),
        reader: ReaderConfig {
            use_mmap: args.use_mmap,
            ..Default::default()
        },
        mask: MaskOptions {
            custom_only: args.custom_only,
            verbosity,
        },
    };

    let run_stats = pipeline::process_corpus(
        &pairs,
        &args.output_dir,
        label_map.as_ref(),
        &pipeline_config,
    )
    .await?;

    pipeline::write_run_stats(&run_stats, &args.stats_out).await?;

    if verbosity.reports() {
        println!("\nCorpus processing completed!\n");
        println!(
            "Masked {} documents ({} skipped, {} failed), {} spans masked",
            run_stats.files_masked,
            run_stats.files_skipped,
            run_stats.files_failed,
            run_stats.spans_masked
        );
        println!(
            "Processing time: {:.2} seconds.\n",
            run_start.elapsed().as_secs_f64()
        );
    }

    info!(
        "Run complete: {} masked, {} skipped, {} failed",
        run_stats.files_masked, run_stats.files_skipped, run_stats.files_failed
    );
    Ok(())
}
