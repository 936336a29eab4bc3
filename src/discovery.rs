use anyhow::Result;
use futures::stream::{self, Stream, StreamExt};
use glob::glob;
use ignore::{WalkBuilder, WalkState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Configuration for corpus discovery behavior.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Whether to fail fast on first traversal error or continue.
    pub fail_fast: bool,
}

/// One discovered document with its pairing status.
///
/// Documents are matched to annotations by base filename: the partner of
/// `<any>/<stem>.txt` is `<tagged_dir>/<stem>.ann`, a flat join regardless of
/// the document's subdirectory. A missing partner is recorded here, not
/// raised; the pipeline reports and skips it.
#[derive(Debug, Clone)]
pub struct PairValidation {
    pub stem: String,
    pub text_path: PathBuf,
    pub annotation_path: PathBuf,
    pub error: Option<String>,
}

impl PairValidation {
    pub fn is_paired(&self) -> bool {
        self.error.is_none()
    }
}

/// Discovers all `.txt` documents recursively under the input directory and
/// pairs each with its annotation file in the tagged directory.
/// Returns an async stream of pairing results.
pub fn discover_pairs(
    input_dir: impl AsRef<Path>,
    tagged_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<PairValidation>> {
    let state = DiscoveryState::new(
        input_dir.as_ref().to_path_buf(),
        tagged_dir.as_ref().to_path_buf(),
        config,
    );

    futures::stream::unfold(state, |mut state| async move {
        state.next_pair().await.map(|result| (result, state))
    })
}

/// Parallel directory traversal variant for large corpora.
pub fn discover_pairs_parallel(
    input_dir: impl AsRef<Path>,
    tagged_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<PairValidation>> {
    let input_path = input_dir.as_ref().to_path_buf();
    let tagged_path = Arc::new(tagged_dir.as_ref().to_path_buf());
    let config = Arc::new(config);

    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        info!("Starting directory traversal in: {}", input_path.display());
        let traversal_start = std::time::Instant::now();

        let walker = WalkBuilder::new(&input_path)
            .threads((num_cpus::get() / 2).max(1))
            .follow_links(false)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .build_parallel();

        let (result_tx, result_rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            walker.run(|| {
                let result_tx = result_tx.clone();
                Box::new(move |result| {
                    if let Ok(entry) = result {
                        if entry.file_type().is_some_and(|ft| ft.is_file())
                            && entry.path().extension().is_some_and(|ext| ext == "txt")
                        {
                            debug!("Found document: {}", entry.path().display());
                            let _ = result_tx.send(entry.path().to_path_buf());
                        }
                    }
                    WalkState::Continue
                })
            });
            drop(result_tx);
        });

        let mut pair_count = 0;
        while let Ok(path) = result_rx.recv() {
            pair_count += 1;

            match validate_pair(&path, &tagged_path).await {
                Ok(validation) => {
                    if tx.send(Ok(validation)).is_err() {
                        debug!("Receiver dropped, stopping discovery");
                        break;
                    }
                }
                Err(e) => {
                    if config.fail_fast {
                        if tx.send(Err(e)).is_err() {
                            debug!("Receiver dropped, stopping discovery");
                        }
                        break;
                    } else {
                        warn!("Pair validation error (continuing): {}", e);
                    }
                }
            }
        }

        let traversal_time = traversal_start.elapsed();
        info!(
            "Discovery and pairing completed in {:.2}ms, streamed {} documents",
            traversal_time.as_millis(),
            pair_count
        );
    });

    stream::unfold(rx, |mut receiver| async move {
        receiver.recv().await.map(|result| (result, receiver))
    })
}

/// Pair one document path with its annotation file.
async fn validate_pair(text_path: &Path, tagged_dir: &Path) -> Result<PairValidation> {
    let stem = text_path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("document has no usable stem: {}", text_path.display()))?;

    let annotation_path = tagged_dir.join(format!("{stem}.ann"));

    let error = match fs::metadata(&annotation_path).await {
        Ok(metadata) if metadata.is_file() => None,
        Ok(_) => Some(format!(
            "Annotation path is not a file: {}",
            annotation_path.display()
        )),
        Err(_) => Some(format!("File {} does not exist!", annotation_path.display())),
    };

    if let Some(ref message) = error {
        warn!("{}", message);
    }

    Ok(PairValidation {
        stem,
        text_path: text_path.to_path_buf(),
        annotation_path,
        error,
    })
}

/// Internal state for serial pair discovery.
struct DiscoveryState {
    input_dir: PathBuf,
    tagged_dir: PathBuf,
    config: DiscoveryConfig,
    glob_iter: Option<glob::Paths>,
}

impl DiscoveryState {
    fn new(input_dir: PathBuf, tagged_dir: PathBuf, config: DiscoveryConfig) -> Self {
        Self {
            input_dir,
            tagged_dir,
            config,
            glob_iter: None,
        }
    }

    async fn next_pair(&mut self) -> Option<Result<PairValidation>> {
        if self.glob_iter.is_none() {
            let pattern = format!("{}/**/*.txt", self.input_dir.display());
            debug!("Starting corpus discovery with pattern: {}", pattern);

            match glob(&pattern) {
                Ok(paths) => {
                    self.glob_iter = Some(paths);
                    info!("Corpus discovery initialized for: {}", self.input_dir.display());
                }
                Err(e) => {
                    return Some(Err(anyhow::anyhow!("Failed to create glob pattern: {}", e)));
                }
            }
        }

        if let Some(ref mut glob_iter) = self.glob_iter {
            match glob_iter.next() {
                Some(Ok(path)) => {
                    debug!("Found document: {}", path.display());
                    Some(validate_pair(&path, &self.tagged_dir).await)
                }
                Some(Err(e)) => {
                    let error_msg = format!("Glob iteration error: {e}");
                    warn!("{}", error_msg);

                    if self.config.fail_fast {
                        Some(Err(anyhow::anyhow!(error_msg)))
                    } else {
                        // Continue to next file on non-fatal glob errors
                        Box::pin(self.next_pair()).await
                    }
                }
                None => {
                    info!("Corpus discovery completed");
                    None
                }
            }
        } else {
            None
        }
    }
}

/// Collect all discovered pairs into a Vec for easier processing.
pub async fn collect_document_pairs(
    input_dir: impl AsRef<Path>,
    tagged_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> Result<Vec<PairValidation>> {
    let mut pairs = Vec::new();
    let mut stream = Box::pin(discover_pairs(input_dir, tagged_dir, config));

    while let Some(result) = stream.next().await {
        pairs.push(result?);
    }

    summarize(&pairs, "Corpus discovery");
    Ok(pairs)
}

/// Collect all discovered pairs using parallel directory traversal.
pub async fn collect_document_pairs_parallel(
    input_dir: impl AsRef<Path>,
    tagged_dir: impl AsRef<Path>,
    config: DiscoveryConfig,
) -> Result<Vec<PairValidation>> {
    let mut pairs = Vec::new();
    let mut stream = Box::pin(discover_pairs_parallel(input_dir, tagged_dir, config));

    while let Some(result) = stream.next().await {
        pairs.push(result?);
    }

    summarize(&pairs, "Parallel corpus discovery");
    Ok(pairs)
}

fn summarize(pairs: &[PairValidation], what: &str) {
    let paired = pairs.iter().filter(|p| p.is_paired()).count();
    let unpaired = pairs.len() - paired;

    if unpaired > 0 {
        warn!("Found {} documents without annotation files", unpaired);
    }
    info!("{} summary: {} paired, {} unpaired", what, paired, unpaired);
}

/// Convenience function returning only fully paired documents.
pub async fn find_maskable_pairs(
    input_dir: impl AsRef<Path>,
    tagged_dir: impl AsRef<Path>,
) -> Result<Vec<PairValidation>> {
    let pairs = collect_document_pairs(input_dir, tagged_dir, DiscoveryConfig::default()).await?;
    Ok(pairs.into_iter().filter(PairValidation::is_paired).collect())
}
