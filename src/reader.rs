use anyhow::{Context, Result};
use memmap2::Mmap;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Configuration for document and annotation reads.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Read document text through a memory map instead of buffered async I/O.
    pub use_mmap: bool,
    /// Buffer size for async line reading.
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            use_mmap: false,
            buffer_size: 8192,
        }
    }
}

/// Whole-file reader for document text and annotation lines.
///
/// Handles are scoped to each call and closed on every exit path; errors name
/// the intended file path.
#[derive(Debug, Clone, Default)]
pub struct DocumentReader {
    config: ReaderConfig,
}

impl DocumentReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a document's full text as UTF-8.
    pub async fn read_document(&self, path: &Path) -> Result<String> {
        debug!("Reading document text: {}", path.display());
        if self.config.use_mmap {
            let owned = path.to_path_buf();
            return tokio::task::spawn_blocking(move || read_document_mmap(&owned))
                .await
                .context("mmap read task failed")?;
        }
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read document file {}", path.display()))
    }

    /// Read an annotation file line by line.
    pub async fn read_annotation_lines(&self, path: &Path) -> Result<Vec<String>> {
        debug!("Reading annotation file: {}", path.display());
        let file = File::open(path)
            .await
            .with_context(|| format!("cannot open annotation file {}", path.display()))?;

        let reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut lines = reader.lines();
        let mut collected = Vec::new();
        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("cannot read annotation file {}", path.display()))?
        {
            collected.push(line);
        }
        Ok(collected)
    }
}

fn read_document_mmap(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("cannot open document file {}", path.display()))?;
    // Safety: the corpus is treated as read-only for the duration of a run.
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("cannot map document file {}", path.display()))?;
    let text = std::str::from_utf8(&mmap)
        .with_context(|| format!("document file {} is not valid UTF-8", path.display()))?;
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_read_document_buffered() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.txt");
        tokio::fs::write(&path, "John Smith lives in NYC.").await.unwrap();

        let reader = DocumentReader::default();
        let text = reader.read_document(&path).await.unwrap();
        assert_eq!(text, "John Smith lives in NYC.");
    }

    #[tokio::test]
    async fn test_read_document_mmap() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.txt");
        tokio::fs::write(&path, "Hello, 世界!").await.unwrap();

        let reader = DocumentReader::new(ReaderConfig {
            use_mmap: true,
            ..Default::default()
        });
        let text = reader.read_document(&path).await.unwrap();
        assert_eq!(text, "Hello, 世界!");
    }

    #[tokio::test]
    async fn test_read_annotation_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.ann");
        tokio::fs::write(&path, "T1\tPERSON 0 10\tJohn Smith\n#1\tnote\n")
            .await
            .unwrap();

        let reader = DocumentReader::default();
        let lines = reader.read_annotation_lines(&path).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "T1\tPERSON 0 10\tJohn Smith");
    }

    #[tokio::test]
    async fn test_missing_file_error_names_path() {
        let reader = DocumentReader::default();
        let err = reader
            .read_document(Path::new("/nonexistent/doc.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/doc.txt"));
    }
}
