pub mod annotation;
pub mod diagnostics;
pub mod discovery;
pub mod label_map;
pub mod masker;
pub mod pipeline;
pub mod reader;
pub mod resolver;

// Re-export the core pipeline types for convenient access
pub use annotation::{parse_annotation_lines, AnnotationRecord, ParseOutcome};
pub use diagnostics::{Diagnostic, Verbosity};
pub use label_map::{apply_label_map, LabelMap};
pub use masker::{apply_masks, mask_document, MaskOptions, MaskOutcome, MaskStats};
pub use resolver::{resolve_conflicts, ResolveOutcome};

// Re-export the batch driver surface
pub use discovery::{
    collect_document_pairs, collect_document_pairs_parallel, find_maskable_pairs,
    DiscoveryConfig, PairValidation,
};
pub use pipeline::{process_corpus, write_run_stats, FileStats, PipelineConfig, RunStats};
pub use reader::{DocumentReader, ReaderConfig};
