use serde::{Deserialize, Serialize};

use crate::annotation::{parse_annotation_lines, AnnotationRecord};
use crate::diagnostics::{Diagnostic, Verbosity};
use crate::label_map::{apply_label_map, LabelMap};
use crate::resolver::resolve_conflicts;

/// Explicit per-run configuration for the core pipeline. Passed by value into
/// every operation; nothing here is read from ambient state.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaskOptions {
    /// Mask only spans whose label appears in the custom table.
    pub custom_only: bool,
    pub verbosity: Verbosity,
}

/// Per-document masking counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaskStats {
    /// Span records parsed from the annotation file (pre-resolution).
    pub spans_parsed: u64,
    /// Spans actually substituted into the document.
    pub spans_masked: u64,
    pub malformed_lines: u64,
    pub comment_lines: u64,
    pub overlaps_dropped: u64,
    /// Document length in characters before masking.
    pub chars_in: u64,
    /// Document length in characters after masking.
    pub chars_out: u64,
}

/// Result of masking one document: the rewritten text plus everything the
/// driver needs to report. All-or-nothing; no partial state escapes.
#[derive(Debug)]
pub struct MaskOutcome {
    pub text: String,
    pub stats: MaskStats,
    pub diagnostics: Vec<Diagnostic>,
}

/// Mask one document: parse its annotation lines, apply the optional custom
/// table, resolve duplicates and overlaps, and rewrite the text.
///
/// This is the single operation the batch driver calls per document.
pub fn mask_document<I, S>(
    text: &str,
    annotation_lines: I,
    table: Option<&LabelMap>,
    options: &MaskOptions,
) -> MaskOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parsed = parse_annotation_lines(annotation_lines, options.verbosity);
    let spans_parsed = parsed.records.len() as u64;

    let mapped = apply_label_map(parsed.records, table, options.custom_only);
    let resolved = resolve_conflicts(mapped, options.verbosity);

    let masked = apply_masks(text, &resolved.records);

    let stats = MaskStats {
        spans_parsed,
        spans_masked: resolved.records.len() as u64,
        malformed_lines: parsed.malformed_lines as u64,
        comment_lines: parsed.comment_lines as u64,
        overlaps_dropped: resolved.overlaps_dropped as u64,
        chars_in: text.chars().count() as u64,
        chars_out: masked.chars().count() as u64,
    };

    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(resolved.diagnostics);

    MaskOutcome {
        text: masked,
        stats,
        diagnostics,
    }
}

/// Substitute each resolved span's label for its text, left to right.
///
/// `records` must be the resolver's output: start-ordered and non-overlapping.
/// Offsets address the original, un-mutated text; a cumulative correction
/// relocates each span in the progressively rewritten buffer. Earlier
/// replacements are always fully to the left of later ones, so the correction
/// is exact and needs no re-scanning.
pub fn apply_masks(text: &str, records: &[AnnotationRecord]) -> String {
    let mut buffer = text.to_string();
    let mut cumulative_offset: isize = 0;

    for record in records {
        let adjusted_start = (record.start as isize + cumulative_offset).max(0) as usize;
        let adjusted_end = (record.end as isize + cumulative_offset).max(0) as usize;
        let adjusted_end = adjusted_end.max(adjusted_start);

        let (byte_start, byte_end) = char_span_to_byte_range(&buffer, adjusted_start, adjusted_end);
        buffer.replace_range(byte_start..byte_end, &record.label);

        cumulative_offset += record.label_len() as isize - record.source_len() as isize;
    }

    buffer
}

/// Convert a character span to byte positions in `s`, clamping past-the-end
/// offsets to the buffer boundary.
fn char_span_to_byte_range(s: &str, start: usize, end: usize) -> (usize, usize) {
    let mut byte_start = s.len();
    let mut byte_end = s.len();
    for (count, (index, _)) in s.char_indices().enumerate() {
        if count == start {
            byte_start = index;
        }
        if count == end {
            byte_end = index;
            break;
        }
    }
    (byte_start, byte_end)
}
