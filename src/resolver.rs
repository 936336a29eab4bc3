use std::collections::HashSet;

use crate::annotation::AnnotationRecord;
use crate::diagnostics::{Diagnostic, Verbosity};

/// Resolver output: the canonical start-ordered, non-overlapping record list,
/// plus the overlap warnings the driver reports.
#[derive(Debug, Default)]
pub struct ResolveOutcome {
    pub records: Vec<AnnotationRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Overlapping spans dropped. Counted even when quiet suppresses the
    /// diagnostic. Duplicate-span drops are intentionally not counted here.
    pub overlaps_dropped: usize,
}

/// Deduplicate and de-overlap parsed records.
///
/// Deterministic and order-sensitive: the first record seen wins a duplicate
/// `start`, then a duplicate `end`; survivors are sorted by `start` and an
/// earlier-starting span always wins over a later-starting overlapping one.
/// Duplicate drops are silent; overlap drops warn.
pub fn resolve_conflicts(records: Vec<AnnotationRecord>, verbosity: Verbosity) -> ResolveOutcome {
    let mut seen_starts = HashSet::new();
    let mut deduped: Vec<AnnotationRecord> = records
        .into_iter()
        .filter(|record| seen_starts.insert(record.start))
        .collect();

    let mut seen_ends = HashSet::new();
    deduped.retain(|record| seen_ends.insert(record.end));

    // Stable sort; start ties cannot occur after the start-dedup pass.
    deduped.sort_by_key(|record| record.start);

    let mut outcome = ResolveOutcome::default();
    let mut previous_end = 0usize;
    for record in deduped {
        if record.start < previous_end {
            // Overlapping spans must not advance previous_end, or a span
            // hiding behind a dropped one would sneak back in.
            outcome.overlaps_dropped += 1;
            if verbosity.reports() {
                outcome.diagnostics.push(Diagnostic::OverlapConflict {
                    label: record.label.clone(),
                    start: record.start,
                    end: record.end,
                });
            }
            continue;
        }
        previous_end = record.end;
        outcome.records.push(record);
    }

    outcome
}
