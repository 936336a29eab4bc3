use crate::diagnostics::{Diagnostic, Verbosity};

/// Marker character identifying a span annotation line in Brat standoff files.
/// Other markers (`#`, `R`, `E`, `A`, ...) denote comments or relations.
const SPAN_MARKER: char = 'T';

/// One validated stand-off annotation: a half-open character span `[start, end)`
/// into the paired document, the label to mask it with, and the substring the
/// annotation claims to cover.
///
/// `source_text` is used for diagnostics and offset accounting only; it is
/// never re-validated against the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub source_text: String,
}

impl AnnotationRecord {
    /// Character length of the claimed source text.
    pub fn source_len(&self) -> usize {
        self.source_text.chars().count()
    }

    /// Character length of the mask label.
    pub fn label_len(&self) -> usize {
        self.label.chars().count()
    }
}

/// Parser output: records in file order (pre-dedup, pre-resolution) plus the
/// diagnostics and counts the driver reports.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<AnnotationRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Data lines dropped for missing fields or non-integer offsets.
    /// Counted even when quiet suppresses the diagnostic.
    pub malformed_lines: usize,
    /// Comment/relation lines skipped.
    pub comment_lines: usize,
}

/// Parse the raw line sequence of one annotation file.
///
/// Each line is independently parseable: malformed data lines are dropped
/// with a diagnostic and processing continues with the remaining lines.
/// Comment lines never fail processing; verbose mode reports them.
pub fn parse_annotation_lines<I, S>(lines: I, verbosity: Verbosity) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut outcome = ParseOutcome::default();

    for (index, raw) in lines.into_iter().enumerate() {
        let line_number = index + 1;
        let line = raw.as_ref().trim();

        if !line.starts_with(SPAN_MARKER) {
            outcome.comment_lines += 1;
            if verbosity.is_verbose() {
                outcome.diagnostics.push(Diagnostic::CommentSkipped {
                    line_number,
                    line: line.to_string(),
                });
            }
            continue;
        }

        match parse_span_line(line) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                outcome.malformed_lines += 1;
                if verbosity.reports() {
                    outcome.diagnostics.push(Diagnostic::MalformedLine {
                        line_number,
                        line: line.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    outcome
}

/// Split one span line into `<id> TAB <label start end> TAB <source text>`.
fn parse_span_line(line: &str) -> Result<AnnotationRecord, String> {
    let mut fields = line.splitn(3, '\t');
    let _id = fields.next();
    let header = fields.next().ok_or("missing annotation header")?;
    let source_text = fields.next().ok_or("missing source text")?;

    let mut header_parts = header.split_whitespace();
    let label = header_parts.next().ok_or("missing label")?;
    let start = header_parts.next().ok_or("missing start offset")?;
    let end = header_parts.next().ok_or("missing end offset")?;

    let start: usize = start
        .parse()
        .map_err(|_| format!("invalid start offset '{start}'"))?;
    let end: usize = end
        .parse()
        .map_err(|_| format!("invalid end offset '{end}'"))?;
    if end < start {
        return Err(format!("span end {end} precedes start {start}"));
    }

    Ok(AnnotationRecord {
        start,
        end,
        label: label.to_string(),
        source_text: source_text.to_string(),
    })
}
