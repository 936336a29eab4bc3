use std::fmt;

/// Console reporting level threaded through every core operation.
///
/// Quiet suppresses all diagnostics, verbose additionally reports skipped
/// comment lines. Carried as an explicit value, never read from process-wide
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Suppress every diagnostic.
    Quiet,
    /// Report malformed lines and overlap conflicts.
    #[default]
    Normal,
    /// Additionally report skipped comment/relation lines.
    Verbose,
}

impl Verbosity {
    /// Resolve the mutually exclusive CLI flags into a level.
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        match (verbose, quiet) {
            (_, true) => Verbosity::Quiet,
            (true, _) => Verbosity::Verbose,
            _ => Verbosity::Normal,
        }
    }

    /// Whether warnings and errors should be reported at all.
    pub fn reports(self) -> bool {
        self != Verbosity::Quiet
    }

    /// Whether comment-line skips should be reported.
    pub fn is_verbose(self) -> bool {
        self == Verbosity::Verbose
    }
}

/// A per-line or per-span condition worth telling the user about.
///
/// Diagnostics are data: the core collects them and the driver decides where
/// they go. None of them is fatal to a document, let alone a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A data line that could not be parsed into an annotation record.
    MalformedLine {
        /// 1-based line number within the annotation file.
        line_number: usize,
        line: String,
        reason: String,
    },
    /// A comment/relation line skipped by the parser (verbose mode only).
    CommentSkipped {
        line_number: usize,
        line: String,
    },
    /// A span dropped because it begins before the previous retained span ends.
    OverlapConflict {
        label: String,
        start: usize,
        end: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedLine { line_number, line, reason } => {
                write!(f, "ERROR! Malformed annotation line {line_number} ({reason}): '{line}'")
            }
            Diagnostic::CommentSkipped { line_number, line } => {
                write!(f, "Skipping line {line_number} (comment): {line}")
            }
            Diagnostic::OverlapConflict { label, start, end } => {
                write!(f, "WARNING! {label}({start},{end}) overlaps with a previous annotation.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_resolution() {
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(true, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Quiet);
    }

    #[test]
    fn test_reporting_levels() {
        assert!(Verbosity::Normal.reports());
        assert!(Verbosity::Verbose.reports());
        assert!(!Verbosity::Quiet.reports());
        assert!(Verbosity::Verbose.is_verbose());
        assert!(!Verbosity::Normal.is_verbose());
    }

    #[test]
    fn test_overlap_rendering() {
        let diag = Diagnostic::OverlapConflict {
            label: "LOCATION".to_string(),
            start: 5,
            end: 15,
        };
        assert_eq!(
            diag.to_string(),
            "WARNING! LOCATION(5,15) overlaps with a previous annotation."
        );
    }
}
