use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::annotation::AnnotationRecord;

/// Externally supplied relabeling table: original label -> replacement mask.
///
/// Loaded once per run, before any document is processed; an unreadable or
/// malformed table is a configuration error, never a silent fallback.
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    masks: HashMap<String, String>,
}

impl LabelMap {
    /// Parse table content: one `<label><TAB><mask>` entry per non-empty line.
    /// Later lines override earlier ones for a repeated label.
    pub fn parse(content: &str) -> Result<Self> {
        let mut masks = HashMap::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let label = fields.next().unwrap_or_default();
            let mask = fields.next().with_context(|| {
                format!("custom mask line {} has no tab separator: '{line}'", index + 1)
            })?;
            masks.insert(label.to_string(), mask.to_string());
        }
        Ok(Self { masks })
    }

    /// Read and parse a table file.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("cannot read custom mask file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("cannot parse custom mask file {}", path.display()))
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.masks.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}

/// Relabel (and in custom-only mode, filter) parsed records.
///
/// With `custom_only`, a record survives only if its label is a table key and
/// is rewritten to the mapped mask; unmapped records are dropped silently.
/// Otherwise every record survives and mapped labels are rewritten in place.
/// Without a table this is the identity mapper; the CLI guarantees
/// `custom_only` always comes with a table.
pub fn apply_label_map(
    records: Vec<AnnotationRecord>,
    table: Option<&LabelMap>,
    custom_only: bool,
) -> Vec<AnnotationRecord> {
    let Some(table) = table else {
        return records;
    };

    records
        .into_iter()
        .filter_map(|mut record| match table.get(&record.label) {
            Some(mask) => {
                record.label = mask.to_string();
                Some(record)
            }
            None if custom_only => None,
            None => Some(record),
        })
        .collect()
}
