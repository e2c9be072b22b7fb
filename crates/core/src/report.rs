//! Batch report assembly.
//!
//! Line order is fixed: the summary line first, then the skip reasons in input order, then one
//! result line per attempted structure in attempt order.

use crate::constants::{
    CONVERSION_COMPLETE_TITLE, CONVERTED_SUFFIX, FAILED_PREFIX, NOTHING_TO_CONVERT_TITLE,
};
use serde::Serialize;

/// Terminal state of one attempted conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ConversionStatus {
    Converted,
    Failed(String),
}

/// Outcome of one attempted conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionRecord {
    pub structure_id: String,
    #[serde(flatten)]
    pub status: ConversionStatus,
}

impl ConversionRecord {
    pub fn converted(structure_id: impl Into<String>) -> Self {
        Self {
            structure_id: structure_id.into(),
            status: ConversionStatus::Converted,
        }
    }

    pub fn failed(structure_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            structure_id: structure_id.into(),
            status: ConversionStatus::Failed(message.into()),
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self.status, ConversionStatus::Converted)
    }
}

impl std::fmt::Display for ConversionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.status {
            ConversionStatus::Converted => write!(f, "{}: {}", self.structure_id, CONVERTED_SUFFIX),
            ConversionStatus::Failed(message) => {
                write!(f, "{}: {}{}", self.structure_id, FAILED_PREFIX, message)
            }
        }
    }
}

/// Ordered account of every input structure's fate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    summary: Option<String>,
    converted: usize,
    attempted: usize,
    skip_reasons: Vec<String>,
    records: Vec<ConversionRecord>,
}

impl BatchReport {
    /// Report for a batch that ran. Counts are tallied from `records`.
    pub fn from_records(skip_reasons: Vec<String>, records: Vec<ConversionRecord>) -> Self {
        let converted = records.iter().filter(|r| r.is_converted()).count();
        let attempted = records.len();

        Self {
            summary: Some(format!(
                "Successfully converted {converted}/{attempted} structures"
            )),
            converted,
            attempted,
            skip_reasons,
            records,
        }
    }

    /// Report for a run where nothing was eligible: skip reasons only, no summary line.
    pub fn skipped_only(skip_reasons: Vec<String>) -> Self {
        Self {
            summary: None,
            converted: 0,
            attempted: 0,
            skip_reasons,
            records: Vec::new(),
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn converted(&self) -> usize {
        self.converted
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.converted
    }

    pub fn skip_reasons(&self) -> &[String] {
        &self.skip_reasons
    }

    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    /// All report lines in presentation order.
    pub fn lines(&self) -> Vec<String> {
        let mut lines =
            Vec::with_capacity(1 + self.skip_reasons.len() + self.records.len());
        lines.extend(self.summary.iter().cloned());
        lines.extend(self.skip_reasons.iter().cloned());
        lines.extend(self.records.iter().map(ToString::to_string));
        lines
    }
}

/// Heading under which a report is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTitle {
    NothingToConvert,
    ConversionComplete,
}

impl std::fmt::Display for ReportTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportTitle::NothingToConvert => f.write_str(NOTHING_TO_CONVERT_TITLE),
            ReportTitle::ConversionComplete => f.write_str(CONVERSION_COMPLETE_TITLE),
        }
    }
}

/// Joins report lines for plain-text display.
pub fn render_text(lines: &[String]) -> String {
    lines.join("\n")
}
