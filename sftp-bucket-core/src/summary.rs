//! Per-file outcomes and the batch summary they accumulate into.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

pub const NO_MATCHING_RULE: &str = "no_matching_rule";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedFile {
    #[serde(rename = "file")]
    pub source_path: String,
    #[serde(rename = "s3")]
    pub destination_uri: String,
    #[serde(rename = "rule")]
    pub rule_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    #[serde(rename = "file")]
    pub source_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    #[serde(rename = "file")]
    pub source_path: String,
    #[serde(rename = "error")]
    pub error_message: String,
    #[serde(rename = "rule")]
    pub rule_name: String,
}

/// Exactly one of these is produced for every discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Processed(ProcessedFile),
    Skipped(SkippedFile),
    Failed(FailedFile),
}

impl FileOutcome {
    pub fn source_path(&self) -> &str {
        match self {
            FileOutcome::Processed(p) => &p.source_path,
            FileOutcome::Skipped(s) => &s.source_path,
            FileOutcome::Failed(f) => &f.source_path,
        }
    }
}

/// Outcome lists in processing order. Counts are the list lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
    pub failed: Vec<FailedFile>,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Processed(p) => self.processed.push(p),
            FileOutcome::Skipped(s) => self.skipped.push(s),
            FileOutcome::Failed(f) => self.failed.push(f),
        }
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total(&self) -> usize {
        self.processed_count() + self.skipped_count() + self.failed_count()
    }
}

#[derive(Serialize)]
struct Counts {
    processed: usize,
    skipped: usize,
    failed: usize,
}

impl Serialize for BatchSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BatchSummary", 4)?;
        state.serialize_field(
            "summary",
            &Counts {
                processed: self.processed_count(),
                skipped: self.skipped_count(),
                failed: self.failed_count(),
            },
        )?;
        state.serialize_field("processed", &self.processed)?;
        state.serialize_field("skipped", &self.skipped)?;
        state.serialize_field("failed", &self.failed)?;
        state.end()
    }
}
