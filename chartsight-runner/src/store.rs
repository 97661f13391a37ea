//! Decision persistence — append-only JSONL log.
//!
//! Each line is one independent JSON object, so a partial write can only
//! damage the last line and the file streams without a full parse. Record
//! ids are blake3 hashes of the record's JSON: saving the same record twice
//! yields the same id.

use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use chartsight_core::domain::Decision;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::remote::{AnalysisOutcome, SourceTag};

pub type RecordId = String;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("decision store I/O: {0}")]
    Io(#[from] io::Error),
    #[error("decision store serialization: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One finalized analysis cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub recorded_at: DateTime<Utc>,
    pub timeframe: String,
    pub source: SourceTag,
    pub image_fingerprint: String,
    pub bar_count: usize,
    pub decision: Decision,
}

impl DecisionRecord {
    pub fn from_outcome(outcome: &AnalysisOutcome, timeframe: &str, recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            timeframe: timeframe.to_string(),
            source: outcome.source,
            image_fingerprint: outcome.image_fingerprint.clone(),
            bar_count: outcome.bars.len(),
            decision: outcome.decision.clone(),
        }
    }

    pub fn id(&self) -> Result<RecordId, StoreError> {
        let json = serde_json::to_vec(self)?;
        Ok(blake3::hash(&json).to_hex().to_string())
    }
}

/// A record as it sits on disk, with its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDecision {
    pub id: RecordId,
    pub record: DecisionRecord,
}

/// Persistence collaborator. Failures are logged and surface as `None`;
/// a store outage never blocks an analysis cycle.
pub trait DecisionStore: Send {
    fn save(&self, record: &DecisionRecord) -> Option<RecordId>;
}

#[derive(Debug, Clone)]
pub struct JsonlDecisionStore {
    path: PathBuf,
}

impl JsonlDecisionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `record` and return its id.
    pub fn append(&self, record: &DecisionRecord) -> Result<RecordId, StoreError> {
        let id = record.id()?;
        let line = serde_json::to_string(&StoredDecision {
            id: id.clone(),
            record: record.clone(),
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        file.flush()?;
        Ok(id)
    }

    /// Every well-formed record, oldest first. Malformed lines are skipped.
    pub fn load_all(&self) -> Result<Vec<StoredDecision>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = io::BufReader::new(fs::File::open(&self.path)?);
        let mut records = Vec::new();
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<StoredDecision>(&line) {
                Ok(stored) => records.push(stored),
                Err(e) => warn!(line = number + 1, error = %e, "skipping malformed decision record"),
            }
        }
        Ok(records)
    }
}

impl DecisionStore for JsonlDecisionStore {
    fn save(&self, record: &DecisionRecord) -> Option<RecordId> {
        match self.append(record) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to persist decision");
                None
            }
        }
    }
}
