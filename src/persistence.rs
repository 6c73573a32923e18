//! Pool snapshots and the JSON-lines round log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::constants::persistence::{
    DEFAULT_ROUND_LOG_FILENAME, SNAPSHOT_TMP_SUFFIX, SNAPSHOT_VERSION,
};
use crate::errors::AcquisitionError;
use crate::metrics::SelectionStats;
use crate::pool::PoolPartition;
use crate::types::{ExampleId, RoundIndex};

/// Serializable state of an experiment between rounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Snapshot format version.
    pub version: u8,
    /// Seed the experiment was started with.
    pub seed: u64,
    /// Rounds completed so far.
    pub completed_rounds: usize,
    /// Labeled identifiers in acquisition order.
    pub labeled: Vec<ExampleId>,
    /// Unlabeled identifiers.
    pub unlabeled: BTreeSet<ExampleId>,
}

impl PoolSnapshot {
    /// Capture `partition` after `completed_rounds` rounds.
    pub fn capture(partition: &PoolPartition, seed: u64, completed_rounds: usize) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            seed,
            completed_rounds,
            labeled: partition.labeled().to_vec(),
            unlabeled: partition.unlabeled().clone(),
        }
    }

    /// Rebuild the partition, re-checking the disjointness invariant.
    pub fn partition(&self) -> Result<PoolPartition, AcquisitionError> {
        PoolPartition::from_parts(self.labeled.clone(), self.unlabeled.clone())
            .map_err(|err| AcquisitionError::Persistence(format!("corrupt snapshot: {err}")))
    }

    /// Write to `path` through a temporary sibling file and a rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AcquisitionError> {
        let path = path.as_ref();
        ensure_parent_dir(path)?;
        let raw = serde_json::to_vec_pretty(self)
            .map_err(|err| AcquisitionError::Persistence(err.to_string()))?;
        let tmp = tmp_path(path);
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Load and validate a snapshot from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AcquisitionError> {
        let path = path.as_ref();
        let raw = fs::read(path)?;
        let snapshot: PoolSnapshot = serde_json::from_slice(&raw).map_err(|err| {
            AcquisitionError::Persistence(format!("failed to parse {}: {err}", path.display()))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AcquisitionError::Persistence(format!(
                "snapshot version mismatch: found {}, expected {SNAPSHOT_VERSION}",
                snapshot.version
            )));
        }
        snapshot.partition()?;
        Ok(snapshot)
    }
}

/// One round's diagnostics as written to the round log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundLogEntry {
    pub round: RoundIndex,
    pub recorded_at: DateTime<Utc>,
    /// Identifiers labeled this round.
    pub selected: usize,
    pub from_quota: usize,
    pub from_remainder: usize,
    pub quota: usize,
    pub labeled: usize,
    pub unlabeled: usize,
    /// Cluster diagnostics; `None` for a plain shuffled first round.
    pub stats: Option<SelectionStats>,
}

/// Append-only JSON-lines log of [`RoundLogEntry`] values.
#[derive(Clone, Debug)]
pub struct RoundLog {
    path: PathBuf,
}

impl RoundLog {
    /// Log at `path`; a directory path gets the default filename appended.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let path = if path.is_dir() {
            path.join(DEFAULT_ROUND_LOG_FILENAME)
        } else {
            path
        };
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single JSON line.
    pub fn append(&self, entry: &RoundLogEntry) -> Result<(), AcquisitionError> {
        ensure_parent_dir(&self.path)?;
        let mut line = serde_json::to_string(entry)
            .map_err(|err| AcquisitionError::Persistence(err.to_string()))?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read every entry back in append order.
    pub fn read_all(&self) -> Result<Vec<RoundLogEntry>, AcquisitionError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut entries = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line).map_err(|err| {
                AcquisitionError::Persistence(format!(
                    "{}:{}: {err}",
                    self.path.display(),
                    line_no + 1
                ))
            })?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(SNAPSHOT_TMP_SUFFIX);
    path.with_file_name(name)
}

fn ensure_parent_dir(path: &Path) -> Result<(), AcquisitionError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}
