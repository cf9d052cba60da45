//! Pattern registry collaborator and an in-memory implementation.

use crate::{StoredPatternRecord, VerificationLogRecord};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Mutex;

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("registry I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// Read access to issued patterns plus the append-only verification log.
pub trait PatternRegistry: Send + Sync {
    /// All issued patterns of a `size × size` grid.
    fn find_candidates(&self, size: usize) -> Result<Vec<StoredPatternRecord>, RegistryError>;

    fn append_verification_log(&self, record: VerificationLogRecord) -> Result<(), RegistryError>;
}

/// On-disk layout of a registry file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    #[serde(default)]
    pub patterns: Vec<StoredPatternRecord>,
}

/// Registry held in memory, optionally loaded from and saved to JSON.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    patterns: Vec<StoredPatternRecord>,
    log: Mutex<Vec<VerificationLogRecord>>,
}

impl InMemoryRegistry {
    pub fn new(patterns: Vec<StoredPatternRecord>) -> Self {
        Self {
            patterns,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn insert(&mut self, record: StoredPatternRecord) {
        self.patterns.push(record);
    }

    pub fn patterns(&self) -> &[StoredPatternRecord] {
        &self.patterns
    }

    pub fn from_json_str(s: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(s)?;
        Ok(Self::new(file.patterns))
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let file: RegistryFile = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        debug!(
            "loaded {} patterns from {}",
            file.patterns.len(),
            path.display()
        );
        Ok(Self::new(file.patterns))
    }

    /// Write the issued patterns (not the verification log) as JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RegistryError> {
        let file = RegistryFile {
            patterns: self.patterns.clone(),
        };
        serde_json::to_writer_pretty(BufWriter::new(File::create(path)?), &file)?;
        Ok(())
    }

    /// Snapshot of the verification log.
    pub fn verification_log(&self) -> Vec<VerificationLogRecord> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PatternRegistry for InMemoryRegistry {
    fn find_candidates(&self, size: usize) -> Result<Vec<StoredPatternRecord>, RegistryError> {
        Ok(self
            .patterns
            .iter()
            .filter(|p| p.size == size)
            .cloned()
            .collect())
    }

    fn append_verification_log(&self, record: VerificationLogRecord) -> Result<(), RegistryError> {
        self.log
            .lock()
            .map_err(|_| RegistryError::Unavailable("verification log lock poisoned".into()))?
            .push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: u64, size: usize) -> StoredPatternRecord {
        StoredPatternRecord {
            id,
            uuid: None,
            pattern: vec![0; size * size],
            size,
            palette: None,
            material_profile: None,
            input_text: format!("tag {id}"),
            algorithm: "standard".into(),
            issued_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn candidates_are_filtered_by_size() {
        let reg = InMemoryRegistry::new(vec![record(1, 3), record(2, 4), record(3, 3)]);
        let ids: Vec<u64> = reg
            .find_candidates(3)
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(reg.find_candidates(8).unwrap().is_empty());
    }

    #[test]
    fn parses_minimal_registry_json() {
        let reg = InMemoryRegistry::from_json_str(
            r#"{ "patterns": [ { "id": 7, "pattern": [0,1,0,1,0,1,0,1,1], "size": 3,
                 "palette": { "0": [0, 229, 255], "1": [0, 150, 136] },
                 "issued_at": "2024-05-01T12:00:00Z" } ] }"#,
        )
        .expect("json");
        let p = &reg.patterns()[0];
        assert_eq!(p.public_id(), "7");
        assert_eq!(p.palette.as_ref().map(|m| m[&1]), Some([0, 150, 136]));
        assert!(p.input_text.is_empty());
    }
}
