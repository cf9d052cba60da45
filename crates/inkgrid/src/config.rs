use crate::ConfigError;
use inkgrid_grid::GridParams;
use inkgrid_ink::ClassifierParams;
use inkgrid_match::MatcherParams;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Every tunable of the verification pipeline.
///
/// `classifier.variety` is the single pattern-validity rule: it bounds both
/// classified photos and directly submitted patterns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub grid: GridParams,
    pub classifier: ClassifierParams,
    pub matcher: MatcherParams,
}

impl EngineConfig {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
