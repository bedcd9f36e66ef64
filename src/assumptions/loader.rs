//! Load scenario assumptions from JSON files

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};

use super::ScenarioAssumptions;

/// Load a scenario from a JSON file; absent fields take their defaults
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<ScenarioAssumptions> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    load_scenario_from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {}", path.display()))
}

pub fn load_scenario_from_reader<R: Read>(reader: R) -> Result<ScenarioAssumptions> {
    Ok(serde_json::from_reader(reader)?)
}
