use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::stats::{AccessCounters, StatsReport};

/// Directory, relative to the crate root, holding the recorded example cases
pub const CASES_DIR: &str = "testdata";

/// Paths making up one recorded case
pub struct TestCasePaths {
    pub config: PathBuf,
    pub trace: PathBuf,
    pub output: PathBuf,
}

/// The part of a report that recorded cases pin down: counts only, rates follow from them
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub levels: Vec<LevelCounts>,
    pub hierarchy: AccessCounters,
    pub main_memory_accesses: u64,
    pub prefetch_accesses: u64,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    pub name: String,
    #[serde(flatten)]
    pub counters: AccessCounters,
}

impl From<&StatsReport> for CaseOutcome {
    fn from(report: &StatsReport) -> Self {
        Self {
            levels: report.levels.iter().map(|level| LevelCounts { name: level.name.clone(), counters: level.counters }).collect(),
            hierarchy: report.hierarchy.counters,
            main_memory_accesses: report.main_memory_accesses,
            prefetch_accesses: report.prefetch_accesses,
        }
    }
}

/// Finds every recorded case under `root`
///
/// Expected outputs live in `root/outputs` and are named `output-<trace>-<config>.json`, naming
/// the trace in `root/traces/<trace>.trace` and the configuration in `root/configs/<config>.json`.
/// Cases come back sorted by output file name.
pub fn get_cases(root: &Path) -> Result<Vec<TestCasePaths>, Box<dyn Error>> {
    let output_pattern = Regex::new(r"^output-(?P<trace>[0-9a-zA-Z_]+)-(?P<config>[0-9a-zA-Z_]+)\.json$")?;
    let mut names = Vec::new();
    for entry in fs::read_dir(root.join("outputs"))? {
        let file_name = entry?
            .file_name()
            .into_string()
            .map_err(|e| format!("Can't convert OS string ({e:?}) to standard string"))?;
        if output_pattern.is_match(&file_name) {
            names.push(file_name);
        }
    }
    names.sort();
    let mut out = Vec::new();
    for file_name in names {
        let tokens = output_pattern.captures(&file_name).ok_or("Couldn't parse the file name")?;
        let trace = tokens.name("trace").ok_or("Couldn't get the trace from the output file name")?.as_str();
        let config = tokens.name("config").ok_or("Couldn't get the config from the output file name")?.as_str();
        out.push(TestCasePaths {
            config: root.join("configs").join(format!("{config}.json")),
            trace: root.join("traces").join(format!("{trace}.trace")),
            output: root.join("outputs").join(&file_name),
        });
    }
    Ok(out)
}
