use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::value_util::as_string_any;

#[derive(Debug, Clone)]
pub struct Contestant {
    pub id: String,
    pub name: String,
}

/// One parsed match file. Events stay as raw json values here; the flattener
/// owns their interpretation. Read once per run, discarded after flattening.
#[derive(Debug, Clone)]
pub struct MatchDocument {
    pub source_file: String,
    pub id: String,
    pub stage: String,
    pub contestants: Vec<Contestant>,
    pub events: Vec<Value>,
}

impl MatchDocument {
    pub fn involves(&self, team: &str) -> bool {
        self.contestants.iter().any(|c| c.name == team)
    }
}

/// Loads every `*.json` match file under `dir`, keeping only matches that
/// include `team` when one is given. A single malformed file fails the whole
/// load: downstream aggregation assumes a complete match set.
pub fn load_match_documents(dir: &Path, team: Option<&str>) -> Result<Vec<MatchDocument>> {
    if !dir.exists() {
        return Err(PipelineError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let files = list_json_files(dir)?;
    if files.is_empty() {
        return Err(PipelineError::data(format!(
            "no json files found in {}",
            dir.display()
        )));
    }
    info!(files = files.len(), dir = %dir.display(), "loading match files");

    let mut docs = Vec::new();
    for path in &files {
        let doc = load_match_file(path)?;
        match team {
            Some(team) if !doc.involves(team) => {
                debug!(file = %doc.source_file, team, "match without target team, skipping");
            }
            _ => docs.push(doc),
        }
    }

    if docs.is_empty() {
        return Err(PipelineError::data(match team {
            Some(team) => format!("no matches involving {team} under {}", dir.display()),
            None => format!("no usable matches under {}", dir.display()),
        }));
    }
    info!(matches = docs.len(), "match documents loaded");
    Ok(docs)
}

fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|err| PipelineError::io(dir, err))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(dir, err))?;
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            files.push(path);
        }
    }
    // Directory order is filesystem-dependent; sorted names keep every run
    // reading matches in the same order.
    files.sort();
    Ok(files)
}

fn load_match_file(path: &Path) -> Result<MatchDocument> {
    let raw = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| PipelineError::json(path, err))?;
    let source_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    parse_match_document(&source_file, &value)
}

pub fn parse_match_document(source_file: &str, value: &Value) -> Result<MatchDocument> {
    let match_info = value
        .get("matchInfo")
        .ok_or_else(|| PipelineError::data(format!("{source_file}: missing matchInfo")))?;

    let id = match_info
        .get("id")
        .and_then(as_string_any)
        .ok_or_else(|| PipelineError::data(format!("{source_file}: missing matchInfo.id")))?;

    let stage = match_info
        .pointer("/stage/name")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown")
        .to_string();

    let contestants = parse_contestants(match_info);
    if contestants.is_empty() {
        return Err(PipelineError::data(format!(
            "{source_file}: no usable contestant list"
        )));
    }

    let events = value
        .pointer("/liveData/event")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    Ok(MatchDocument {
        source_file: source_file.to_string(),
        id,
        stage,
        contestants,
        events,
    })
}

fn parse_contestants(match_info: &Value) -> Vec<Contestant> {
    let Some(list) = match_info.get("contestant").and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    list.iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(as_string_any)?;
            let name = entry
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_string();
            Some(Contestant { id, name })
        })
        .collect()
}
