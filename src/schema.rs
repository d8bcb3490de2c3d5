use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::error::{PipelineError, Result};

pub const EVENT_TYPES_FILE: &str = "opta_events_type.json";
pub const QUALIFIER_TYPES_FILE: &str = "opta_qualifiers_type.json";

/// Value carried by the `Assist` qualifier when the pass set up a goal.
pub const SCORING_ASSIST_VALUE: i64 = 16;

/// Event-type names the aggregation and cleaning stages match on. These are
/// the display names from the event-type mapping file, not type codes.
pub mod event_names {
    pub const PASS: &str = "Pass";
    pub const GOAL: &str = "Goal";
    pub const MISS: &str = "Miss";
    pub const ATTEMPT_SAVED: &str = "Attempt Saved";
    pub const POST: &str = "Post";
    pub const TACKLE: &str = "Tackle";
    pub const INTERCEPTION: &str = "Interception";
    pub const CLEARANCE: &str = "Clearance";
    pub const BLOCK: &str = "Block";
    pub const YELLOW_CARD: &str = "Yellow Card";
    pub const RED_CARD: &str = "Red Card";
    pub const DELETED_EVENT: &str = "Deleted event";
}

/// Qualifier display names consumed downstream of the mapper.
pub mod qualifier_names {
    pub const LENGTH: &str = "Length";
    pub const ASSIST: &str = "Assist";
    pub const KEY_PASS: &str = "keyPass";
    pub const ZONE: &str = "Zone";
    pub const MINUTES: &str = "Minutes";
    pub const GOAL_SHOT_TIMESTAMP: &str = "Goal shot timestamp";
}

pub const ALL_SHOT_EVENTS: [&str; 4] = [
    event_names::GOAL,
    event_names::MISS,
    event_names::ATTEMPT_SAVED,
    event_names::POST,
];

pub const DEFENSIVE_EVENTS: [&str; 4] = [
    event_names::TACKLE,
    event_names::INTERCEPTION,
    event_names::CLEARANCE,
    event_names::BLOCK,
];

/// The two code→name lookup tables shipped next to the raw data.
#[derive(Debug, Clone, Default)]
pub struct CodeMappings {
    pub event_types: HashMap<u32, String>,
    pub qualifiers: HashMap<u32, String>,
}

impl CodeMappings {
    pub fn load(dir: &Path) -> Result<Self> {
        let event_types = load_code_map(&dir.join(EVENT_TYPES_FILE))?;
        let qualifiers = load_code_map(&dir.join(QUALIFIER_TYPES_FILE))?;
        Ok(Self {
            event_types,
            qualifiers,
        })
    }

    pub fn event_name(&self, type_id: u32) -> Option<&str> {
        self.event_types.get(&type_id).map(String::as_str)
    }

    pub fn qualifier_name(&self, code: u32) -> Option<&str> {
        self.qualifiers.get(&code).map(String::as_str)
    }
}

fn load_code_map(path: &Path) -> Result<HashMap<u32, String>> {
    if !path.exists() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    let value: Value = serde_json::from_str(&raw).map_err(|err| PipelineError::json(path, err))?;
    let Some(obj) = value.as_object() else {
        return Err(PipelineError::data(format!(
            "{} is not a flat json object",
            path.display()
        )));
    };

    let mut map = HashMap::with_capacity(obj.len());
    for (key, val) in obj {
        let Ok(code) = key.trim().parse::<u32>() else {
            warn!(file = %path.display(), key = %key, "skipping non-numeric code key");
            continue;
        };
        let Some(name) = val.as_str() else {
            warn!(file = %path.display(), key = %key, "skipping non-string code name");
            continue;
        };
        map.insert(code, name.to_string());
    }
    Ok(map)
}

/// Column vocabulary of the wide event table. Built from the qualifier
/// mapping so the table shape does not depend on which qualifiers a given
/// input batch happens to contain; codes observed in data but absent from
/// the mapping are appended behind the known block, also in ascending order.
#[derive(Debug, Clone)]
pub struct QualifierSchema {
    codes: Vec<u32>,
    index: HashMap<u32, usize>,
}

impl QualifierSchema {
    pub fn from_mappings(mappings: &CodeMappings) -> Self {
        let mut codes: Vec<u32> = mappings.qualifiers.keys().copied().collect();
        codes.sort_unstable();
        Self::from_codes(codes)
    }

    pub fn from_codes(codes: Vec<u32>) -> Self {
        let index = codes
            .iter()
            .enumerate()
            .map(|(pos, code)| (*code, pos))
            .collect();
        Self { codes, index }
    }

    pub fn with_extra_codes(&self, seen: impl IntoIterator<Item = u32>) -> Self {
        let mut extras: Vec<u32> = seen
            .into_iter()
            .filter(|code| !self.index.contains_key(code))
            .collect();
        if extras.is_empty() {
            return self.clone();
        }
        extras.sort_unstable();
        extras.dedup();
        let mut codes = self.codes.clone();
        codes.extend(extras);
        Self::from_codes(codes)
    }

    pub fn position(&self, code: u32) -> Option<usize> {
        self.index.get(&code).copied()
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
