use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::match_loader::MatchDocument;
use crate::schema::{CodeMappings, QualifierSchema};
use crate::value_util::{as_f64_any, as_i32_any, as_i64_any, as_string_any, as_u32_any, get_str};

/// One flattened event. Scalar fields come straight off the feed record;
/// qualifier values live in a sparse code→value map interpreted against the
/// owning table's schema.
#[derive(Debug, Clone)]
pub struct EventRow {
    pub id: Option<i64>,
    pub event_id: Option<i64>,
    pub type_id: u32,
    pub period_id: Option<i32>,
    pub time_min: Option<i32>,
    pub time_sec: Option<i32>,
    pub contestant_id: Option<String>,
    pub player_id: Option<String>,
    pub player_name: Option<String>,
    pub outcome: Option<i32>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub time_stamp: Option<String>,
    pub last_modified: Option<String>,
    pub qualifiers: BTreeMap<u32, String>,
    pub match_id: String,
    pub match_stage: String,
    pub contestant_name: Option<String>,
    /// Set by the code mapper; stays None for unmapped type codes.
    pub event_type_name: Option<String>,
}

impl EventRow {
    pub fn qualifier(&self, code: u32) -> Option<&str> {
        self.qualifiers.get(&code).map(String::as_str)
    }
}

/// The combined wide table: every qualifier column the schema knows about
/// exists for every row, absent values reading as null. Headers start as
/// `qualifier_<code>` and are replaced by the code mapper.
#[derive(Debug, Clone)]
pub struct EventTable {
    pub schema: QualifierSchema,
    pub qualifier_headers: Vec<String>,
    pub rows: Vec<EventRow>,
}

impl EventTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolves a qualifier column by its current header name.
    pub fn qualifier_code(&self, header: &str) -> Option<u32> {
        let pos = self.qualifier_headers.iter().position(|h| h == header)?;
        self.schema.codes().get(pos).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlattenSummary {
    pub matches_processed: usize,
    pub matches_skipped: usize,
    pub events_flattened: usize,
    pub events_skipped: usize,
    pub errors: Vec<String>,
}

/// Flattens every match into one combined row set, sorted chronologically
/// across matches. A bad event is skipped and counted rather than failing
/// the stage; a match with no usable events is skipped with a warning; no
/// usable events anywhere is a hard error.
pub fn flatten_matches(
    docs: &[MatchDocument],
    mappings: &CodeMappings,
) -> Result<(EventTable, FlattenSummary)> {
    let mut summary = FlattenSummary::default();
    let mut rows: Vec<EventRow> = Vec::new();
    let mut seen_codes: BTreeSet<u32> = BTreeSet::new();

    for doc in docs {
        if doc.contestants.len() < 2 {
            warn!(file = %doc.source_file, "fewer than two contestants, skipping match");
            summary.matches_skipped += 1;
            summary
                .errors
                .push(format!("{}: fewer than two contestants", doc.source_file));
            continue;
        }
        if doc.events.is_empty() {
            warn!(file = %doc.source_file, "no events in match, skipping");
            summary.matches_skipped += 1;
            summary
                .errors
                .push(format!("{}: no events", doc.source_file));
            continue;
        }

        // First two contestants mirror the feed layout (home, away).
        let contestants: HashMap<&str, &str> = doc
            .contestants
            .iter()
            .take(2)
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();

        let mut match_rows = 0usize;
        for (idx, event) in doc.events.iter().enumerate() {
            match parse_event(event, doc, &contestants) {
                Some(row) => {
                    seen_codes.extend(row.qualifiers.keys().copied());
                    rows.push(row);
                    match_rows += 1;
                }
                None => {
                    warn!(file = %doc.source_file, event = idx, "unparseable event, skipping");
                    summary.events_skipped += 1;
                }
            }
        }

        if match_rows == 0 {
            warn!(file = %doc.source_file, "no valid events in match");
            summary.matches_skipped += 1;
            summary
                .errors
                .push(format!("{}: no valid events", doc.source_file));
            continue;
        }
        summary.matches_processed += 1;
        summary.events_flattened += match_rows;
    }

    if rows.is_empty() {
        return Err(PipelineError::data(
            "no events could be flattened from any match",
        ));
    }

    // Chronological across the whole set, with deterministic tie-breaks so
    // identical inputs always produce identical output order.
    rows.sort_by(|a, b| {
        a.time_stamp
            .cmp(&b.time_stamp)
            .then_with(|| a.match_id.cmp(&b.match_id))
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| a.id.cmp(&b.id))
    });

    let schema = QualifierSchema::from_mappings(mappings).with_extra_codes(seen_codes);
    let qualifier_headers = schema
        .codes()
        .iter()
        .map(|code| format!("qualifier_{code}"))
        .collect();

    info!(
        events = rows.len(),
        matches = summary.matches_processed,
        skipped_events = summary.events_skipped,
        "flattening complete"
    );

    Ok((
        EventTable {
            schema,
            qualifier_headers,
            rows,
        },
        summary,
    ))
}

/// None means the event is unusable (no valid type code); the caller logs
/// and skips it.
fn parse_event(
    v: &Value,
    doc: &MatchDocument,
    contestants: &HashMap<&str, &str>,
) -> Option<EventRow> {
    let type_id = as_u32_any(v.get("typeId")?)?;
    let contestant_id = v.get("contestantId").and_then(as_string_any);
    let contestant_name = contestant_id
        .as_deref()
        .and_then(|id| contestants.get(id))
        .map(|name| name.to_string());

    Some(EventRow {
        id: v.get("id").and_then(as_i64_any),
        event_id: v.get("eventId").and_then(as_i64_any),
        type_id,
        period_id: v.get("periodId").and_then(as_i32_any),
        time_min: v.get("timeMin").and_then(as_i32_any),
        time_sec: v.get("timeSec").and_then(as_i32_any),
        contestant_id,
        player_id: v.get("playerId").and_then(as_string_any),
        player_name: get_str(v, "playerName"),
        outcome: v.get("outcome").and_then(as_i32_any),
        x: v.get("x").and_then(as_f64_any),
        y: v.get("y").and_then(as_f64_any),
        time_stamp: get_str(v, "timeStamp"),
        last_modified: get_str(v, "lastModified"),
        qualifiers: pivot_qualifiers(v.get("qualifier")),
        match_id: doc.id.clone(),
        match_stage: doc.stage.clone(),
        contestant_name,
        event_type_name: None,
    })
}

/// First value wins when a code repeats within one event. Entries without a
/// usable code or without a value contribute nothing.
fn pivot_qualifiers(list: Option<&Value>) -> BTreeMap<u32, String> {
    let Some(entries) = list.and_then(|v| v.as_array()) else {
        return BTreeMap::new();
    };
    let mut out = BTreeMap::new();
    for entry in entries {
        let Some(code) = entry.get("qualifierId").and_then(as_u32_any) else {
            continue;
        };
        let Some(value) = entry.get("value").and_then(as_string_any) else {
            continue;
        };
        out.entry(code).or_insert(value);
    }
    out
}
