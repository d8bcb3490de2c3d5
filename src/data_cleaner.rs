use chrono::NaiveDateTime;
use tracing::info;

use crate::event_flattener::EventTable;
use crate::schema::{event_names, qualifier_names};

#[derive(Debug, Clone, Copy, Default)]
pub struct CleanReport {
    pub datetime_coercions: usize,
    pub integer_coercions: usize,
    pub deleted_event_rows: usize,
    pub stage_filtered_rows: usize,
    pub rows_remaining: usize,
}

/// Cleans the named table in place. Datetime and integer columns get
/// errors=coerce treatment (unparseable values become null and are counted),
/// deleted events are dropped, and rows outside `target_stage` are dropped
/// when a stage is given. Per-row failures never abort the stage.
pub fn clean(table: &mut EventTable, target_stage: Option<&str>) -> CleanReport {
    let mut report = CleanReport::default();

    for row in &mut table.rows {
        coerce_datetime(&mut row.time_stamp, &mut report.datetime_coercions);
        coerce_datetime(&mut row.last_modified, &mut report.datetime_coercions);
    }

    if let Some(code) = table.qualifier_code(qualifier_names::GOAL_SHOT_TIMESTAMP) {
        for row in &mut table.rows {
            let invalid = row
                .qualifiers
                .get(&code)
                .is_some_and(|raw| parse_datetime(raw).is_none());
            if invalid {
                row.qualifiers.remove(&code);
                report.datetime_coercions += 1;
            }
        }
    }

    if let Some(code) = table.qualifier_code(qualifier_names::MINUTES) {
        for row in &mut table.rows {
            match row.qualifiers.get(&code).map(|raw| normalize_int(raw)) {
                Some(Some(canonical)) => {
                    row.qualifiers.insert(code, canonical);
                }
                Some(None) => {
                    row.qualifiers.remove(&code);
                    report.integer_coercions += 1;
                }
                None => {}
            }
        }
    }

    let before = table.rows.len();
    table
        .rows
        .retain(|row| row.event_type_name.as_deref() != Some(event_names::DELETED_EVENT));
    report.deleted_event_rows = before - table.rows.len();

    if let Some(stage) = target_stage {
        let before = table.rows.len();
        table.rows.retain(|row| row.match_stage == stage);
        report.stage_filtered_rows = before - table.rows.len();
    }

    report.rows_remaining = table.rows.len();
    info!(
        deleted = report.deleted_event_rows,
        off_stage = report.stage_filtered_rows,
        coerced_datetimes = report.datetime_coercions,
        coerced_integers = report.integer_coercions,
        remaining = report.rows_remaining,
        "cleaning complete"
    );
    report
}

fn coerce_datetime(slot: &mut Option<String>, count: &mut usize) {
    let invalid = slot
        .as_deref()
        .is_some_and(|raw| parse_datetime(raw).is_none());
    if invalid {
        *slot = None;
        *count += 1;
    }
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    None
}

fn normalize_int(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n.to_string());
    }
    // Feeds sometimes write whole numbers as floats ("81.0").
    let f = trimmed.parse::<f64>().ok()?;
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some((f as i64).to_string())
    } else {
        None
    }
}
