use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::event_flattener::EventTable;
use crate::schema::CodeMappings;

#[derive(Debug, Clone, Default)]
pub struct MapSummary {
    pub qualifier_columns_mapped: usize,
    pub qualifier_columns_unmapped: usize,
    pub unmapped_type_ids: Vec<u32>,
    pub rows_without_type_name: usize,
}

/// Renames qualifier columns to their mapped display names and fills the
/// per-row event-type name. Unmapped qualifier codes keep their
/// `qualifier_<code>` header and unmapped type codes leave the name null;
/// both are logged, neither is an error.
pub fn apply_names(table: &mut EventTable, mappings: &CodeMappings) -> Result<MapSummary> {
    if table.is_empty() {
        return Err(PipelineError::data("event table is empty, nothing to map"));
    }

    let mut summary = MapSummary::default();

    let codes: Vec<u32> = table.schema.codes().to_vec();
    for (pos, code) in codes.iter().enumerate() {
        match mappings.qualifier_name(*code) {
            Some(name) => {
                table.qualifier_headers[pos] = name.to_string();
                summary.qualifier_columns_mapped += 1;
            }
            None => {
                warn!(code, "no mapping for qualifier code, keeping numeric name");
                summary.qualifier_columns_unmapped += 1;
            }
        }
    }

    let mut unmapped_ids: BTreeSet<u32> = BTreeSet::new();
    for row in &mut table.rows {
        match mappings.event_name(row.type_id) {
            Some(name) => row.event_type_name = Some(name.to_string()),
            None => {
                unmapped_ids.insert(row.type_id);
                summary.rows_without_type_name += 1;
            }
        }
    }
    if !unmapped_ids.is_empty() {
        warn!(
            type_ids = ?unmapped_ids,
            rows = summary.rows_without_type_name,
            "events with unmapped type codes"
        );
    }
    summary.unmapped_type_ids = unmapped_ids.into_iter().collect();

    info!(
        mapped = summary.qualifier_columns_mapped,
        unmapped = summary.qualifier_columns_unmapped,
        "qualifier columns named"
    );
    Ok(summary)
}
