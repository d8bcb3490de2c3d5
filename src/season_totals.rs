use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::export;
use crate::value_util::as_string_any;

pub const PLAYER_METADATA_COLUMNS: [&str; 11] = [
    "team_name",
    "team_id",
    "competition",
    "season",
    "player_id",
    "player_name",
    "first_name",
    "last_name",
    "short_name",
    "position",
    "shirt_number",
];

pub const TEAM_METADATA_COLUMNS: [&str; 4] = ["team_name", "team_id", "competition", "season"];

/// One season-totals cell. The feed mixes numeric and text stat values, so
/// the column type is decided per column from what actually parsed.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl StatValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Self::Int(n);
        }
        if let Ok(f) = trimmed.parse::<f64>()
            && f.is_finite()
        {
            return Self::Float(f);
        }
        Self::Text(raw.to_string())
    }

    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => Self::parse(s),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Text(_) => None,
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TotalsRow {
    /// Aligned with the owning table's metadata columns.
    pub metadata: Vec<String>,
    /// Sparse; a missing entry exports as 0 or empty depending on the
    /// column's type.
    pub stats: HashMap<String, StatValue>,
}

/// Column-dynamic table for the season-totals feed: fixed metadata columns
/// first, stat columns in stable first-seen order behind them.
#[derive(Debug, Clone)]
pub struct SeasonTotalsTable {
    pub metadata_columns: Vec<String>,
    pub stat_columns: Vec<String>,
    pub rows: Vec<TotalsRow>,
}

impl SeasonTotalsTable {
    pub fn new(metadata_columns: &[&str]) -> Self {
        Self {
            metadata_columns: metadata_columns.iter().map(|c| c.to_string()).collect(),
            stat_columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, metadata: Vec<String>, stats: Vec<(String, StatValue)>) {
        let mut map = HashMap::with_capacity(stats.len());
        for (name, value) in stats {
            if !self.stat_columns.contains(&name) {
                self.stat_columns.push(name.clone());
            }
            map.insert(name, value);
        }
        self.rows.push(TotalsRow {
            metadata,
            stats: map,
        });
    }

    pub fn set_stat(&mut self, row: usize, name: &str, value: StatValue) {
        if !self.stat_columns.iter().any(|c| c == name) {
            self.stat_columns.push(name.to_string());
        }
        if let Some(r) = self.rows.get_mut(row) {
            r.stats.insert(name.to_string(), value);
        }
    }

    pub fn stat_f64(&self, row: usize, name: &str) -> Option<f64> {
        self.rows.get(row)?.stats.get(name)?.as_f64()
    }

    /// True when every present value in the column is numeric (and at least
    /// one is present).
    pub fn column_is_numeric(&self, name: &str) -> bool {
        let mut any = false;
        for row in &self.rows {
            match row.stats.get(name) {
                Some(v) if v.is_numeric() => any = true,
                Some(_) => return false,
                None => {}
            }
        }
        any
    }

    /// True when every present value in the column is an integer.
    pub fn column_is_integer(&self, name: &str) -> bool {
        let mut any = false;
        for row in &self.rows {
            match row.stats.get(name) {
                Some(StatValue::Int(_)) => any = true,
                Some(_) => return false,
                None => {}
            }
        }
        any
    }

    /// Writes the table: missing numeric cells as 0, missing text cells as
    /// empty, mirroring the feed loader's fill split.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let numeric: Vec<bool> = self
            .stat_columns
            .iter()
            .map(|c| self.column_is_numeric(c))
            .collect();

        let mut header: Vec<String> = self.metadata_columns.clone();
        header.extend(self.stat_columns.iter().cloned());

        let rows: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = row.metadata.clone();
                for (idx, col) in self.stat_columns.iter().enumerate() {
                    let cell = match row.stats.get(col) {
                        Some(v) => v.render(),
                        None if numeric[idx] => "0".to_string(),
                        None => String::new(),
                    };
                    cells.push(cell);
                }
                cells
            })
            .collect();

        export::write_csv(path, &header, &rows)
    }

    /// Reads a table back from disk. The leading header cells that belong to
    /// `metadata_columns` form the metadata prefix; everything after is a
    /// stat column. Empty cells read as missing.
    pub fn read_csv(path: &Path, metadata_columns: &[&str]) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path).map_err(|err| map_csv_err(path, err))?;
        let headers = reader
            .headers()
            .map_err(|err| PipelineError::csv(path, err))?
            .clone();

        let mut meta_len = 0;
        for header in headers.iter() {
            if metadata_columns.iter().any(|m| *m == header) {
                meta_len += 1;
            } else {
                break;
            }
        }

        let metadata_cols: Vec<String> =
            headers.iter().take(meta_len).map(str::to_string).collect();
        let stat_cols: Vec<String> = headers.iter().skip(meta_len).map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| PipelineError::csv(path, err))?;
            let metadata = (0..meta_len)
                .map(|idx| record.get(idx).unwrap_or("").to_string())
                .collect();
            let mut stats = HashMap::new();
            for (offset, name) in stat_cols.iter().enumerate() {
                let cell = record.get(meta_len + offset).unwrap_or("");
                if !cell.is_empty() {
                    stats.insert(name.clone(), StatValue::parse(cell));
                }
            }
            rows.push(TotalsRow { metadata, stats });
        }

        Ok(Self {
            metadata_columns: metadata_cols,
            stat_columns: stat_cols,
            rows,
        })
    }
}

fn map_csv_err(path: &Path, err: csv::Error) -> PipelineError {
    if err.is_io_error()
        && let csv::ErrorKind::Io(io_err) = err.into_kind()
    {
        if io_err.kind() == std::io::ErrorKind::NotFound {
            return PipelineError::NotFound {
                path: path.to_path_buf(),
            };
        }
        return PipelineError::io(path, io_err);
    }
    PipelineError::data(format!("unreadable csv at {}", path.display()))
}

#[derive(Debug, Clone, Default)]
pub struct ExtractSummary {
    pub files_processed: usize,
    pub files_skipped: usize,
    pub rows: usize,
    pub errors: Vec<String>,
}

/// Builds the per-player season-totals table from every file under `dir`.
/// Unlike match loading, a bad file here is skipped and counted; downstream
/// feature engineering works per row and tolerates a partial season set.
pub fn extract_player_totals(dir: &Path) -> Result<(SeasonTotalsTable, ExtractSummary)> {
    extract_totals(dir, &PLAYER_METADATA_COLUMNS, collect_player_rows)
}

/// One row per file taken from the contestant-level stat block.
pub fn extract_team_totals(dir: &Path) -> Result<(SeasonTotalsTable, ExtractSummary)> {
    extract_totals(dir, &TEAM_METADATA_COLUMNS, collect_team_row)
}

fn extract_totals(
    dir: &Path,
    metadata_columns: &[&str],
    collect: fn(&Value, &mut SeasonTotalsTable) -> usize,
) -> Result<(SeasonTotalsTable, ExtractSummary)> {
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

    let mut table = SeasonTotalsTable::new(metadata_columns);
    let mut summary = ExtractSummary::default();

    for path in &files {
        match read_json(path) {
            Ok(value) => {
                let added = collect(&value, &mut table);
                if added == 0 {
                    warn!(file = %path.display(), "no usable rows in season stats file");
                    summary.files_skipped += 1;
                    summary
                        .errors
                        .push(format!("{}: no usable rows", path.display()));
                } else {
                    summary.files_processed += 1;
                    summary.rows += added;
                }
            }
            Err(err) => {
                warn!(file = %path.display(), %err, "skipping unreadable season stats file");
                summary.files_skipped += 1;
                summary.errors.push(err.to_string());
            }
        }
    }

    if table.is_empty() {
        return Err(PipelineError::data(format!(
            "no season stats could be extracted from {}",
            dir.display()
        )));
    }
    info!(
        rows = table.len(),
        stat_columns = table.stat_columns.len(),
        files = summary.files_processed,
        "season totals extracted"
    );
    Ok((table, summary))
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
    files.sort();
    Ok(files)
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
    serde_json::from_str(&raw).map_err(|err| PipelineError::json(path, err))
}

fn collect_player_rows(value: &Value, table: &mut SeasonTotalsTable) -> usize {
    let shared = shared_metadata(value);
    let Some(players) = value.get("player").and_then(|v| v.as_array()) else {
        return 0;
    };

    let mut added = 0;
    for player in players {
        if !player.is_object() {
            warn!("invalid player entry in season stats file");
            continue;
        }
        let short_name = format!(
            "{} {}",
            str_field(player, "shortFirstName"),
            str_field(player, "shortLastName")
        )
        .trim()
        .to_string();

        let metadata = vec![
            shared.team_name.clone(),
            shared.team_id.clone(),
            shared.competition.clone(),
            shared.season.clone(),
            player
                .get("id")
                .and_then(as_string_any)
                .unwrap_or_default(),
            str_field(player, "matchName"),
            str_field(player, "firstName"),
            str_field(player, "lastName"),
            short_name,
            str_field(player, "position"),
            player
                .get("shirtNumber")
                .and_then(as_string_any)
                .unwrap_or_default(),
        ];

        table.push_row(metadata, collect_stats(player.get("stat")));
        added += 1;
    }
    added
}

fn collect_team_row(value: &Value, table: &mut SeasonTotalsTable) -> usize {
    let shared = shared_metadata(value);
    let Some(contestant) = value.get("contestant") else {
        return 0;
    };
    let metadata = vec![
        shared.team_name,
        shared.team_id,
        shared.competition,
        shared.season,
    ];
    table.push_row(metadata, collect_stats(contestant.get("stat")));
    1
}

struct SharedMetadata {
    team_name: String,
    team_id: String,
    competition: String,
    season: String,
}

fn shared_metadata(value: &Value) -> SharedMetadata {
    SharedMetadata {
        team_name: value
            .pointer("/contestant/name")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string(),
        team_id: value
            .pointer("/contestant/id")
            .and_then(as_string_any)
            .unwrap_or_default(),
        competition: value
            .pointer("/competition/name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        season: value
            .pointer("/tournamentCalendar/name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

fn collect_stats(stat_list: Option<&Value>) -> Vec<(String, StatValue)> {
    let Some(entries) = stat_list.and_then(|v| v.as_array()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for entry in entries {
        let Some(name) = entry.get("name").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(value) = entry.get("value") else {
            continue;
        };
        out.push((normalize_stat_name(name), StatValue::from_value(value)));
    }
    out
}

/// Lowercases and turns spaces and hyphens into underscores, matching the
/// column names the dashboard vocabulary is written against.
pub fn normalize_stat_name(name: &str) -> String {
    name.to_lowercase().replace([' ', '-'], "_")
}

fn str_field(v: &Value, key: &str) -> String {
    v.get(key)
        .and_then(|x| x.as_str())
        .unwrap_or_default()
        .to_string()
}
