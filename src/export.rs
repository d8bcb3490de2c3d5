use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::event_flattener::{EventRow, EventTable};
use crate::stats_aggregator::{PlayerMatchStat, PlayerSeasonStat};

/// Scalar event columns in feed order, with the resolved type name sitting
/// right behind the raw type id.
const EVENT_SCALAR_HEADER: [&str; 15] = [
    "id",
    "eventId",
    "typeId",
    "eventTypeName",
    "periodId",
    "timeMin",
    "timeSec",
    "contestantId",
    "playerId",
    "playerName",
    "outcome",
    "x",
    "y",
    "timeStamp",
    "lastModified",
];

const EVENT_TRAILER_HEADER: [&str; 3] = ["match_id", "match_stage", "contestant_name"];

const SEASON_STATS_HEADER: [&str; 25] = [
    "player_name",
    "team",
    "matches_played",
    "total_actions",
    "passes_attempted",
    "passes_completed",
    "avg_pass_distance",
    "assists",
    "key_passes",
    "pass_completion_rate",
    "goals",
    "shots_total",
    "shots_on_target",
    "defensive_actions",
    "yellow_cards",
    "red_cards",
    "avg_x_position",
    "avg_y_position",
    "primary_zone",
    "minutes_played_approx",
    "goals_per_match",
    "assists_per_match",
    "shots_per_match",
    "shot_conversion_rate",
    "shots_on_target_rate",
];

const MATCH_STATS_HEADER: [&str; 25] = [
    "player_name",
    "match_id",
    "team",
    "total_actions",
    "min_minute",
    "max_minute",
    "minutes_played_approx",
    "matches_played",
    "passes_attempted",
    "passes_completed",
    "avg_pass_distance",
    "assists",
    "key_passes",
    "pass_completion_rate",
    "goals",
    "shots_total",
    "shots_on_target",
    "defensive_actions",
    "yellow_cards",
    "red_cards",
    "avg_x_position",
    "avg_y_position",
    "primary_zone",
    "shot_conversion_rate",
    "shots_on_target_rate",
];

/// Writes header and rows to a sibling tmp file, then renames over `path` so
/// readers never observe a half-written artifact.
pub fn write_csv(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let file = fs::File::create(&tmp).map_err(|err| PipelineError::io(&tmp, err))?;
        let mut writer = csv::Writer::from_writer(BufWriter::new(file));
        writer
            .write_record(header)
            .map_err(|err| PipelineError::csv(path, err))?;
        for row in rows {
            writer
                .write_record(row)
                .map_err(|err| PipelineError::csv(path, err))?;
        }
        writer.flush().map_err(|err| PipelineError::io(&tmp, err))?;
    }
    fs::rename(&tmp, path).map_err(|err| PipelineError::io(path, err))?;
    Ok(())
}

pub fn write_event_table(table: &EventTable, path: &Path) -> Result<()> {
    let mut header: Vec<String> = EVENT_SCALAR_HEADER.iter().map(|c| c.to_string()).collect();
    header.extend(table.qualifier_headers.iter().cloned());
    header.extend(EVENT_TRAILER_HEADER.iter().map(|c| c.to_string()));

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| event_cells(row, table))
        .collect();
    write_csv(path, &header, &rows)
}

fn event_cells(row: &EventRow, table: &EventTable) -> Vec<String> {
    let mut cells = vec![
        opt(&row.id),
        opt(&row.event_id),
        row.type_id.to_string(),
        row.event_type_name.clone().unwrap_or_default(),
        opt(&row.period_id),
        opt(&row.time_min),
        opt(&row.time_sec),
        row.contestant_id.clone().unwrap_or_default(),
        row.player_id.clone().unwrap_or_default(),
        row.player_name.clone().unwrap_or_default(),
        opt(&row.outcome),
        opt(&row.x),
        opt(&row.y),
        row.time_stamp.clone().unwrap_or_default(),
        row.last_modified.clone().unwrap_or_default(),
    ];
    for code in table.schema.codes() {
        cells.push(row.qualifier(*code).unwrap_or_default().to_string());
    }
    cells.push(row.match_id.clone());
    cells.push(row.match_stage.clone());
    cells.push(row.contestant_name.clone().unwrap_or_default());
    cells
}

pub fn write_season_stats(stats: &[PlayerSeasonStat], path: &Path) -> Result<()> {
    let header: Vec<String> = SEASON_STATS_HEADER.iter().map(|c| c.to_string()).collect();
    let rows: Vec<Vec<String>> = stats.iter().map(season_cells).collect();
    write_csv(path, &header, &rows)
}

fn season_cells(s: &PlayerSeasonStat) -> Vec<String> {
    vec![
        s.player_name.clone(),
        s.team.clone(),
        s.matches_played.to_string(),
        s.total_actions.to_string(),
        s.passes_attempted.to_string(),
        s.passes_completed.to_string(),
        s.avg_pass_distance.to_string(),
        s.assists.to_string(),
        s.key_passes.to_string(),
        s.pass_completion_rate.to_string(),
        s.goals.to_string(),
        s.shots_total.to_string(),
        s.shots_on_target.to_string(),
        s.defensive_actions.to_string(),
        s.yellow_cards.to_string(),
        s.red_cards.to_string(),
        s.avg_x_position.to_string(),
        s.avg_y_position.to_string(),
        s.primary_zone.clone(),
        s.minutes_played_approx.to_string(),
        s.goals_per_match.to_string(),
        s.assists_per_match.to_string(),
        s.shots_per_match.to_string(),
        s.shot_conversion_rate.to_string(),
        s.shots_on_target_rate.to_string(),
    ]
}

pub fn write_match_stats(stats: &[PlayerMatchStat], path: &Path) -> Result<()> {
    let header: Vec<String> = MATCH_STATS_HEADER.iter().map(|c| c.to_string()).collect();
    let rows: Vec<Vec<String>> = stats.iter().map(match_cells).collect();
    write_csv(path, &header, &rows)
}

fn match_cells(s: &PlayerMatchStat) -> Vec<String> {
    vec![
        s.player_name.clone(),
        s.match_id.clone(),
        s.team.clone(),
        s.total_actions.to_string(),
        s.min_minute.to_string(),
        s.max_minute.to_string(),
        s.minutes_played_approx.to_string(),
        s.matches_played.to_string(),
        s.passes_attempted.to_string(),
        s.passes_completed.to_string(),
        s.avg_pass_distance.to_string(),
        s.assists.to_string(),
        s.key_passes.to_string(),
        s.pass_completion_rate.to_string(),
        s.goals.to_string(),
        s.shots_total.to_string(),
        s.shots_on_target.to_string(),
        s.defensive_actions.to_string(),
        s.yellow_cards.to_string(),
        s.red_cards.to_string(),
        s.avg_x_position.to_string(),
        s.avg_y_position.to_string(),
        s.primary_zone.clone(),
        s.shot_conversion_rate.to_string(),
        s.shots_on_target_rate.to_string(),
    ]
}

fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

/// Lowercased team name with spaces as underscores; "all" when the run is
/// not restricted to one team.
pub fn team_slug(team: Option<&str>) -> String {
    match team {
        Some(name) => name.to_lowercase().replace(' ', "_"),
        None => "all".to_string(),
    }
}

pub fn events_csv_path(out_dir: &Path, team: Option<&str>, tag: &str) -> PathBuf {
    out_dir.join(format!("events_{}_{tag}.csv", team_slug(team)))
}

pub fn season_stats_path(out_dir: &Path, tag: &str) -> PathBuf {
    out_dir.join(format!("players_stats_{tag}.csv"))
}

pub fn match_stats_path(out_dir: &Path, tag: &str) -> PathBuf {
    out_dir.join(format!("players_stats_per_match_{tag}.csv"))
}

pub fn player_totals_path(out_dir: &Path, tag: &str) -> PathBuf {
    out_dir.join(format!("players_season_totals_{tag}.csv"))
}

pub fn team_totals_path(out_dir: &Path, tag: &str) -> PathBuf {
    out_dir.join(format!("teams_season_totals_{tag}.csv"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_flattener::flatten_matches;
    use crate::match_loader::{Contestant, MatchDocument};
    use crate::schema::CodeMappings;
    use serde_json::json;

    fn sample_table() -> EventTable {
        let docs = vec![MatchDocument {
            source_file: "m1.json".to_string(),
            id: "m1".to_string(),
            stage: "Regular Season".to_string(),
            contestants: vec![
                Contestant {
                    id: "t1".to_string(),
                    name: "Inter Miami".to_string(),
                },
                Contestant {
                    id: "t2".to_string(),
                    name: "Orlando City".to_string(),
                },
            ],
            events: vec![json!({
                "id": 7, "eventId": 1, "typeId": 1, "periodId": 1,
                "timeMin": 3, "timeSec": 12, "contestantId": "t1",
                "playerId": "p1", "playerName": "L. Messi", "outcome": 1,
                "x": 40.5, "y": 51.0, "timeStamp": "2024-03-01T00:03:12Z",
                "qualifier": [ { "qualifierId": 130, "value": "Long" } ]
            })],
        }];
        let mut mappings = CodeMappings::default();
        mappings.qualifiers.insert(130, "Long ball".to_string());
        let (table, _) = flatten_matches(&docs, &mappings).unwrap();
        table
    }

    #[test]
    fn event_header_puts_type_name_behind_type_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        write_event_table(&sample_table(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "id,eventId,typeId,eventTypeName,periodId,timeMin,timeSec,contestantId,\
             playerId,playerName,outcome,x,y,timeStamp,lastModified,qualifier_130,\
             match_id,match_stage,contestant_name"
        );
        let row = text.lines().nth(1).unwrap();
        assert!(row.starts_with("7,1,1,,1,3,12,t1,p1,L. Messi,1,40.5,51,"));
        assert!(row.ends_with("Long,m1,Regular Season,Inter Miami"));
    }

    #[test]
    fn repeated_writes_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let table = sample_table();
        let first = dir.path().join("a.csv");
        let second = dir.path().join("b.csv");
        write_event_table(&table, &first).unwrap();
        write_event_table(&table, &second).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }

    #[test]
    fn no_tmp_file_survives_a_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        write_event_table(&sample_table(), &path).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn stat_headers_match_struct_width() {
        let dir = tempfile::tempdir().unwrap();
        let season = dir.path().join("season.csv");
        let per_match = dir.path().join("match.csv");
        write_season_stats(&[], &season).unwrap();
        write_match_stats(&[], &per_match).unwrap();

        let season_header = std::fs::read_to_string(&season).unwrap();
        assert_eq!(season_header.trim().split(',').count(), 25);
        assert!(season_header.starts_with("player_name,team,matches_played"));

        let match_header = std::fs::read_to_string(&per_match).unwrap();
        assert_eq!(match_header.trim().split(',').count(), 25);
        assert!(match_header.starts_with("player_name,match_id,team"));
    }

    #[test]
    fn artifact_names_carry_slug_and_tag() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            events_csv_path(out, Some("Inter Miami"), "mls24"),
            Path::new("/tmp/out/events_inter_miami_mls24.csv")
        );
        assert_eq!(
            events_csv_path(out, None, "mls24"),
            Path::new("/tmp/out/events_all_mls24.csv")
        );
        assert_eq!(
            season_stats_path(out, "mls24"),
            Path::new("/tmp/out/players_stats_mls24.csv")
        );
        assert_eq!(
            match_stats_path(out, "mls24"),
            Path::new("/tmp/out/players_stats_per_match_mls24.csv")
        );
        assert_eq!(
            player_totals_path(out, "mls24"),
            Path::new("/tmp/out/players_season_totals_mls24.csv")
        );
        assert_eq!(
            team_totals_path(out, "mls24"),
            Path::new("/tmp/out/teams_season_totals_mls24.csv")
        );
    }
}
