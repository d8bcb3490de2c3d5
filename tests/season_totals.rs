use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use opta_pipeline::error::PipelineError;
use opta_pipeline::season_totals::{
    PLAYER_METADATA_COLUMNS, SeasonTotalsTable, StatValue, extract_player_totals,
    extract_team_totals,
};

fn fixtures_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn stage_dir(names: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    for name in names {
        let data = fs::read(fixtures_dir().join(name)).expect("fixture file should be readable");
        fs::write(dir.path().join(name), data).expect("fixture copy should succeed");
    }
    dir
}

#[test]
fn players_extract_across_files_in_stable_order() {
    let dir = stage_dir(&["season_stats_inter.json", "season_stats_orlando.json"]);
    let (table, summary) = extract_player_totals(dir.path()).expect("fixtures should extract");

    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.files_skipped, 0);
    assert_eq!(table.len(), 4);

    // Stat columns appear in first-seen order across the sorted file list.
    assert_eq!(table.stat_columns[0], "time_played");
    assert_eq!(table.stat_columns[1], "goals");
    let winning = table
        .stat_columns
        .iter()
        .position(|c| c == "winning_goal")
        .expect("orlando-only column should exist");
    assert_eq!(winning, table.stat_columns.len() - 1);

    let messi = &table.rows[0];
    assert_eq!(messi.metadata[0], "Inter Miami");
    assert_eq!(messi.metadata[5], "L. Messi");
    assert_eq!(messi.metadata[8], "Lionel Messi");
    assert_eq!(messi.metadata[9], "Attacker");
    assert_eq!(messi.metadata[10], "10");
    assert_eq!(messi.stats.get("goals"), Some(&StatValue::Int(20)));
    assert_eq!(messi.stats.get("time_played"), Some(&StatValue::Int(2470)));
}

#[test]
fn numeric_and_text_columns_are_typed_separately() {
    let dir = stage_dir(&["season_stats_inter.json", "season_stats_orlando.json"]);
    let (table, _) = extract_player_totals(dir.path()).expect("fixtures should extract");

    assert!(table.column_is_numeric("goals"));
    assert!(table.column_is_integer("goals"));
    assert!(!table.column_is_numeric("position_side"));
    assert!(!table.column_is_integer("position_side"));

    let (teams, _) = extract_team_totals(dir.path()).expect("fixtures should extract");
    assert!(teams.column_is_numeric("possession_percentage"));
    assert!(!teams.column_is_integer("possession_percentage"));
}

#[test]
fn bad_files_are_skipped_and_counted() {
    let dir = stage_dir(&[
        "season_stats_inter.json",
        "season_stats_bad.json",
        "season_stats_broken.json",
    ]);
    let (table, summary) = extract_player_totals(dir.path()).expect("good file should carry");

    assert_eq!(summary.files_processed, 1);
    assert_eq!(summary.files_skipped, 2);
    assert_eq!(summary.errors.len(), 2);
    assert_eq!(table.len(), 3);
}

#[test]
fn all_bad_files_is_a_data_error() {
    let dir = stage_dir(&["season_stats_bad.json", "season_stats_broken.json"]);
    let err = extract_player_totals(dir.path()).unwrap_err();
    assert!(matches!(err, PipelineError::Data(_)));
}

#[test]
fn team_extraction_yields_one_row_per_file() {
    let dir = stage_dir(&["season_stats_inter.json", "season_stats_orlando.json"]);
    let (table, summary) = extract_team_totals(dir.path()).expect("fixtures should extract");

    assert_eq!(summary.rows, 2);
    assert_eq!(table.len(), 2);
    assert_eq!(
        table.rows[0].metadata,
        vec!["Inter Miami", "t_im", "MLS", "2024 MLS Season"]
    );
    assert_eq!(table.rows[0].stats.get("goals"), Some(&StatValue::Int(71)));
    assert_eq!(table.rows[1].metadata[0], "Orlando City");
}

#[test]
fn csv_round_trip_fills_missing_cells_by_column_type() {
    let dir = stage_dir(&["season_stats_inter.json", "season_stats_orlando.json"]);
    let (table, _) = extract_player_totals(dir.path()).expect("fixtures should extract");

    let out = tempfile::tempdir().expect("tempdir should be creatable");
    let path = out.path().join("players.csv");
    table.write_csv(&path).expect("table should write");

    let back =
        SeasonTotalsTable::read_csv(&path, &PLAYER_METADATA_COLUMNS).expect("table should read");
    assert_eq!(back.metadata_columns.len(), PLAYER_METADATA_COLUMNS.len());
    assert_eq!(back.stat_columns, table.stat_columns);
    assert_eq!(back.len(), table.len());

    // Callender has no pass stats in the feed; numeric fill writes 0.
    let callender = back
        .rows
        .iter()
        .find(|r| r.metadata[5] == "D. Callender")
        .expect("goalkeeper row should exist");
    assert_eq!(
        callender.stats.get("total_passes"),
        Some(&StatValue::Int(0))
    );
    // Text columns fill as empty, which reads back as missing.
    assert!(callender.stats.get("position_side").is_none());
}
