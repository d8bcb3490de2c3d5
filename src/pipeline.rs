use std::path::PathBuf;

use tracing::{info, warn};

use crate::code_mapper::{self, MapSummary};
use crate::config::PipelineConfig;
use crate::data_cleaner::{self, CleanReport};
use crate::error::Result;
use crate::event_flattener::{self, FlattenSummary};
use crate::export;
use crate::feature_engineering::{self, FeatureSummary};
use crate::match_loader;
use crate::schema::CodeMappings;
use crate::season_totals::{self, ExtractSummary};
use crate::stats_aggregator;

/// Stage-by-stage account of one events run, for callers that print a report.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub matches_loaded: usize,
    pub flatten: FlattenSummary,
    pub mapping: MapSummary,
    pub cleaning: CleanReport,
    pub season_rows: usize,
    pub match_rows: usize,
    pub artifacts: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct SeasonTotalsSummary {
    pub players: ExtractSummary,
    pub teams: ExtractSummary,
    /// None when the run skipped feature engineering.
    pub features: Option<FeatureSummary>,
    pub artifacts: Vec<PathBuf>,
}

/// Match events end to end: load, flatten, resolve code names, export the
/// wide event table, then clean it and aggregate the two stats grains.
pub fn run_events_pipeline(cfg: &PipelineConfig) -> Result<PipelineSummary> {
    let team = cfg.team.as_deref();
    info!(
        events_dir = %cfg.events_dir.display(),
        team = team.unwrap_or("all"),
        tag = %cfg.dataset_tag,
        "events pipeline starting"
    );

    let mappings = CodeMappings::load(&cfg.mappings_dir)?;
    let docs = match_loader::load_match_documents(&cfg.events_dir, team)?;
    let (mut table, flatten) = event_flattener::flatten_matches(&docs, &mappings)?;
    let mapping = code_mapper::apply_names(&mut table, &mappings)?;

    let events_path = export::events_csv_path(&cfg.out_dir, team, &cfg.dataset_tag);
    export::write_event_table(&table, &events_path)?;
    info!(path = %events_path.display(), rows = table.len(), "event table written");

    let cleaning = data_cleaner::clean(&mut table, cfg.target_stage.as_deref());

    let season = stats_aggregator::aggregate_season(&table, team);
    if season.is_empty() {
        warn!(
            team = team.unwrap_or("all"),
            "no players matched the aggregation scope"
        );
    }
    let season_path = export::season_stats_path(&cfg.out_dir, &cfg.dataset_tag);
    export::write_season_stats(&season, &season_path)?;

    let per_match = stats_aggregator::aggregate_per_match(&table, team);
    let match_path = export::match_stats_path(&cfg.out_dir, &cfg.dataset_tag);
    export::write_match_stats(&per_match, &match_path)?;

    info!(
        season_rows = season.len(),
        match_rows = per_match.len(),
        "events pipeline finished"
    );
    Ok(PipelineSummary {
        matches_loaded: docs.len(),
        flatten,
        mapping,
        cleaning,
        season_rows: season.len(),
        match_rows: per_match.len(),
        artifacts: vec![events_path, season_path, match_path],
    })
}

/// Season-totals feed: extract the per-player table, widen it with derived
/// features in place, then extract the per-team table.
pub fn run_season_totals_pipeline(
    cfg: &PipelineConfig,
    engineer: bool,
) -> Result<SeasonTotalsSummary> {
    info!(
        season_stats_dir = %cfg.season_stats_dir.display(),
        tag = %cfg.dataset_tag,
        "season totals pipeline starting"
    );

    let (players, player_summary) = season_totals::extract_player_totals(&cfg.season_stats_dir)?;
    let players_path = export::player_totals_path(&cfg.out_dir, &cfg.dataset_tag);
    players.write_csv(&players_path)?;
    info!(path = %players_path.display(), rows = players.len(), "player totals written");

    let features = if engineer {
        Some(feature_engineering::engineer_features(&players_path)?)
    } else {
        info!("feature engineering skipped");
        None
    };

    let (teams, team_summary) = season_totals::extract_team_totals(&cfg.season_stats_dir)?;
    let teams_path = export::team_totals_path(&cfg.out_dir, &cfg.dataset_tag);
    teams.write_csv(&teams_path)?;
    info!(path = %teams_path.display(), rows = teams.len(), "team totals written");

    Ok(SeasonTotalsSummary {
        players: player_summary,
        teams: team_summary,
        features,
        artifacts: vec![players_path, teams_path],
    })
}
