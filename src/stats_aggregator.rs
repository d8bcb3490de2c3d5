use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use crate::event_flattener::{EventRow, EventTable};
use crate::schema::{
    ALL_SHOT_EVENTS, DEFENSIVE_EVENTS, SCORING_ASSIST_VALUE, event_names, qualifier_names,
};

/// Season-level aggregate for one player. Count fields are filled from
/// zero-initialized accumulators, so none of them is ever null downstream.
#[derive(Debug, Clone)]
pub struct PlayerSeasonStat {
    pub player_name: String,
    pub team: String,
    pub matches_played: u32,
    pub total_actions: u32,
    pub passes_attempted: u32,
    pub passes_completed: i64,
    pub avg_pass_distance: f64,
    pub assists: u32,
    pub key_passes: i64,
    pub pass_completion_rate: f64,
    pub goals: u32,
    pub shots_total: u32,
    pub shots_on_target: u32,
    pub defensive_actions: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub avg_x_position: f64,
    pub avg_y_position: f64,
    pub primary_zone: String,
    pub minutes_played_approx: i32,
    pub goals_per_match: f64,
    pub assists_per_match: f64,
    pub shots_per_match: f64,
    pub shot_conversion_rate: f64,
    pub shots_on_target_rate: f64,
}

/// Same metric shape grouped by (player, match); matches_played is 1 by
/// construction and the group keeps its raw minute bounds.
#[derive(Debug, Clone)]
pub struct PlayerMatchStat {
    pub player_name: String,
    pub match_id: String,
    pub team: String,
    pub total_actions: u32,
    pub min_minute: i32,
    pub max_minute: i32,
    pub minutes_played_approx: i32,
    pub matches_played: u32,
    pub passes_attempted: u32,
    pub passes_completed: i64,
    pub avg_pass_distance: f64,
    pub assists: u32,
    pub key_passes: i64,
    pub pass_completion_rate: f64,
    pub goals: u32,
    pub shots_total: u32,
    pub shots_on_target: u32,
    pub defensive_actions: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
    pub avg_x_position: f64,
    pub avg_y_position: f64,
    pub primary_zone: String,
    pub shot_conversion_rate: f64,
    pub shots_on_target_rate: f64,
}

/// Qualifier column positions the metrics read, resolved once per table.
struct QualifierCols {
    length: Option<u32>,
    assist: Option<u32>,
    key_pass: Option<u32>,
    zone: Option<u32>,
}

impl QualifierCols {
    fn resolve(table: &EventTable) -> Self {
        Self {
            length: table.qualifier_code(qualifier_names::LENGTH),
            assist: table.qualifier_code(qualifier_names::ASSIST),
            key_pass: table.qualifier_code(qualifier_names::KEY_PASS),
            zone: table.qualifier_code(qualifier_names::ZONE),
        }
    }
}

/// Running sums and counts for one group. Every metric starts at zero, which
/// is what makes the "missing metric fills as 0" contract hold without any
/// post-join fixup.
#[derive(Debug, Default)]
struct MetricAcc {
    team: Option<String>,
    match_ids: BTreeSet<String>,
    total_actions: u32,
    goals: u32,
    shots_saved: u32,
    shots_total: u32,
    passes_attempted: u32,
    passes_completed: i64,
    pass_length_sum: f64,
    pass_length_count: u32,
    assists: u32,
    key_passes: f64,
    defensive_actions: u32,
    yellow_cards: u32,
    red_cards: u32,
    x_sum: f64,
    x_count: u32,
    y_sum: f64,
    y_count: u32,
    zone_counts: BTreeMap<String, u32>,
    min_minute: Option<i32>,
    max_minute: Option<i32>,
}

impl MetricAcc {
    fn ingest(&mut self, row: &EventRow, cols: &QualifierCols) {
        if self.team.is_none() {
            self.team = row.contestant_name.clone();
        }
        self.match_ids.insert(row.match_id.clone());
        self.total_actions += 1;

        let type_name = row.event_type_name.as_deref().unwrap_or("");
        match type_name {
            event_names::GOAL => self.goals += 1,
            event_names::ATTEMPT_SAVED => self.shots_saved += 1,
            event_names::YELLOW_CARD => self.yellow_cards += 1,
            event_names::RED_CARD => self.red_cards += 1,
            _ => {}
        }
        if ALL_SHOT_EVENTS.contains(&type_name) {
            self.shots_total += 1;
        }
        if DEFENSIVE_EVENTS.contains(&type_name) {
            self.defensive_actions += 1;
        }

        if type_name == event_names::PASS {
            self.passes_attempted += 1;
            self.passes_completed += i64::from(row.outcome.unwrap_or(0));
            if let Some(len) = qualifier_f64(row, cols.length) {
                self.pass_length_sum += len;
                self.pass_length_count += 1;
            }
            if qualifier_i64(row, cols.assist) == Some(SCORING_ASSIST_VALUE) {
                self.assists += 1;
            }
            if let Some(kp) = qualifier_f64(row, cols.key_pass) {
                self.key_passes += kp;
            }
        }

        if let Some(x) = row.x {
            self.x_sum += x;
            self.x_count += 1;
        }
        if let Some(y) = row.y {
            self.y_sum += y;
            self.y_count += 1;
        }
        if let Some(zone) = cols.zone.and_then(|code| row.qualifier(code)) {
            *self.zone_counts.entry(zone.to_string()).or_insert(0) += 1;
        }
        if let Some(minute) = row.time_min {
            self.min_minute = Some(self.min_minute.map_or(minute, |m| m.min(minute)));
            self.max_minute = Some(self.max_minute.map_or(minute, |m| m.max(minute)));
        }
    }

    fn shots_on_target(&self) -> u32 {
        self.goals + self.shots_saved
    }

    fn avg_pass_distance(&self) -> f64 {
        guarded_ratio(self.pass_length_sum, f64::from(self.pass_length_count))
    }

    fn pass_completion_rate(&self) -> f64 {
        round3(guarded_ratio(
            self.passes_completed as f64,
            f64::from(self.passes_attempted),
        ))
    }

    fn shot_conversion_rate(&self) -> f64 {
        round3(f64::from(self.goals) / f64::from(self.shots_total.max(1)))
    }

    fn shots_on_target_rate(&self) -> f64 {
        round3(f64::from(self.shots_on_target()) / f64::from(self.shots_total.max(1)))
    }

    fn avg_x(&self) -> f64 {
        guarded_ratio(self.x_sum, f64::from(self.x_count))
    }

    fn avg_y(&self) -> f64 {
        guarded_ratio(self.y_sum, f64::from(self.y_count))
    }

    /// Most frequent zone label; ties break to the smallest label, no zones
    /// reads as Unknown.
    fn primary_zone(&self) -> String {
        let mut best: Option<(&String, u32)> = None;
        for (zone, count) in &self.zone_counts {
            if best.is_none_or(|(_, best_count)| *count > best_count) {
                best = Some((zone, *count));
            }
        }
        best.map_or_else(|| "Unknown".to_string(), |(zone, _)| zone.clone())
    }

    fn minutes_played_approx(&self) -> i32 {
        match (self.min_minute, self.max_minute) {
            (Some(lo), Some(hi)) => hi - lo,
            _ => 0,
        }
    }

    fn into_season(self, player_name: String) -> PlayerSeasonStat {
        let matches_played = self.match_ids.len() as u32;
        let per_match = |count: u32| round3(guarded_ratio(f64::from(count), f64::from(matches_played)));
        PlayerSeasonStat {
            team: self.team.clone().unwrap_or_default(),
            matches_played,
            total_actions: self.total_actions,
            passes_attempted: self.passes_attempted,
            passes_completed: self.passes_completed,
            avg_pass_distance: self.avg_pass_distance(),
            assists: self.assists,
            key_passes: self.key_passes.round() as i64,
            pass_completion_rate: self.pass_completion_rate(),
            goals: self.goals,
            shots_total: self.shots_total,
            shots_on_target: self.shots_on_target(),
            defensive_actions: self.defensive_actions,
            yellow_cards: self.yellow_cards,
            red_cards: self.red_cards,
            avg_x_position: self.avg_x(),
            avg_y_position: self.avg_y(),
            primary_zone: self.primary_zone(),
            minutes_played_approx: self.minutes_played_approx(),
            goals_per_match: per_match(self.goals),
            assists_per_match: per_match(self.assists),
            shots_per_match: per_match(self.shots_total),
            shot_conversion_rate: self.shot_conversion_rate(),
            shots_on_target_rate: self.shots_on_target_rate(),
            player_name,
        }
    }

    fn into_match(self, player_name: String, match_id: String) -> PlayerMatchStat {
        PlayerMatchStat {
            team: self.team.clone().unwrap_or_default(),
            total_actions: self.total_actions,
            min_minute: self.min_minute.unwrap_or(0),
            max_minute: self.max_minute.unwrap_or(0),
            minutes_played_approx: self.minutes_played_approx(),
            matches_played: 1,
            passes_attempted: self.passes_attempted,
            passes_completed: self.passes_completed,
            avg_pass_distance: self.avg_pass_distance(),
            assists: self.assists,
            key_passes: self.key_passes.round() as i64,
            pass_completion_rate: self.pass_completion_rate(),
            goals: self.goals,
            shots_total: self.shots_total,
            shots_on_target: self.shots_on_target(),
            defensive_actions: self.defensive_actions,
            yellow_cards: self.yellow_cards,
            red_cards: self.red_cards,
            avg_x_position: self.avg_x(),
            avg_y_position: self.avg_y(),
            primary_zone: self.primary_zone(),
            shot_conversion_rate: self.shot_conversion_rate(),
            shots_on_target_rate: self.shots_on_target_rate(),
            player_name,
            match_id,
        }
    }
}

/// Season aggregation: one row per named player, restricted to `team` when
/// one is given. An empty restriction yields an empty result, not an error.
pub fn aggregate_season(table: &EventTable, team: Option<&str>) -> Vec<PlayerSeasonStat> {
    let cols = QualifierCols::resolve(table);
    let mut groups: BTreeMap<String, MetricAcc> = BTreeMap::new();
    for row in table.rows.iter().filter(|row| in_scope(row, team)) {
        let Some(player) = row.player_name.clone() else {
            continue;
        };
        groups.entry(player).or_default().ingest(row, &cols);
    }
    info!(
        team = team.unwrap_or("all"),
        players = groups.len(),
        "season aggregation complete"
    );
    groups
        .into_iter()
        .map(|(player, acc)| acc.into_season(player))
        .collect()
}

/// Match aggregation: one row per (player, match), same restriction and
/// metric battery as the season grain.
pub fn aggregate_per_match(table: &EventTable, team: Option<&str>) -> Vec<PlayerMatchStat> {
    let cols = QualifierCols::resolve(table);
    let mut groups: BTreeMap<(String, String), MetricAcc> = BTreeMap::new();
    for row in table.rows.iter().filter(|row| in_scope(row, team)) {
        let Some(player) = row.player_name.clone() else {
            continue;
        };
        groups
            .entry((player, row.match_id.clone()))
            .or_default()
            .ingest(row, &cols);
    }
    info!(
        team = team.unwrap_or("all"),
        rows = groups.len(),
        "per-match aggregation complete"
    );
    groups
        .into_iter()
        .map(|((player, match_id), acc)| acc.into_match(player, match_id))
        .collect()
}

fn in_scope(row: &EventRow, team: Option<&str>) -> bool {
    if row.player_name.is_none() {
        return false;
    }
    team.is_none_or(|t| row.contestant_name.as_deref() == Some(t))
}

fn qualifier_f64(row: &EventRow, code: Option<u32>) -> Option<f64> {
    code.and_then(|c| row.qualifier(c))
        .and_then(|raw| raw.trim().parse::<f64>().ok())
}

fn qualifier_i64(row: &EventRow, code: Option<u32>) -> Option<i64> {
    code.and_then(|c| row.qualifier(c))
        .and_then(|raw| raw.trim().parse::<i64>().ok())
}

fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
