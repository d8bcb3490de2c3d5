use std::path::Path;

use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::season_totals::{PLAYER_METADATA_COLUMNS, SeasonTotalsTable, StatValue};

const TIME_PLAYED: &str = "time_played";

/// Columns that are integers in the feed but make no sense per 90 minutes.
const P90_EXCLUDED: [&str; 2] = [TIME_PLAYED, "shirt_number"];

struct RatioSpec {
    name: &'static str,
    numerator: &'static str,
    denominator: &'static str,
    /// save_rate divides by saves + goals conceded rather than a single
    /// attempt column.
    denominator_includes_numerator: bool,
}

const fn ratio(name: &'static str, num: &'static str, den: &'static str) -> RatioSpec {
    RatioSpec {
        name,
        numerator: num,
        denominator: den,
        denominator_includes_numerator: false,
    }
}

const RATIO_SPECS: [RatioSpec; 14] = [
    ratio("tackle_success_rate", "tackles_won", "total_tackles"),
    ratio("duel_success_rate", "duels_won", "total_duels"),
    ratio(
        "aerial_duel_success_rate",
        "aerial_duels_won",
        "total_aerial_duels",
    ),
    ratio(
        "ground_duel_success_rate",
        "ground_duels_won",
        "total_ground_duels",
    ),
    ratio(
        "pass_completion_rate",
        "total_successful_passes",
        "total_passes",
    ),
    ratio(
        "long_pass_success_rate",
        "successful_long_passes",
        "total_long_passes",
    ),
    ratio(
        "short_pass_success_rate",
        "successful_short_passes",
        "total_short_passes",
    ),
    ratio("dribble_success_rate", "successful_dribbles", "total_dribbles"),
    ratio("shot_accuracy", "shots_on_target", "total_shots"),
    ratio("goal_conversion_rate", "goals", "total_shots"),
    ratio(
        "goals_from_outside_box_ratio",
        "goals_from_outside_box",
        "goals",
    ),
    ratio("penalty_conversion_rate", "penalty_goals", "penalties_taken"),
    RatioSpec {
        name: "save_rate",
        numerator: "saves_made",
        denominator: "goals_conceded",
        denominator_includes_numerator: true,
    },
    ratio(
        "gk_distribution_success_rate",
        "gk_successful_distribution",
        "gk_total_distribution",
    ),
];

#[derive(Debug, Clone, Default)]
pub struct FeatureSummary {
    pub rows: usize,
    pub p90_columns_added: usize,
    pub ratio_columns_added: usize,
    pub ratios_skipped: Vec<String>,
}

/// Reads the per-player season totals file, derives per-90 and success-rate
/// columns, and writes the widened table back over the same path.
pub fn engineer_features(path: &Path) -> Result<FeatureSummary> {
    let mut table = SeasonTotalsTable::read_csv(path, &PLAYER_METADATA_COLUMNS)?;
    if !table.stat_columns.iter().any(|c| c == TIME_PLAYED) {
        return Err(PipelineError::data(format!(
            "season stats file {} has no {TIME_PLAYED} column",
            path.display()
        )));
    }

    let mut summary = FeatureSummary {
        rows: table.len(),
        ..FeatureSummary::default()
    };

    add_per90_columns(&mut table, &mut summary);
    add_ratio_columns(&mut table, &mut summary);
    scrub_and_round(&mut table);

    table.write_csv(path)?;
    info!(
        rows = summary.rows,
        p90 = summary.p90_columns_added,
        ratios = summary.ratio_columns_added,
        skipped = summary.ratios_skipped.len(),
        "feature engineering complete"
    );
    Ok(summary)
}

fn add_per90_columns(table: &mut SeasonTotalsTable, summary: &mut FeatureSummary) {
    let base: Vec<String> = table
        .stat_columns
        .iter()
        .filter(|c| !P90_EXCLUDED.contains(&c.as_str()) && table.column_is_integer(c))
        .cloned()
        .collect();

    for col in &base {
        let name = format!("{col}_p90");
        for row in 0..table.len() {
            let minutes = table.stat_f64(row, TIME_PLAYED).unwrap_or(0.0);
            let value = if minutes > 0.0 {
                table.stat_f64(row, col).unwrap_or(0.0) / minutes * 90.0
            } else {
                0.0
            };
            table.set_stat(row, &name, StatValue::Float(value));
        }
        summary.p90_columns_added += 1;
    }
}

fn add_ratio_columns(table: &mut SeasonTotalsTable, summary: &mut FeatureSummary) {
    for spec in &RATIO_SPECS {
        let have_inputs = table.stat_columns.iter().any(|c| c == spec.numerator)
            && table.stat_columns.iter().any(|c| c == spec.denominator);
        if !have_inputs {
            warn!(
                column = spec.name,
                numerator = spec.numerator,
                denominator = spec.denominator,
                "skipping ratio, inputs missing from season stats"
            );
            summary.ratios_skipped.push(spec.name.to_string());
            continue;
        }
        for row in 0..table.len() {
            let num = table.stat_f64(row, spec.numerator).unwrap_or(0.0);
            let mut den = table.stat_f64(row, spec.denominator).unwrap_or(0.0);
            if spec.denominator_includes_numerator {
                den += num;
            }
            let value = if den > 0.0 { num / den } else { 0.0 };
            table.set_stat(row, spec.name, StatValue::Float(value));
        }
        summary.ratio_columns_added += 1;
    }
}

/// Zeroes any non-finite value and rounds every float cell to two decimals
/// so repeated runs over the same inputs stay byte-identical.
fn scrub_and_round(table: &mut SeasonTotalsTable) {
    for row in &mut table.rows {
        for value in row.stats.values_mut() {
            if let StatValue::Float(f) = value {
                let clean = if f.is_finite() { *f } else { 0.0 };
                *f = (clean * 100.0).round() / 100.0;
            }
        }
    }
}
