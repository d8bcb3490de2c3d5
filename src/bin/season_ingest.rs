use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};

use opta_pipeline::config::{LogConfig, PipelineConfig};
use opta_pipeline::logging;
use opta_pipeline::pipeline;

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _guard = logging::init(&LogConfig::from_env());

    let mut cfg = PipelineConfig::from_env();
    if let Some(dir) = parse_path_arg("--stats-dir") {
        cfg.season_stats_dir = dir;
    }
    if let Some(dir) = parse_path_arg("--out-dir") {
        cfg.out_dir = dir;
    }
    let engineer = !has_flag("--skip-features");

    let started = Instant::now();
    let summary = pipeline::run_season_totals_pipeline(&cfg, engineer)
        .context("season totals pipeline failed")?;

    println!(
        "Season totals ingest complete in {:.1}s",
        started.elapsed().as_secs_f64()
    );
    println!(
        "Players: {} rows from {} files ({} skipped)",
        summary.players.rows, summary.players.files_processed, summary.players.files_skipped
    );
    println!(
        "Teams: {} rows from {} files ({} skipped)",
        summary.teams.rows, summary.teams.files_processed, summary.teams.files_skipped
    );
    match &summary.features {
        Some(features) => {
            println!(
                "Features: {} p90 columns, {} ratio columns",
                features.p90_columns_added, features.ratio_columns_added
            );
            if !features.ratios_skipped.is_empty() {
                println!("  skipped ratios: {}", features.ratios_skipped.join(", "));
            }
        }
        None => println!("Features: skipped"),
    }
    for path in &summary.artifacts {
        println!("  -> {}", path.display());
    }
    if !summary.players.errors.is_empty() {
        println!("Skipped files ({}):", summary.players.errors.len());
        for err in summary.players.errors.iter().take(6) {
            println!("  - {err}");
        }
    }

    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next.trim()));
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}
