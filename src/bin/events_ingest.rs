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
    if let Some(dir) = parse_path_arg("--events-dir") {
        cfg.events_dir = dir;
    }
    if let Some(dir) = parse_path_arg("--out-dir") {
        cfg.out_dir = dir;
    }
    if let Some(team) = parse_string_arg("--team") {
        cfg.team = Some(team);
    }
    if has_flag("--all") {
        cfg.team = None;
    }

    let started = Instant::now();
    let summary = pipeline::run_events_pipeline(&cfg).context("events pipeline failed")?;

    println!(
        "Events ingest complete in {:.1}s",
        started.elapsed().as_secs_f64()
    );
    println!(
        "Matches: {} loaded, {} skipped",
        summary.matches_loaded, summary.flatten.matches_skipped
    );
    println!(
        "Events: {} flattened, {} skipped",
        summary.flatten.events_flattened, summary.flatten.events_skipped
    );
    println!(
        "Cleaning: {} deleted-event rows, {} off-stage rows, {} remaining",
        summary.cleaning.deleted_event_rows,
        summary.cleaning.stage_filtered_rows,
        summary.cleaning.rows_remaining
    );
    if summary.mapping.qualifier_columns_unmapped > 0 {
        println!(
            "Unmapped qualifier columns: {} ({} type ids without a name)",
            summary.mapping.qualifier_columns_unmapped,
            summary.mapping.unmapped_type_ids.len()
        );
    }
    println!(
        "Stats rows: {} season, {} per-match",
        summary.season_rows, summary.match_rows
    );
    for path in &summary.artifacts {
        println!("  -> {}", path.display());
    }
    if !summary.flatten.errors.is_empty() {
        println!("Skipped matches ({}):", summary.flatten.errors.len());
        for err in summary.flatten.errors.iter().take(6) {
            println!("  - {err}");
        }
    }

    Ok(())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    parse_string_arg(flag).map(PathBuf::from)
}

fn parse_string_arg(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == flag)
}
