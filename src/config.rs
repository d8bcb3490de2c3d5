use std::env;
use std::path::PathBuf;

pub const DEFAULT_TARGET_TEAM: &str = "Inter Miami";
pub const DEFAULT_TARGET_STAGE: &str = "Regular Season";
pub const DEFAULT_DATASET_TAG: &str = "mls24";

/// Input/output locations and scoping for a pipeline run. Everything resolves
/// from `APP_*` environment variables with conventional defaults under a
/// single data directory.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub events_dir: PathBuf,
    pub mappings_dir: PathBuf,
    pub season_stats_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Team scope for match loading and aggregation. None loads every match
    /// and aggregates players from all teams.
    pub team: Option<String>,
    /// Stage filter applied by the cleaner. None keeps all stages.
    pub target_stage: Option<String>,
    /// Suffix baked into artifact file names, e.g. `players_stats_mls24.csv`.
    pub dataset_tag: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir(PathBuf::from("data"))
    }
}

impl PipelineConfig {
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            events_dir: data_dir.join("pre_raw").join("jsons"),
            mappings_dir: data_dir.join("pre_raw"),
            season_stats_dir: data_dir.join("pre_raw").join("jsons_season_stats"),
            out_dir: data_dir.join("processed"),
            team: Some(DEFAULT_TARGET_TEAM.to_string()),
            target_stage: Some(DEFAULT_TARGET_STAGE.to_string()),
            dataset_tag: DEFAULT_DATASET_TAG.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let data_dir = env_path("APP_DATA_DIR").unwrap_or_else(|| PathBuf::from("data"));
        let mut cfg = Self::with_data_dir(data_dir);
        if let Some(dir) = env_path("APP_EVENTS_DIR") {
            cfg.events_dir = dir;
        }
        if let Some(dir) = env_path("APP_MAPPINGS_DIR") {
            cfg.mappings_dir = dir;
        }
        if let Some(dir) = env_path("APP_SEASON_STATS_DIR") {
            cfg.season_stats_dir = dir;
        }
        if let Some(dir) = env_path("APP_OUT_DIR") {
            cfg.out_dir = dir;
        }
        // An explicitly empty value disables the scope; unset keeps the default.
        if let Ok(raw) = env::var("APP_TARGET_TEAM") {
            cfg.team = non_empty(raw);
        }
        if let Ok(raw) = env::var("APP_TARGET_STAGE") {
            cfg.target_stage = non_empty(raw);
        }
        if let Some(tag) = env::var("APP_DATASET_TAG").ok().and_then(non_empty) {
            cfg.dataset_tag = tag;
        }
        cfg
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

/// File-logging policy. `dir: None` means console only.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: Option<PathBuf>,
    pub rotation: LogRotation,
    pub keep_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: None,
            rotation: LogRotation::Daily,
            keep_files: 7,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let dir = env_path("APP_LOG_DIR");
        let rotation = env::var("APP_LOG_ROTATION")
            .ok()
            .and_then(|raw| parse_rotation(&raw))
            .unwrap_or(LogRotation::Daily);
        let keep_files = env::var("APP_LOG_KEEP")
            .ok()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(7)
            .max(1);
        Self {
            dir,
            rotation,
            keep_files,
        }
    }
}

pub fn parse_rotation(raw: &str) -> Option<LogRotation> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "daily" => Some(LogRotation::Daily),
        "hourly" => Some(LogRotation::Hourly),
        "never" => Some(LogRotation::Never),
        _ => None,
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key).ok().and_then(non_empty).map(PathBuf::from)
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_parses_known_values() {
        assert_eq!(parse_rotation("daily"), Some(LogRotation::Daily));
        assert_eq!(parse_rotation(" Hourly "), Some(LogRotation::Hourly));
        assert_eq!(parse_rotation("never"), Some(LogRotation::Never));
        assert_eq!(parse_rotation("weekly"), None);
    }

    #[test]
    fn default_paths_hang_off_data_dir() {
        let cfg = PipelineConfig::with_data_dir(PathBuf::from("/tmp/d"));
        assert_eq!(cfg.events_dir, PathBuf::from("/tmp/d/pre_raw/jsons"));
        assert_eq!(cfg.mappings_dir, PathBuf::from("/tmp/d/pre_raw"));
        assert_eq!(cfg.out_dir, PathBuf::from("/tmp/d/processed"));
        assert_eq!(cfg.team.as_deref(), Some(DEFAULT_TARGET_TEAM));
    }
}
