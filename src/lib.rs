//! Opta soccer data processing: raw match-event and season-stats JSON in,
//! tidy CSV tables out. The two entry points are
//! [`pipeline::run_events_pipeline`] and
//! [`pipeline::run_season_totals_pipeline`].

pub mod code_mapper;
pub mod config;
pub mod data_cleaner;
pub mod error;
pub mod event_flattener;
pub mod export;
pub mod feature_engineering;
pub mod logging;
pub mod match_loader;
pub mod pipeline;
pub mod schema;
pub mod season_totals;
pub mod stats_aggregator;
pub mod value_util;
