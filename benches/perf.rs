use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

use opta_pipeline::code_mapper::apply_names;
use opta_pipeline::data_cleaner::clean;
use opta_pipeline::event_flattener::{EventTable, flatten_matches};
use opta_pipeline::match_loader::{Contestant, MatchDocument, parse_match_document};
use opta_pipeline::schema::CodeMappings;
use opta_pipeline::stats_aggregator::aggregate_season;

fn mappings() -> CodeMappings {
    let mut m = CodeMappings::default();
    for (code, name) in [(1, "Pass"), (7, "Tackle"), (16, "Goal"), (43, "Deleted event")] {
        m.event_types.insert(code, name.to_string());
    }
    for (code, name) in [
        (56, "Zone"),
        (130, "Long ball"),
        (210, "Assist"),
        (212, "Length"),
        (236, "keyPass"),
    ] {
        m.qualifiers.insert(code, name.to_string());
    }
    m
}

fn synthetic_event(seq: usize, minute: i64) -> Value {
    let type_id = match seq % 25 {
        0 => 16,
        1 => 7,
        2 => 43,
        _ => 1,
    };
    let player = seq % 22;
    json!({
        "id": seq as i64 + 1,
        "eventId": seq as i64 + 1,
        "typeId": type_id,
        "periodId": if minute < 45 { 1 } else { 2 },
        "timeMin": minute,
        "timeSec": (seq * 7 % 60) as i64,
        "contestantId": if player < 11 { "t1" } else { "t2" },
        "playerId": format!("p{player}"),
        "playerName": format!("Player {player}"),
        "outcome": if seq % 5 == 0 { 0 } else { 1 },
        "x": (seq % 100) as f64,
        "y": (seq % 60) as f64,
        "timeStamp": format!(
            "2024-03-01T{:02}:{:02}:{:02}Z",
            18 + minute / 60,
            minute % 60,
            seq % 60
        ),
        "qualifier": [
            { "qualifierId": 56, "value": if seq % 3 == 0 { "Center" } else { "Left" } },
            { "qualifierId": 212, "value": format!("{}.5", seq % 40) }
        ]
    })
}

fn synthetic_docs(matches: usize, events_per_match: usize) -> Vec<MatchDocument> {
    (0..matches)
        .map(|m| MatchDocument {
            source_file: format!("match_{m:04}.json"),
            id: format!("m{m:04}"),
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
            events: (0..events_per_match)
                .map(|e| {
                    synthetic_event(
                        m * events_per_match + e,
                        (e * 90 / events_per_match) as i64,
                    )
                })
                .collect(),
        })
        .collect()
}

fn named_table(matches: usize, events_per_match: usize) -> EventTable {
    let docs = synthetic_docs(matches, events_per_match);
    let mappings = mappings();
    let (mut table, _) = flatten_matches(&docs, &mappings).expect("synthetic matches flatten");
    apply_names(&mut table, &mappings).expect("synthetic names apply");
    table
}

fn bench_match_parse(c: &mut Criterion) {
    c.bench_function("match_parse", |b| {
        b.iter(|| {
            let value: Value = serde_json::from_str(black_box(MATCH_JSON)).unwrap();
            let doc = parse_match_document("match_inter_orlando.json", &value).unwrap();
            black_box(doc.events.len());
        })
    });
}

fn bench_flatten(c: &mut Criterion) {
    let docs = synthetic_docs(100, 120);
    let mappings = mappings();
    c.bench_function("flatten_100_matches", |b| {
        b.iter(|| {
            let (table, summary) =
                flatten_matches(black_box(&docs), black_box(&mappings)).unwrap();
            black_box((table.len(), summary.events_flattened));
        })
    });
}

fn bench_clean(c: &mut Criterion) {
    let table = named_table(100, 120);
    c.bench_function("clean_12k_rows", |b| {
        b.iter(|| {
            let mut work = table.clone();
            let report = clean(&mut work, Some("Regular Season"));
            black_box(report.rows_remaining);
        })
    });
}

fn bench_aggregate_season(c: &mut Criterion) {
    let mut table = named_table(100, 120);
    clean(&mut table, Some("Regular Season"));
    c.bench_function("aggregate_season_12k_rows", |b| {
        b.iter(|| {
            let rows = aggregate_season(black_box(&table), Some("Inter Miami"));
            black_box(rows.len());
        })
    });
}

criterion_group!(
    perf,
    bench_match_parse,
    bench_flatten,
    bench_clean,
    bench_aggregate_season
);
criterion_main!(perf);

static MATCH_JSON: &str = include_str!("../tests/fixtures/match_inter_orlando.json");
