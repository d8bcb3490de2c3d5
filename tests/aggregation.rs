use serde_json::{Value, json};

use opta_pipeline::code_mapper::apply_names;
use opta_pipeline::event_flattener::{EventTable, flatten_matches};
use opta_pipeline::match_loader::{Contestant, MatchDocument};
use opta_pipeline::schema::CodeMappings;
use opta_pipeline::stats_aggregator::{aggregate_per_match, aggregate_season};

fn mappings() -> CodeMappings {
    let mut m = CodeMappings::default();
    for (id, name) in [
        (1, "Pass"),
        (7, "Tackle"),
        (8, "Interception"),
        (13, "Miss"),
        (14, "Post"),
        (15, "Attempt Saved"),
        (16, "Goal"),
        (17, "Yellow Card"),
    ] {
        m.event_types.insert(id, name.to_string());
    }
    for (code, name) in [(56, "Zone"), (210, "Assist"), (212, "Length"), (236, "keyPass")] {
        m.qualifiers.insert(code, name.to_string());
    }
    m
}

fn doc(id: &str, events: Vec<Value>) -> MatchDocument {
    MatchDocument {
        source_file: format!("{id}.json"),
        id: id.to_string(),
        stage: "Regular Season".to_string(),
        contestants: vec![
            Contestant {
                id: "t_im".to_string(),
                name: "Inter Miami".to_string(),
            },
            Contestant {
                id: "t_oc".to_string(),
                name: "Orlando City".to_string(),
            },
        ],
        events,
    }
}

fn stamp(minute: i64) -> String {
    format!("2024-06-01T{:02}:{:02}:00.000Z", 19 + minute / 60, minute % 60)
}

fn event(type_id: u32, player: &str, minute: i64) -> Value {
    json!({
        "typeId": type_id,
        "timeMin": minute,
        "timeSec": 0,
        "contestantId": "t_im",
        "playerName": player,
        "timeStamp": stamp(minute)
    })
}

fn pass(player: &str, minute: i64, outcome: i64) -> Value {
    json!({
        "typeId": 1,
        "timeMin": minute,
        "timeSec": 0,
        "contestantId": "t_im",
        "playerName": player,
        "outcome": outcome,
        "timeStamp": stamp(minute)
    })
}

fn build_table(docs: &[MatchDocument]) -> EventTable {
    let mappings = mappings();
    let (mut table, _) = flatten_matches(docs, &mappings).expect("events should flatten");
    apply_names(&mut table, &mappings).expect("names should apply");
    table
}

#[test]
fn pass_completion_rate_is_four_of_five() {
    let docs = vec![
        doc(
            "m1",
            vec![
                pass("L. Messi", 3, 1),
                pass("L. Messi", 10, 1),
                pass("L. Messi", 22, 0),
            ],
        ),
        doc("m2", vec![pass("L. Messi", 5, 1), pass("L. Messi", 8, 1)]),
    ];
    let table = build_table(&docs);
    let stats = aggregate_season(&table, Some("Inter Miami"));

    assert_eq!(stats.len(), 1);
    let messi = &stats[0];
    assert_eq!(messi.player_name, "L. Messi");
    assert_eq!(messi.matches_played, 2);
    assert_eq!(messi.passes_attempted, 5);
    assert_eq!(messi.passes_completed, 4);
    assert_eq!(messi.pass_completion_rate, 0.8);
}

#[test]
fn player_without_shots_has_zero_rates() {
    let docs = vec![doc("m1", vec![pass("S. Busquets", 3, 1)])];
    let table = build_table(&docs);
    let stats = aggregate_season(&table, Some("Inter Miami"));

    let busquets = &stats[0];
    assert_eq!(busquets.goals, 0);
    assert_eq!(busquets.shots_total, 0);
    assert_eq!(busquets.shots_on_target, 0);
    assert_eq!(busquets.shot_conversion_rate, 0.0);
    assert_eq!(busquets.shots_on_target_rate, 0.0);
}

#[test]
fn shot_battery_counts_and_stays_in_bounds() {
    let docs = vec![doc(
        "m1",
        vec![
            event(16, "L. Messi", 10),
            event(16, "L. Messi", 25),
            event(15, "L. Messi", 40),
            event(13, "L. Messi", 55),
            event(14, "L. Messi", 70),
            event(7, "L. Messi", 72),
            event(8, "L. Messi", 80),
            event(17, "L. Messi", 89),
        ],
    )];
    let table = build_table(&docs);
    let stats = aggregate_season(&table, Some("Inter Miami"));
    let messi = &stats[0];

    assert_eq!(messi.goals, 2);
    assert_eq!(messi.shots_total, 5);
    assert_eq!(messi.shots_on_target, 3);
    assert!(messi.shots_on_target <= messi.shots_total);
    assert_eq!(messi.shot_conversion_rate, 0.4);
    assert_eq!(messi.shots_on_target_rate, 0.6);
    assert!(messi.shot_conversion_rate >= 0.0 && messi.shot_conversion_rate <= 1.0);
    assert_eq!(messi.defensive_actions, 2);
    assert_eq!(messi.yellow_cards, 1);
    assert_eq!(messi.red_cards, 0);
}

#[test]
fn assists_need_the_scoring_qualifier_value() {
    let docs = vec![doc(
        "m1",
        vec![
            json!({
                "typeId": 1, "timeMin": 5, "contestantId": "t_im",
                "playerName": "L. Messi", "outcome": 1, "timeStamp": stamp(5),
                "qualifier": [
                    { "qualifierId": 210, "value": "16" },
                    { "qualifierId": 236, "value": "1" },
                    { "qualifierId": 212, "value": "30" }
                ]
            }),
            json!({
                "typeId": 1, "timeMin": 9, "contestantId": "t_im",
                "playerName": "L. Messi", "outcome": 1, "timeStamp": stamp(9),
                "qualifier": [
                    { "qualifierId": 210, "value": "15" },
                    { "qualifierId": 236, "value": "1" },
                    { "qualifierId": 212, "value": "10" }
                ]
            }),
        ],
    )];
    let table = build_table(&docs);
    let stats = aggregate_season(&table, Some("Inter Miami"));
    let messi = &stats[0];

    assert_eq!(messi.assists, 1);
    assert_eq!(messi.key_passes, 2);
    assert_eq!(messi.avg_pass_distance, 20.0);
}

#[test]
fn per_match_rows_keep_their_own_minute_bounds() {
    let docs = vec![
        doc(
            "m1",
            vec![pass("L. Messi", 12, 1), pass("L. Messi", 88, 1)],
        ),
        doc("m2", vec![pass("L. Messi", 5, 1), pass("L. Messi", 9, 0)]),
    ];
    let table = build_table(&docs);

    let per_match = aggregate_per_match(&table, Some("Inter Miami"));
    assert_eq!(per_match.len(), 2);
    assert_eq!(per_match[0].match_id, "m1");
    assert_eq!(per_match[0].matches_played, 1);
    assert_eq!(per_match[0].min_minute, 12);
    assert_eq!(per_match[0].max_minute, 88);
    assert_eq!(per_match[0].minutes_played_approx, 76);
    assert_eq!(per_match[1].match_id, "m2");
    assert_eq!(per_match[1].min_minute, 5);
    assert_eq!(per_match[1].max_minute, 9);

    let season = aggregate_season(&table, Some("Inter Miami"));
    assert_eq!(season[0].minutes_played_approx, 83);
}

#[test]
fn scope_restricts_to_named_players_on_the_team() {
    let opponent_pass = json!({
        "typeId": 1, "timeMin": 20, "contestantId": "t_oc",
        "playerName": "F. Torres", "outcome": 1, "timeStamp": stamp(20)
    });
    let anonymous = json!({
        "typeId": 1, "timeMin": 30, "contestantId": "t_im",
        "outcome": 1, "timeStamp": stamp(30)
    });
    let docs = vec![doc(
        "m1",
        vec![pass("L. Messi", 3, 1), opponent_pass, anonymous],
    )];
    let table = build_table(&docs);

    let restricted = aggregate_season(&table, Some("Inter Miami"));
    assert_eq!(restricted.len(), 1);
    assert_eq!(restricted[0].player_name, "L. Messi");

    let unrestricted = aggregate_season(&table, None);
    let names: Vec<&str> = unrestricted.iter().map(|s| s.player_name.as_str()).collect();
    assert_eq!(names, vec!["F. Torres", "L. Messi"]);
    assert_eq!(
        unrestricted
            .iter()
            .find(|s| s.player_name == "F. Torres")
            .map(|s| s.team.as_str()),
        Some("Orlando City")
    );
}
