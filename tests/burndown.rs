mod common;

use chrono::NaiveDate;
use common::*;
use stint::burndown::IssueBurndown;
use stint::models::{ModuleCreate, ModuleUpdate};
use stint::service::ModuleService;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn chart_is_empty_when_either_date_is_missing() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = ModuleService::new(&db, &sink, &IssueBurndown);

    let input = ModuleCreate {
        name: "No dates".to_string(),
        start_date: Some(date("2024-01-01")),
        ..Default::default()
    };
    let record = svc.create(WS, PROJECT, "alice", input).unwrap();

    let detail = svc.retrieve(WS, PROJECT, &record.id, "alice").unwrap();
    assert!(detail.distribution.completion_chart.is_empty());
}

#[test]
fn chart_is_zero_series_for_dated_module_without_issues() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = ModuleService::new(&db, &sink, &IssueBurndown);

    let input = ModuleCreate {
        name: "January".to_string(),
        start_date: Some(date("2024-01-01")),
        target_date: Some(date("2024-01-31")),
        ..Default::default()
    };
    let record = svc.create(WS, PROJECT, "alice", input).unwrap();

    let detail = svc.retrieve(WS, PROJECT, &record.id, "alice").unwrap();
    let chart = &detail.distribution.completion_chart;
    assert_eq!(chart.len(), 31);
    assert!(chart.values().all(|&remaining| remaining == 0));
    assert_eq!(*chart.keys().next().unwrap(), date("2024-01-01"));
    assert_eq!(*chart.keys().last().unwrap(), date("2024-01-31"));
}

#[test]
fn chart_tracks_remaining_issue_counts() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = ModuleService::new(&db, &sink, &IssueBurndown);

    let module = add_module(&db, "Week");
    let changes = ModuleUpdate {
        start_date: Some(date("2024-01-01")),
        target_date: Some(date("2024-01-05")),
        ..Default::default()
    };
    svc.partial_update(WS, PROJECT, &module, "alice", changes)
        .unwrap();

    let a = add_issue(&db, "a", None);
    let b = add_issue(&db, "b", None);
    let c = add_issue(&db, "c", None);
    db.attach_issues(&module, WS, PROJECT, &[a.clone(), b.clone(), c])
        .unwrap();

    db.complete_issue(&a, ts(2024, 1, 2)).unwrap();
    db.complete_issue(&b, ts(2024, 1, 4)).unwrap();

    let detail = svc.retrieve(WS, PROJECT, &module, "alice").unwrap();
    let chart = &detail.distribution.completion_chart;
    assert_eq!(chart[&date("2024-01-01")], 3);
    assert_eq!(chart[&date("2024-01-02")], 2);
    assert_eq!(chart[&date("2024-01-03")], 2);
    assert_eq!(chart[&date("2024-01-04")], 1);
    assert_eq!(chart[&date("2024-01-05")], 1);
}

#[test]
fn completions_before_the_window_reduce_day_one() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = ModuleService::new(&db, &sink, &IssueBurndown);

    let module = add_module(&db, "Late window");
    let changes = ModuleUpdate {
        start_date: Some(date("2024-02-01")),
        target_date: Some(date("2024-02-03")),
        ..Default::default()
    };
    svc.partial_update(WS, PROJECT, &module, "alice", changes)
        .unwrap();

    let early = add_issue(&db, "early", None);
    let open = add_issue(&db, "open", None);
    db.attach_issues(&module, WS, PROJECT, &[early.clone(), open])
        .unwrap();
    db.complete_issue(&early, ts(2024, 1, 15)).unwrap();

    let detail = svc.retrieve(WS, PROJECT, &module, "alice").unwrap();
    let chart = &detail.distribution.completion_chart;
    assert_eq!(chart[&date("2024-02-01")], 1);
    assert_eq!(chart[&date("2024-02-03")], 1);
}
