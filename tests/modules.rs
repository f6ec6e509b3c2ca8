mod common;

use common::*;
use stint::burndown::IssueBurndown;
use stint::errors::Error;
use stint::models::{ModuleCreate, ModuleStatus, ModuleUpdate};
use stint::service::{FavoriteService, ModuleService, project_fields};

fn service<'a>(db: &'a stint::db::Database, sink: &'a RecordingSink) -> ModuleService<'a> {
    ModuleService::new(db, sink, &IssueBurndown)
}

#[test]
fn create_requires_name() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let err = svc
        .create(WS, PROJECT, "alice", ModuleCreate::default())
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "name"));
}

#[test]
fn create_fails_for_missing_project() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let input = ModuleCreate {
        name: "Sprint 1".to_string(),
        ..Default::default()
    };
    let err = svc.create(WS, "no-such-project", "alice", input).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn create_returns_annotated_record() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let input = ModuleCreate {
        name: "Sprint 1".to_string(),
        status: Some(ModuleStatus::InProgress),
        ..Default::default()
    };
    let record = svc.create(WS, PROJECT, "alice", input).unwrap();
    assert_eq!(record.name, "Sprint 1");
    assert_eq!(record.status, ModuleStatus::InProgress);
    assert!(!record.is_favorite);
    assert_eq!(record.counts.total_issues, 0);
    assert_eq!(record.workspace_id, WS);
    assert_eq!(record.project_id, PROJECT);
}

#[test]
fn create_rejects_duplicate_external_pair() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let input = ModuleCreate {
        name: "Imported".to_string(),
        external_source: Some("jira".to_string()),
        external_id: Some("JIRA-7".to_string()),
        ..Default::default()
    };
    svc.create(WS, PROJECT, "alice", input.clone()).unwrap();

    let err = svc.create(WS, PROJECT, "alice", input).unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "external_id"));
}

#[test]
fn list_orders_favorites_first_then_newest() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);
    let viewer = add_user(&db, Some("Alice"), None, "alice");

    let oldest = add_module_at(&db, "oldest", ts(2024, 1, 1));
    let middle = add_module_at(&db, "middle", ts(2024, 1, 2));
    let newest = add_module_at(&db, "newest", ts(2024, 1, 3));

    FavoriteService::new(&db)
        .create(WS, PROJECT, &viewer, &middle)
        .unwrap();

    let first = svc.list(WS, PROJECT, &viewer).unwrap();
    let ids: Vec<&str> = first.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![middle.as_str(), newest.as_str(), oldest.as_str()]);
    assert!(first[0].is_favorite);
    assert!(!first[1].is_favorite);

    // Stable under repeated calls with no intervening writes.
    let second = svc.list(WS, PROJECT, &viewer).unwrap();
    let again: Vec<&str> = second.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, again);

    // Favorites are viewer-scoped: another viewer sees pure recency order.
    let other = svc.list(WS, PROJECT, "someone-else").unwrap();
    let other_ids: Vec<&str> = other.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(
        other_ids,
        vec![newest.as_str(), middle.as_str(), oldest.as_str()]
    );
}

#[test]
fn retrieve_is_tenant_scoped() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);
    let module = add_module(&db, "Sprint 1");

    assert!(svc.retrieve(WS, PROJECT, &module, "alice").is_ok());

    let err = svc
        .retrieve("other-workspace", PROJECT, &module, "alice")
        .unwrap_err();
    assert!(err.is_not_found());
    let err = svc.retrieve(WS, PROJECT, "missing", "alice").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn partial_update_touches_only_given_fields() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let input = ModuleCreate {
        name: "Sprint 1".to_string(),
        description: Some("original".to_string()),
        ..Default::default()
    };
    let created = svc.create(WS, PROJECT, "alice", input).unwrap();

    let changes = ModuleUpdate {
        name: Some("Sprint 1.1".to_string()),
        ..Default::default()
    };
    let updated = svc
        .partial_update(WS, PROJECT, &created.id, "alice", changes)
        .unwrap();
    assert_eq!(updated.name, "Sprint 1.1");
    assert_eq!(updated.description, "original");
}

#[test]
fn partial_update_accepts_reversed_dates() {
    // Date ordering is deliberately not validated; see DESIGN.md.
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);
    let module = add_module(&db, "Sprint 1");

    let changes = ModuleUpdate {
        start_date: Some("2024-02-01".parse().unwrap()),
        target_date: Some("2024-01-01".parse().unwrap()),
        ..Default::default()
    };
    let updated = svc
        .partial_update(WS, PROJECT, &module, "alice", changes)
        .unwrap();
    assert_eq!(updated.start_date.unwrap().to_string(), "2024-02-01");
    assert_eq!(updated.target_date.unwrap().to_string(), "2024-01-01");
}

#[test]
fn partial_update_missing_module_not_found() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let err = svc
        .partial_update(WS, PROJECT, "missing", "alice", ModuleUpdate::default())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn destroy_cascades_links_and_emits_per_issue() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let module = add_module(&db, "Doomed sprint");
    let issues = vec![
        add_issue(&db, "a", None),
        add_issue(&db, "b", None),
        add_issue(&db, "c", None),
    ];
    db.attach_issues(&module, WS, PROJECT, &issues).unwrap();

    svc.destroy(WS, PROJECT, &module, "alice").unwrap();

    assert!(db.get_module(WS, PROJECT, &module).unwrap().is_none());
    assert!(db.module_issue_ids(&module).unwrap().is_empty());
    // Issues themselves survive the cascade.
    for id in &issues {
        assert!(db.get_issue(id).unwrap().is_some());
    }

    let events = sink.events();
    assert_eq!(events.len(), 3);
    for event in &events {
        assert_eq!(event.event_type, "module.activity.deleted");
        assert_eq!(event.module_id, module);
        assert_eq!(event.actor_id, "alice");
        let snapshot = event.current_instance.as_ref().unwrap();
        assert_eq!(snapshot["module_name"], "Doomed sprint");
    }
    let mut seen: Vec<&str> = events.iter().map(|e| e.issue_id.as_str()).collect();
    seen.sort();
    let mut expected: Vec<&str> = issues.iter().map(String::as_str).collect();
    expected.sort();
    assert_eq!(seen, expected);
}

#[test]
fn destroy_succeeds_when_sink_fails() {
    let (_dir, db) = setup();
    let sink = FailingSink;
    let svc = ModuleService::new(&db, &sink, &IssueBurndown);

    let module = add_module(&db, "Sprint 1");
    let issue = add_issue(&db, "a", None);
    db.attach_issues(&module, WS, PROJECT, &[issue]).unwrap();

    svc.destroy(WS, PROJECT, &module, "alice").unwrap();
    assert!(db.get_module(WS, PROJECT, &module).unwrap().is_none());
}

#[test]
fn corrupt_stored_timestamp_is_a_storage_error() {
    let (dir, db) = setup();
    let module = add_module(&db, "Sprint 1");

    let raw = rusqlite::Connection::open(db_path(&dir)).unwrap();
    raw.execute(
        "UPDATE modules SET created_at = 'not-a-timestamp' WHERE id = ?1",
        rusqlite::params![module],
    )
    .unwrap();

    let err = db.annotated_modules(WS, PROJECT, "alice").unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}

#[test]
fn field_projection_filters_the_fixed_shape() {
    let (_dir, db) = setup();
    let sink = RecordingSink::new();
    let svc = service(&db, &sink);

    let input = ModuleCreate {
        name: "Sprint 1".to_string(),
        ..Default::default()
    };
    let record = svc.create(WS, PROJECT, "alice", input).unwrap();

    let projected = project_fields(&record, &["id", "name", "total_issues"]).unwrap();
    let obj = projected.as_object().unwrap();
    assert_eq!(obj.len(), 3);
    assert_eq!(obj["name"], "Sprint 1");
    assert_eq!(obj["total_issues"], 0);

    let err = project_fields(&record, &["no_such_field"]).unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "fields"));
}
