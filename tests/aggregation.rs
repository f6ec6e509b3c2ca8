mod common;

use common::*;
use stint::models::StateGroup;

#[test]
fn total_counts_only_active_non_draft_issues() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Sprint 1");

    let active = add_issue(&db, "active", None);
    let archived = add_issue(&db, "archived", None);
    let draft = add_draft_issue(&db, "draft");
    db.archive_issue(&archived, chrono::Utc::now()).unwrap();

    db.attach_issues(
        &module,
        WS,
        PROJECT,
        &[active.clone(), archived, draft],
    )
    .unwrap();

    let counts = db.module_counts(&module).unwrap();
    assert_eq!(counts.total_issues, 1);
}

#[test]
fn group_counts_skip_unmapped_states() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Sprint 1");

    let done = add_state(&db, "Done", Some(StateGroup::Completed));
    let doing = add_state(&db, "Doing", Some(StateGroup::Started));
    let triage = add_state(&db, "Triage", None); // no group mapping

    let issues = vec![
        add_issue(&db, "a", Some(&done)),
        add_issue(&db, "b", Some(&done)),
        add_issue(&db, "c", Some(&doing)),
        add_issue(&db, "d", Some(&triage)),
        add_issue(&db, "e", None),
    ];
    db.attach_issues(&module, WS, PROJECT, &issues).unwrap();

    let counts = db.module_counts(&module).unwrap();
    assert_eq!(counts.total_issues, 5);
    assert_eq!(counts.completed_issues, 2);
    assert_eq!(counts.started_issues, 1);
    assert_eq!(counts.unstarted_issues, 0);
    assert_eq!(counts.backlog_issues, 0);
    assert_eq!(counts.cancelled_issues, 0);

    // Unmapped states keep the group counts below the total.
    let group_sum = counts.completed_issues
        + counts.cancelled_issues
        + counts.started_issues
        + counts.unstarted_issues
        + counts.backlog_issues;
    assert!(group_sum < counts.total_issues);
    for c in [
        counts.completed_issues,
        counts.cancelled_issues,
        counts.started_issues,
        counts.unstarted_issues,
        counts.backlog_issues,
    ] {
        assert!(c <= counts.total_issues);
    }
}

#[test]
fn counts_are_zero_for_module_without_issues() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Empty");
    let counts = db.module_counts(&module).unwrap();
    assert_eq!(counts.total_issues, 0);
    assert_eq!(counts.completed_issues, 0);
}

#[test]
fn member_ids_are_deduplicated_and_issue_independent() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Sprint 1");
    let alice = add_user(&db, Some("Alice"), None, "alice");
    let bob = add_user(&db, Some("Bob"), None, "bob");

    db.set_module_members(&module, &[alice.clone(), bob.clone(), alice.clone()])
        .unwrap();

    let record = db
        .annotated_module(WS, PROJECT, &module, "viewer")
        .unwrap()
        .unwrap();
    assert_eq!(record.member_ids.len(), 2);
    assert!(record.member_ids.contains(&alice));
    assert!(record.member_ids.contains(&bob));
    // No issues involved at all.
    assert_eq!(record.counts.total_issues, 0);
}

#[test]
fn assignee_distribution_counts_and_null_ordering() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Sprint 1");

    let anon = add_user(&db, None, None, "mystery");
    let alice = add_user(&db, Some("Alice"), Some("Ada"), "alice");
    let bob = add_user(&db, Some("Bob"), Some("Byte"), "bob");

    let shared = add_issue(&db, "shared", None);
    let solo = add_issue(&db, "solo", None);
    let unassigned = add_issue(&db, "unassigned", None);
    db.assign_issue(&shared, &alice).unwrap();
    db.assign_issue(&shared, &bob).unwrap();
    db.assign_issue(&solo, &alice).unwrap();
    db.assign_issue(&unassigned, &anon).unwrap();
    db.complete_issue(&solo, chrono::Utc::now()).unwrap();

    let no_assignee = add_issue(&db, "floating", None);
    db.attach_issues(
        &module,
        WS,
        PROJECT,
        &[shared, solo, unassigned, no_assignee],
    )
    .unwrap();

    let rows = db.assignee_distribution(WS, PROJECT, &module).unwrap();
    assert_eq!(rows.len(), 4);

    // Null first name sorts before named assignees; the completely
    // unassigned bucket has no user row at all and also sorts first.
    assert!(rows[0].first_name.is_none());
    assert!(rows[1].first_name.is_none());
    let named: Vec<_> = rows
        .iter()
        .filter_map(|r| r.first_name.as_deref())
        .collect();
    assert_eq!(named, vec!["Alice", "Bob"]);

    let alice_row = rows
        .iter()
        .find(|r| r.assignee_id.as_deref() == Some(alice.as_str()))
        .unwrap();
    assert_eq!(alice_row.total_issues, 2);
    assert_eq!(alice_row.completed_issues, 1);
    assert_eq!(alice_row.pending_issues, 1);

    let unassigned_row = rows.iter().find(|r| r.assignee_id.is_none()).unwrap();
    assert_eq!(unassigned_row.total_issues, 1);
}

#[test]
fn label_distribution_ordered_by_name() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Sprint 1");

    let zeta = add_label(&db, "zeta");
    let alpha = add_label(&db, "alpha");

    let a = add_issue(&db, "a", None);
    let b = add_issue(&db, "b", None);
    let plain = add_issue(&db, "plain", None);
    db.label_issue(&a, &zeta).unwrap();
    db.label_issue(&b, &alpha).unwrap();
    db.label_issue(&a, &alpha).unwrap();
    db.complete_issue(&a, chrono::Utc::now()).unwrap();

    db.attach_issues(&module, WS, PROJECT, &[a, b, plain]).unwrap();

    let rows = db.label_distribution(WS, PROJECT, &module).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows[0].label_name.is_none()); // unlabelled bucket first
    assert_eq!(rows[1].label_name.as_deref(), Some("alpha"));
    assert_eq!(rows[2].label_name.as_deref(), Some("zeta"));

    let alpha_row = &rows[1];
    assert_eq!(alpha_row.total_issues, 2);
    assert_eq!(alpha_row.completed_issues, 1);
    assert_eq!(alpha_row.pending_issues, 1);
}

#[test]
fn distributions_ignore_archived_and_draft_in_counts() {
    let (_dir, db) = setup();
    let module = add_module(&db, "Sprint 1");
    let alice = add_user(&db, Some("Alice"), None, "alice");

    let live = add_issue(&db, "live", None);
    let archived = add_issue(&db, "archived", None);
    db.assign_issue(&live, &alice).unwrap();
    db.assign_issue(&archived, &alice).unwrap();
    db.archive_issue(&archived, chrono::Utc::now()).unwrap();

    db.attach_issues(&module, WS, PROJECT, &[live, archived]).unwrap();

    let rows = db.assignee_distribution(WS, PROJECT, &module).unwrap();
    let alice_row = rows
        .iter()
        .find(|r| r.assignee_id.as_deref() == Some(alice.as_str()))
        .unwrap();
    assert_eq!(alice_row.total_issues, 1);
    assert_eq!(alice_row.pending_issues, 1);
}
