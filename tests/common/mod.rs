#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use stint::db::{Database, new_id};
use stint::events::{ActivityEvent, ActivitySink};
use stint::models::{Issue, Label, Module, ModuleStatus, Project, State, StateGroup, User};

pub const WS: &str = "acme";
pub const PROJECT: &str = "proj-1";

/// Fresh migrated database in a temp dir with the default project seeded.
/// The TempDir must stay alive for the duration of the test.
pub fn setup() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(&db_path(&dir)).expect("open");
    db.migrate().expect("migrate");
    db.insert_project(&Project {
        id: PROJECT.to_string(),
        workspace_id: WS.to_string(),
        name: "Test project".to_string(),
    })
    .expect("project");
    (dir, db)
}

pub fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("stint.db")
}

pub fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn add_user(db: &Database, first: Option<&str>, last: Option<&str>, display: &str) -> String {
    let user = User {
        id: new_id(),
        first_name: first.map(str::to_string),
        last_name: last.map(str::to_string),
        display_name: display.to_string(),
        avatar: None,
    };
    db.insert_user(&user).expect("user");
    user.id
}

pub fn add_state(db: &Database, name: &str, group: Option<StateGroup>) -> String {
    let state = State {
        id: new_id(),
        project_id: PROJECT.to_string(),
        name: name.to_string(),
        group,
    };
    db.insert_state(&state).expect("state");
    state.id
}

pub fn add_label(db: &Database, name: &str) -> String {
    let label = Label {
        id: new_id(),
        project_id: PROJECT.to_string(),
        name: name.to_string(),
        color: None,
    };
    db.insert_label(&label).expect("label");
    label.id
}

pub fn add_issue(db: &Database, name: &str, state_id: Option<&str>) -> String {
    let now = Utc::now();
    let issue = Issue {
        id: new_id(),
        workspace_id: WS.to_string(),
        project_id: PROJECT.to_string(),
        name: name.to_string(),
        state_id: state_id.map(str::to_string),
        parent_id: None,
        completed_at: None,
        archived_at: None,
        is_draft: false,
        created_at: now,
        updated_at: now,
    };
    db.insert_issue(&issue).expect("issue");
    issue.id
}

pub fn add_draft_issue(db: &Database, name: &str) -> String {
    let now = Utc::now();
    let issue = Issue {
        id: new_id(),
        workspace_id: WS.to_string(),
        project_id: PROJECT.to_string(),
        name: name.to_string(),
        state_id: None,
        parent_id: None,
        completed_at: None,
        archived_at: None,
        is_draft: true,
        created_at: now,
        updated_at: now,
    };
    db.insert_issue(&issue).expect("issue");
    issue.id
}

/// Insert a module directly with an explicit creation timestamp, bypassing
/// the service, so ordering tests control recency.
pub fn add_module_at(db: &Database, name: &str, created_at: DateTime<Utc>) -> String {
    let module = Module {
        id: new_id(),
        workspace_id: WS.to_string(),
        project_id: PROJECT.to_string(),
        name: name.to_string(),
        description: String::new(),
        description_text: None,
        description_html: None,
        start_date: None,
        target_date: None,
        status: ModuleStatus::Planned,
        lead_id: None,
        view_props: serde_json::json!({}),
        sort_order: 65535.0,
        external_source: None,
        external_id: None,
        created_at,
        updated_at: created_at,
    };
    db.insert_module(&module).expect("module");
    module.id
}

pub fn add_module(db: &Database, name: &str) -> String {
    add_module_at(db, name, Utc::now())
}

/// Sink that records every dispatched event for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ActivityEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ActivitySink for RecordingSink {
    fn dispatch(
        &self,
        event: ActivityEvent,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Sink whose dispatch always fails; operations must still succeed.
pub struct FailingSink;

impl ActivitySink for FailingSink {
    fn dispatch(
        &self,
        _event: ActivityEvent,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("sink is down".into())
    }
}
