use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const MODULE_CREATED: &str = "module.activity.created";
pub const MODULE_DELETED: &str = "module.activity.deleted";

/// Structured record handed to the activity sink.
///
/// `current_instance` carries a snapshot of state that is gone after the
/// triggering mutation (e.g. the module name at deletion time).
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEvent {
    pub event_type: String,
    pub module_id: String,
    pub actor_id: String,
    pub issue_id: String,
    pub project_id: String,
    pub requested_data: Value,
    pub current_instance: Option<Value>,
    pub epoch: i64,
    pub notification: bool,
    pub origin: Option<String>,
}

impl ActivityEvent {
    pub fn module_created(module_id: &str, issue_id: &str, project_id: &str, actor_id: &str) -> Self {
        ActivityEvent {
            event_type: MODULE_CREATED.to_string(),
            module_id: module_id.to_string(),
            actor_id: actor_id.to_string(),
            issue_id: issue_id.to_string(),
            project_id: project_id.to_string(),
            requested_data: json!({ "module_id": module_id }),
            current_instance: None,
            epoch: Utc::now().timestamp(),
            notification: true,
            origin: None,
        }
    }

    pub fn module_deleted(
        module_id: &str,
        issue_id: &str,
        project_id: &str,
        actor_id: &str,
        module_name: &str,
    ) -> Self {
        ActivityEvent {
            event_type: MODULE_DELETED.to_string(),
            module_id: module_id.to_string(),
            actor_id: actor_id.to_string(),
            issue_id: issue_id.to_string(),
            project_id: project_id.to_string(),
            requested_data: json!({ "module_id": module_id }),
            current_instance: Some(json!({ "module_name": module_name })),
            epoch: Utc::now().timestamp(),
            notification: true,
            origin: None,
        }
    }
}

/// Downstream consumer of activity events. The core emits and never reads
/// back; retry policy, if any, belongs to the implementation.
pub trait ActivitySink {
    fn dispatch(
        &self,
        event: ActivityEvent,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Fire-and-forget emission: a failing sink is logged and never fails the
/// primary operation.
pub fn emit(sink: &dyn ActivitySink, event: ActivityEvent) {
    let event_type = event.event_type.clone();
    if let Err(e) = sink.dispatch(event) {
        warn!("activity sink dropped {event_type}: {e}");
    }
}

/// Default sink: logs each event instead of forwarding it anywhere.
pub struct TracingSink;

impl ActivitySink for TracingSink {
    fn dispatch(
        &self,
        event: ActivityEvent,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        debug!(
            "activity {} module={} issue={} actor={}",
            event.event_type, event.module_id, event.issue_id, event.actor_id
        );
        Ok(())
    }
}
