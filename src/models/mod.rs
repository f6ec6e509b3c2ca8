use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle status of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleStatus {
    Backlog,
    Planned,
    InProgress,
    Paused,
    Completed,
    Cancelled,
}

impl ModuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleStatus::Backlog => "backlog",
            ModuleStatus::Planned => "planned",
            ModuleStatus::InProgress => "in-progress",
            ModuleStatus::Paused => "paused",
            ModuleStatus::Completed => "completed",
            ModuleStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "backlog" => Ok(ModuleStatus::Backlog),
            "planned" => Ok(ModuleStatus::Planned),
            "in-progress" | "in_progress" | "inprogress" => Ok(ModuleStatus::InProgress),
            "paused" => Ok(ModuleStatus::Paused),
            "completed" => Ok(ModuleStatus::Completed),
            "cancelled" => Ok(ModuleStatus::Cancelled),
            _ => Err(format!("unknown module status: {s}")),
        }
    }
}

impl Default for ModuleStatus {
    fn default() -> Self {
        ModuleStatus::Planned
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse classification of an issue's fine-grained state.
///
/// A state may carry no group at all; such issues count toward a module's
/// total but toward none of the per-group counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateGroup {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Cancelled,
}

impl StateGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateGroup::Backlog => "backlog",
            StateGroup::Unstarted => "unstarted",
            StateGroup::Started => "started",
            StateGroup::Completed => "completed",
            StateGroup::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "backlog" => Ok(StateGroup::Backlog),
            "unstarted" => Ok(StateGroup::Unstarted),
            "started" => Ok(StateGroup::Started),
            "completed" => Ok(StateGroup::Completed),
            "cancelled" => Ok(StateGroup::Cancelled),
            _ => Err(format!("unknown state group: {s}")),
        }
    }
}

impl fmt::Display for StateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: String,
    pub avatar: Option<String>,
}

/// Fine-grained issue state within a project, optionally mapped to a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub group: Option<StateGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub name: String,
    pub state_id: Option<String>,
    pub parent_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named, time-boxed grouping of issues within a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub description_text: Option<Value>,
    pub description_html: Option<Value>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub status: ModuleStatus,
    pub lead_id: Option<String>,
    pub view_props: Value,
    pub sort_order: f64,
    pub external_source: Option<String>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default manual sort position for new modules.
pub const DEFAULT_SORT_ORDER: f64 = 65535.0;

/// Many-to-many link between a module and an issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleIssue {
    pub module_id: String,
    pub issue_id: String,
    pub workspace_id: String,
    pub project_id: String,
}

/// User-scoped marker that promotes a module's rank in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleFavorite {
    pub user_id: String,
    pub module_id: String,
    pub project_id: String,
}

/// External URL attached to a module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleLink {
    pub id: String,
    pub module_id: String,
    pub project_id: String,
    pub title: String,
    pub url: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Per-(user, module) saved filters and display settings.
///
/// The three blobs are opaque JSON documents passed through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleUserProperties {
    pub user_id: String,
    pub module_id: String,
    pub project_id: String,
    pub filters: Value,
    pub display_filters: Value,
    pub display_properties: Value,
}

/// Derived issue counts for a module.
///
/// The five per-group counts are each bounded by `total_issues` but do not
/// have to sum to it: an issue whose state carries no group contributes to
/// the total only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ModuleCounts {
    pub total_issues: i64,
    pub completed_issues: i64,
    pub cancelled_issues: i64,
    pub started_issues: i64,
    pub unstarted_issues: i64,
    pub backlog_issues: i64,
}

/// The consumer-facing read shape for a module: stored fields plus the
/// derived annotations (`is_favorite`, member ids, issue counts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub name: String,
    pub description: String,
    pub description_text: Option<Value>,
    pub description_html: Option<Value>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub status: ModuleStatus,
    pub lead_id: Option<String>,
    pub member_ids: Vec<String>,
    pub view_props: Value,
    pub sort_order: f64,
    pub external_source: Option<String>,
    pub external_id: Option<String>,
    pub is_favorite: bool,
    #[serde(flatten)]
    pub counts: ModuleCounts,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of the per-assignee distribution in the module detail view.
///
/// `assignee_id` is `None` for the bucket of issues with no assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssigneeDistribution {
    pub assignee_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub avatar: Option<String>,
    pub total_issues: i64,
    pub completed_issues: i64,
    pub pending_issues: i64,
}

/// One row of the per-label distribution in the module detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDistribution {
    pub label_id: Option<String>,
    pub label_name: Option<String>,
    pub color: Option<String>,
    pub total_issues: i64,
    pub completed_issues: i64,
    pub pending_issues: i64,
}

/// Date-indexed remaining-issue series for a module's date range.
pub type CompletionChart = BTreeMap<NaiveDate, i64>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub assignees: Vec<AssigneeDistribution>,
    pub labels: Vec<LabelDistribution>,
    pub completion_chart: CompletionChart,
}

/// Full detail view: the annotated record plus web links and distributions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub record: ModuleRecord,
    pub links: Vec<ModuleLink>,
    pub distribution: Distribution,
}

/// Write shape for module creation. `name` is the only required field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleCreate {
    pub name: String,
    pub description: Option<String>,
    pub description_text: Option<Value>,
    pub description_html: Option<Value>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub status: Option<ModuleStatus>,
    pub lead_id: Option<String>,
    pub members: Vec<String>,
    pub view_props: Option<Value>,
    pub sort_order: Option<f64>,
    pub external_source: Option<String>,
    pub external_id: Option<String>,
}

/// Write shape for partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub description_text: Option<Value>,
    pub description_html: Option<Value>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub status: Option<ModuleStatus>,
    pub lead_id: Option<String>,
    pub members: Option<Vec<String>>,
    pub view_props: Option<Value>,
    pub sort_order: Option<f64>,
}
