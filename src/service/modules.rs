use chrono::Utc;
use serde_json::Value;

use crate::burndown::BurndownEngine;
use crate::db::{Database, new_id};
use crate::errors::{Error, Result};
use crate::events::{ActivityEvent, ActivitySink, emit};
use crate::models::{
    DEFAULT_SORT_ORDER, Distribution, Module, ModuleCreate, ModuleDetail, ModuleLink,
    ModuleRecord, ModuleUpdate,
};

/// Module CRUD with derived annotations: every read shape carries
/// `is_favorite`, member ids, and the six issue counts, and listings come
/// back favorite-first then newest-created.
pub struct ModuleService<'a> {
    db: &'a Database,
    sink: &'a dyn ActivitySink,
    burndown: &'a dyn BurndownEngine,
}

impl<'a> ModuleService<'a> {
    pub fn new(
        db: &'a Database,
        sink: &'a dyn ActivitySink,
        burndown: &'a dyn BurndownEngine,
    ) -> Self {
        ModuleService { db, sink, burndown }
    }

    /// All modules in the project, annotated, favorite-first then newest.
    pub fn list(
        &self,
        workspace_id: &str,
        project_id: &str,
        viewer_id: &str,
    ) -> Result<Vec<ModuleRecord>> {
        self.db.annotated_modules(workspace_id, project_id, viewer_id)
    }

    /// Create a module and return it in the same annotated shape as `list`.
    pub fn create(
        &self,
        workspace_id: &str,
        project_id: &str,
        viewer_id: &str,
        input: ModuleCreate,
    ) -> Result<ModuleRecord> {
        let project = self
            .db
            .get_project(workspace_id, project_id)?
            .ok_or_else(|| Error::not_found("project"))?;

        if input.name.trim().is_empty() {
            return Err(Error::validation("name", "this field is required"));
        }
        if let (Some(source), Some(external_id)) = (&input.external_source, &input.external_id) {
            if self
                .db
                .external_module_exists(&project.id, source, external_id)?
            {
                return Err(Error::validation(
                    "external_id",
                    format!("module with external id {external_id} already exists in project"),
                ));
            }
        }

        let now = Utc::now();
        let module = Module {
            id: new_id(),
            workspace_id: project.workspace_id.clone(),
            project_id: project.id.clone(),
            name: input.name,
            description: input.description.unwrap_or_default(),
            description_text: input.description_text,
            description_html: input.description_html,
            start_date: input.start_date,
            target_date: input.target_date,
            status: input.status.unwrap_or_default(),
            lead_id: input.lead_id,
            view_props: input
                .view_props
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())),
            sort_order: input.sort_order.unwrap_or(DEFAULT_SORT_ORDER),
            external_source: input.external_source,
            external_id: input.external_id,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_module(&module)?;
        if !input.members.is_empty() {
            self.db.set_module_members(&module.id, &input.members)?;
        }

        // Same annotation subqueries as the listing, so is_favorite is
        // computed rather than assumed false.
        self.db
            .annotated_module(workspace_id, project_id, &module.id, viewer_id)?
            .ok_or_else(|| Error::not_found("module"))
    }

    /// Full detail: annotated record plus web links and distributions.
    pub fn retrieve(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        viewer_id: &str,
    ) -> Result<ModuleDetail> {
        let record = self
            .db
            .annotated_module(workspace_id, project_id, module_id, viewer_id)?
            .ok_or_else(|| Error::not_found("module"))?;
        let module = self
            .db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        let assignees = self
            .db
            .assignee_distribution(workspace_id, project_id, module_id)?;
        let labels = self
            .db
            .label_distribution(workspace_id, project_id, module_id)?;

        // Absent dates mean an empty chart, not a null one.
        let completion_chart = if module.start_date.is_some() && module.target_date.is_some() {
            self.burndown.completion_chart(self.db, &module)?
        } else {
            Default::default()
        };

        Ok(ModuleDetail {
            record,
            links: self.db.module_links(module_id)?,
            distribution: Distribution {
                assignees,
                labels,
                completion_chart,
            },
        })
    }

    /// Apply only the provided fields and re-return the annotated record.
    ///
    /// Date ordering (target before start) is intentionally not validated.
    pub fn partial_update(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        viewer_id: &str,
        changes: ModuleUpdate,
    ) -> Result<ModuleRecord> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        if let Some(name) = &changes.name {
            if name.trim().is_empty() {
                return Err(Error::validation("name", "this field may not be blank"));
            }
        }

        self.db.update_module(module_id, &changes)?;
        self.db
            .annotated_module(workspace_id, project_id, module_id, viewer_id)?
            .ok_or_else(|| Error::not_found("module"))
    }

    /// Delete the module and its issue links. Every previously linked issue
    /// gets one deletion event carrying the module's name, captured before
    /// the row disappears.
    pub fn destroy(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        actor_id: &str,
    ) -> Result<()> {
        let module = self
            .db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;
        let issue_ids = self.db.module_issue_ids(module_id)?;

        for issue_id in &issue_ids {
            emit(
                self.sink,
                ActivityEvent::module_deleted(
                    module_id,
                    issue_id,
                    project_id,
                    actor_id,
                    &module.name,
                ),
            );
        }
        self.db.delete_module(module_id)?;
        Ok(())
    }

    /// Attach an external URL to a module.
    pub fn add_link(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        title: &str,
        url: &str,
        created_by: &str,
    ) -> Result<ModuleLink> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;
        if url.trim().is_empty() {
            return Err(Error::validation("url", "this field is required"));
        }
        let link = ModuleLink {
            id: new_id(),
            module_id: module_id.to_string(),
            project_id: project_id.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };
        self.db.insert_module_link(&link)?;
        Ok(link)
    }

    /// Web links for a module, newest first.
    pub fn links(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
    ) -> Result<Vec<ModuleLink>> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;
        self.db.module_links(module_id)
    }
}

/// Explicit field projection over the fixed full-record shape: serialize the
/// record, keep only the requested keys. Unknown keys are rejected rather
/// than silently dropped.
pub fn project_fields(record: &ModuleRecord, fields: &[&str]) -> Result<Value> {
    let full = serde_json::to_value(record)?;
    let Value::Object(map) = full else {
        // ModuleRecord always serializes to an object.
        return Err(Error::validation("fields", "record is not an object"));
    };
    let mut out = serde_json::Map::new();
    for field in fields {
        match map.get(*field) {
            Some(v) => {
                out.insert((*field).to_string(), v.clone());
            }
            None => {
                return Err(Error::validation(
                    "fields",
                    format!("unknown field: {field}"),
                ));
            }
        }
    }
    Ok(Value::Object(out))
}
