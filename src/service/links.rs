use crate::db::Database;
use crate::errors::{Error, Result};
use crate::events::{ActivityEvent, ActivitySink, emit};

/// Bulk attach/detach of issues to modules.
///
/// Attaches are idempotent at the storage layer (duplicate pairs are
/// skipped), but one created event is still emitted per input id, duplicates
/// included.
pub struct LinkService<'a> {
    db: &'a Database,
    sink: &'a dyn ActivitySink,
}

impl<'a> LinkService<'a> {
    pub fn new(db: &'a Database, sink: &'a dyn ActivitySink) -> Self {
        LinkService { db, sink }
    }

    /// Attach a batch of issues to one module.
    pub fn attach_issues(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        issue_ids: &[String],
        actor_id: &str,
    ) -> Result<()> {
        if issue_ids.is_empty() {
            return Err(Error::validation("issues", "at least one issue id is required"));
        }
        let project = self
            .db
            .get_project(workspace_id, project_id)?
            .ok_or_else(|| Error::not_found("project"))?;

        self.db
            .attach_issues(module_id, &project.workspace_id, &project.id, issue_ids)?;

        for issue_id in issue_ids {
            emit(
                self.sink,
                ActivityEvent::module_created(module_id, issue_id, project_id, actor_id),
            );
        }
        Ok(())
    }

    /// Attach one issue to a batch of modules.
    pub fn attach_modules(
        &self,
        workspace_id: &str,
        project_id: &str,
        issue_id: &str,
        module_ids: &[String],
        actor_id: &str,
    ) -> Result<()> {
        if module_ids.is_empty() {
            return Err(Error::validation(
                "modules",
                "at least one module id is required",
            ));
        }
        let project = self
            .db
            .get_project(workspace_id, project_id)?
            .ok_or_else(|| Error::not_found("project"))?;

        self.db
            .attach_modules(issue_id, &project.workspace_id, &project.id, module_ids)?;

        for module_id in module_ids {
            emit(
                self.sink,
                ActivityEvent::module_created(module_id, issue_id, project_id, actor_id),
            );
        }
        Ok(())
    }

    /// Remove exactly one link. The deletion event carries a snapshot of the
    /// module's name, taken before the row goes away.
    pub fn detach(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        issue_id: &str,
        actor_id: &str,
    ) -> Result<()> {
        let module = self
            .db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        let removed = self.db.detach_issue(module_id, issue_id)?;
        if removed == 0 {
            return Err(Error::not_found("module issue"));
        }

        emit(
            self.sink,
            ActivityEvent::module_deleted(module_id, issue_id, project_id, actor_id, &module.name),
        );
        Ok(())
    }
}
