use serde_json::Value;

use crate::db::Database;
use crate::errors::{Error, Result};
use crate::models::ModuleUserProperties;

/// Per-(user, module) saved filters and display settings. Rows are created
/// lazily on first read; patches replace only the provided blobs.
pub struct PropertiesService<'a> {
    db: &'a Database,
}

impl<'a> PropertiesService<'a> {
    pub fn new(db: &'a Database) -> Self {
        PropertiesService { db }
    }

    /// Get-or-create semantics: the first read materializes an empty row.
    pub fn get(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        user_id: &str,
    ) -> Result<ModuleUserProperties> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        self.db
            .ensure_user_properties(user_id, module_id, project_id)?;
        self.db
            .get_user_properties(user_id, module_id)?
            .ok_or_else(|| Error::not_found("module user properties"))
    }

    /// Partial patch; absent blobs keep their stored value. The row must
    /// already exist.
    pub fn patch(
        &self,
        workspace_id: &str,
        project_id: &str,
        module_id: &str,
        user_id: &str,
        filters: Option<&Value>,
        display_filters: Option<&Value>,
        display_properties: Option<&Value>,
    ) -> Result<ModuleUserProperties> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        let changed = self.db.update_user_properties(
            user_id,
            module_id,
            filters,
            display_filters,
            display_properties,
        )?;
        if changed == 0 {
            return Err(Error::not_found("module user properties"));
        }
        self.db
            .get_user_properties(user_id, module_id)?
            .ok_or_else(|| Error::not_found("module user properties"))
    }
}
