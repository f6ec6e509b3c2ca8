use crate::db::Database;
use crate::errors::{Error, Result};
use crate::models::ModuleFavorite;

/// Per-user module favorites. Duplicate creates race through the storage
/// uniqueness constraint: exactly one row persists and the loser no-ops.
pub struct FavoriteService<'a> {
    db: &'a Database,
}

impl<'a> FavoriteService<'a> {
    pub fn new(db: &'a Database) -> Self {
        FavoriteService { db }
    }

    pub fn create(
        &self,
        workspace_id: &str,
        project_id: &str,
        user_id: &str,
        module_id: &str,
    ) -> Result<ModuleFavorite> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        let favorite = ModuleFavorite {
            user_id: user_id.to_string(),
            module_id: module_id.to_string(),
            project_id: project_id.to_string(),
        };
        self.db.insert_favorite(&favorite)?;
        Ok(favorite)
    }

    pub fn destroy(
        &self,
        workspace_id: &str,
        project_id: &str,
        user_id: &str,
        module_id: &str,
    ) -> Result<()> {
        self.db
            .get_module(workspace_id, project_id, module_id)?
            .ok_or_else(|| Error::not_found("module"))?;

        let removed = self.db.delete_favorite(user_id, module_id)?;
        if removed == 0 {
            return Err(Error::not_found("module favorite"));
        }
        Ok(())
    }
}
