use super::Ctx;
use stint::db::Database;
use stint::errors::Result;
use stint::models::Project;

/// Create the database (and parent directory) and register the project.
pub fn run(ctx: &Ctx, name: &str) -> Result<()> {
    if let Some(parent) = ctx.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                stint::errors::Error::validation("db", format!("cannot create directory: {e}"))
            })?;
        }
    }

    let db = Database::open(&ctx.db_path)?;
    db.migrate()?;

    if db.get_project(&ctx.workspace, &ctx.project)?.is_none() {
        db.insert_project(&Project {
            id: ctx.project.clone(),
            workspace_id: ctx.workspace.clone(),
            name: name.to_string(),
        })?;
    }

    println!(
        "Initialized {} (workspace {}, project {})",
        ctx.db_path.display(),
        ctx.workspace,
        ctx.project
    );
    Ok(())
}
