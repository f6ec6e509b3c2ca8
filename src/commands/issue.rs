use chrono::Utc;

use super::Ctx;
use stint::db::new_id;
use stint::errors::{Error, Result};
use stint::models::Issue;

pub fn create(
    ctx: &Ctx,
    name: &str,
    state_id: Option<&str>,
    assignees: &[String],
    labels: &[String],
    draft: bool,
) -> Result<()> {
    let db = ctx.open()?;
    db.get_project(&ctx.workspace, &ctx.project)?
        .ok_or_else(|| Error::not_found("project"))?;

    let now = Utc::now();
    let issue = Issue {
        id: new_id(),
        workspace_id: ctx.workspace.clone(),
        project_id: ctx.project.clone(),
        name: name.to_string(),
        state_id: state_id.map(|s| s.to_string()),
        parent_id: None,
        completed_at: None,
        archived_at: None,
        is_draft: draft,
        created_at: now,
        updated_at: now,
    };
    db.insert_issue(&issue)?;
    for assignee in assignees {
        db.assign_issue(&issue.id, assignee)?;
    }
    for label in labels {
        db.label_issue(&issue.id, label)?;
    }

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        println!("Created issue {}: {name}", issue.id);
    }
    Ok(())
}

pub fn complete(ctx: &Ctx, issue_id: &str) -> Result<()> {
    let db = ctx.open()?;
    if db.complete_issue(issue_id, Utc::now())? == 0 {
        return Err(Error::not_found("issue"));
    }
    println!("Completed issue {issue_id}");
    Ok(())
}

pub fn archive(ctx: &Ctx, issue_id: &str) -> Result<()> {
    let db = ctx.open()?;
    if db.archive_issue(issue_id, Utc::now())? == 0 {
        return Err(Error::not_found("issue"));
    }
    println!("Archived issue {issue_id}");
    Ok(())
}
