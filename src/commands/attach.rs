use super::Ctx;
use stint::errors::Result;
use stint::events::TracingSink;
use stint::service::LinkService;

pub fn issues(ctx: &Ctx, module_id: &str, issue_ids: &[String]) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = LinkService::new(&db, &sink);
    service.attach_issues(&ctx.workspace, &ctx.project, module_id, issue_ids, &ctx.actor)?;
    println!("Attached {} issue(s) to module {module_id}", issue_ids.len());
    Ok(())
}

pub fn modules(ctx: &Ctx, issue_id: &str, module_ids: &[String]) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = LinkService::new(&db, &sink);
    service.attach_modules(&ctx.workspace, &ctx.project, issue_id, module_ids, &ctx.actor)?;
    println!("Attached issue {issue_id} to {} module(s)", module_ids.len());
    Ok(())
}

pub fn detach(ctx: &Ctx, module_id: &str, issue_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = LinkService::new(&db, &sink);
    service.detach(&ctx.workspace, &ctx.project, module_id, issue_id, &ctx.actor)?;
    println!("Detached issue {issue_id} from module {module_id}");
    Ok(())
}
