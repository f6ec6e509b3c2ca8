use super::Ctx;
use stint::burndown::IssueBurndown;
use stint::errors::Result;
use stint::events::TracingSink;
use stint::service::ModuleService;

pub fn add(ctx: &Ctx, module_id: &str, url: &str, title: Option<&str>) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);
    let link = service.add_link(
        &ctx.workspace,
        &ctx.project,
        module_id,
        title.unwrap_or(""),
        url,
        &ctx.actor,
    )?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&link)?);
    } else {
        println!("Added link {} to module {module_id}", link.id);
    }
    Ok(())
}

pub fn list(ctx: &Ctx, module_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);
    let links = service.links(&ctx.workspace, &ctx.project, module_id)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&links)?);
        return Ok(());
    }
    if links.is_empty() {
        println!("No links found.");
        return Ok(());
    }
    for link in &links {
        println!("{}  {:<24} {}", link.id, link.title, link.url);
    }
    Ok(())
}
