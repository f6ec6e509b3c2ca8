use super::Ctx;
use stint::errors::Result;
use stint::service::FavoriteService;

pub fn add(ctx: &Ctx, module_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let service = FavoriteService::new(&db);
    service.create(&ctx.workspace, &ctx.project, &ctx.actor, module_id)?;
    println!("Favorited module {module_id}");
    Ok(())
}

pub fn remove(ctx: &Ctx, module_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let service = FavoriteService::new(&db);
    service.destroy(&ctx.workspace, &ctx.project, &ctx.actor, module_id)?;
    println!("Unfavorited module {module_id}");
    Ok(())
}
