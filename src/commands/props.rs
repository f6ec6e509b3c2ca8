use serde_json::Value;

use super::Ctx;
use stint::errors::{Error, Result};
use stint::service::PropertiesService;

fn parse_blob(field: &str, value: &str) -> Result<Value> {
    serde_json::from_str(value).map_err(|e| Error::validation(field, format!("invalid JSON: {e}")))
}

pub fn show(ctx: &Ctx, module_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let service = PropertiesService::new(&db);
    let props = service.get(&ctx.workspace, &ctx.project, module_id, &ctx.actor)?;
    println!("{}", serde_json::to_string_pretty(&props)?);
    Ok(())
}

pub fn set(
    ctx: &Ctx,
    module_id: &str,
    filters: Option<&str>,
    display_filters: Option<&str>,
    display_properties: Option<&str>,
) -> Result<()> {
    let db = ctx.open()?;
    let service = PropertiesService::new(&db);

    let filters = filters.map(|v| parse_blob("filters", v)).transpose()?;
    let display_filters = display_filters
        .map(|v| parse_blob("display_filters", v))
        .transpose()?;
    let display_properties = display_properties
        .map(|v| parse_blob("display_properties", v))
        .transpose()?;

    let props = service.patch(
        &ctx.workspace,
        &ctx.project,
        module_id,
        &ctx.actor,
        filters.as_ref(),
        display_filters.as_ref(),
        display_properties.as_ref(),
    )?;
    println!("{}", serde_json::to_string_pretty(&props)?);
    Ok(())
}
