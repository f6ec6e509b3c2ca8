use chrono::NaiveDate;

use super::{Ctx, print_modules};
use stint::burndown::IssueBurndown;
use stint::errors::{Error, Result};
use stint::events::TracingSink;
use stint::models::{ModuleCreate, ModuleStatus, ModuleUpdate};
use stint::service::{ModuleService, project_fields};

fn parse_cli_date(field: &str, value: &str) -> Result<NaiveDate> {
    value
        .parse::<NaiveDate>()
        .map_err(|_| Error::validation(field, format!("invalid date: {value} (expected YYYY-MM-DD)")))
}

fn parse_cli_status(value: &str) -> Result<ModuleStatus> {
    ModuleStatus::parse(value).map_err(|e| Error::validation("status", e))
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    ctx: &Ctx,
    name: &str,
    description: Option<&str>,
    start_date: Option<&str>,
    target_date: Option<&str>,
    status: Option<&str>,
    lead: Option<&str>,
    members: &[String],
    external_source: Option<&str>,
    external_id: Option<&str>,
) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);

    let input = ModuleCreate {
        name: name.to_string(),
        description: description.map(|s| s.to_string()),
        start_date: start_date.map(|d| parse_cli_date("start_date", d)).transpose()?,
        target_date: target_date.map(|d| parse_cli_date("target_date", d)).transpose()?,
        status: status.map(parse_cli_status).transpose()?,
        lead_id: lead.map(|s| s.to_string()),
        members: members.to_vec(),
        external_source: external_source.map(|s| s.to_string()),
        external_id: external_id.map(|s| s.to_string()),
        ..Default::default()
    };
    let record = service.create(&ctx.workspace, &ctx.project, &ctx.actor, input)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Created module {}: {}", record.id, record.name);
    }
    Ok(())
}

pub fn list(ctx: &Ctx, fields: Option<&str>) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);
    let records = service.list(&ctx.workspace, &ctx.project, &ctx.actor)?;

    if let Some(fields) = fields {
        let names: Vec<&str> = fields.split(',').map(str::trim).filter(|f| !f.is_empty()).collect();
        let projected: Vec<serde_json::Value> = records
            .iter()
            .map(|r| project_fields(r, &names))
            .collect::<Result<_>>()?;
        println!("{}", serde_json::to_string_pretty(&projected)?);
        return Ok(());
    }

    print_modules(&records, ctx.json)
}

pub fn show(ctx: &Ctx, module_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);
    let detail = service.retrieve(&ctx.workspace, &ctx.project, module_id, &ctx.actor)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let r = &detail.record;
    println!("{}  {}", r.id, r.name);
    println!("status:   {}", super::format_status(r.status));
    if let (Some(start), Some(target)) = (r.start_date, r.target_date) {
        println!("dates:    {start} .. {target}");
    }
    println!(
        "issues:   {} total / {} completed / {} started / {} unstarted / {} backlog / {} cancelled",
        r.counts.total_issues,
        r.counts.completed_issues,
        r.counts.started_issues,
        r.counts.unstarted_issues,
        r.counts.backlog_issues,
        r.counts.cancelled_issues,
    );
    if !r.member_ids.is_empty() {
        println!("members:  {}", r.member_ids.join(", "));
    }
    if !detail.distribution.assignees.is_empty() {
        println!("assignees:");
        for a in &detail.distribution.assignees {
            let who = a.display_name.as_deref().unwrap_or("(unassigned)");
            println!(
                "  {:<24} {} total, {} done, {} pending",
                who, a.total_issues, a.completed_issues, a.pending_issues
            );
        }
    }
    if !detail.distribution.labels.is_empty() {
        println!("labels:");
        for l in &detail.distribution.labels {
            let name = l.label_name.as_deref().unwrap_or("(unlabelled)");
            println!(
                "  {:<24} {} total, {} done, {} pending",
                name, l.total_issues, l.completed_issues, l.pending_issues
            );
        }
    }
    if !detail.distribution.completion_chart.is_empty() {
        println!("burndown:");
        for (day, remaining) in &detail.distribution.completion_chart {
            println!("  {day}  {remaining} remaining");
        }
    }
    if !detail.links.is_empty() {
        println!("links:");
        for link in &detail.links {
            println!("  {}  {}", link.title, link.url);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn update(
    ctx: &Ctx,
    module_id: &str,
    name: Option<&str>,
    description: Option<&str>,
    start_date: Option<&str>,
    target_date: Option<&str>,
    status: Option<&str>,
    lead: Option<&str>,
    sort_order: Option<f64>,
) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);

    let changes = ModuleUpdate {
        name: name.map(|s| s.to_string()),
        description: description.map(|s| s.to_string()),
        start_date: start_date.map(|d| parse_cli_date("start_date", d)).transpose()?,
        target_date: target_date.map(|d| parse_cli_date("target_date", d)).transpose()?,
        status: status.map(parse_cli_status).transpose()?,
        lead_id: lead.map(|s| s.to_string()),
        sort_order,
        ..Default::default()
    };
    let record =
        service.partial_update(&ctx.workspace, &ctx.project, module_id, &ctx.actor, changes)?;

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Updated module {}: {}", record.id, record.name);
    }
    Ok(())
}

pub fn delete(ctx: &Ctx, module_id: &str) -> Result<()> {
    let db = ctx.open()?;
    let sink = TracingSink;
    let service = ModuleService::new(&db, &sink, &IssueBurndown);
    service.destroy(&ctx.workspace, &ctx.project, module_id, &ctx.actor)?;
    println!("Deleted module {module_id}");
    Ok(())
}
