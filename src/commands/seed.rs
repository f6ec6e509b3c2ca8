use super::Ctx;
use stint::db::new_id;
use stint::errors::Result;
use stint::models::{Label, State, StateGroup, User};

pub fn add_user(
    ctx: &Ctx,
    display_name: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<()> {
    let db = ctx.open()?;
    let user = User {
        id: new_id(),
        first_name: first_name.map(|s| s.to_string()),
        last_name: last_name.map(|s| s.to_string()),
        display_name: display_name.to_string(),
        avatar: None,
    };
    db.insert_user(&user)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        println!("Created user {}: {display_name}", user.id);
    }
    Ok(())
}

pub fn add_state(ctx: &Ctx, name: &str, group: Option<&str>) -> Result<()> {
    let db = ctx.open()?;
    let group = match group {
        Some(g) => Some(
            StateGroup::parse(g).map_err(|e| stint::errors::Error::validation("group", e))?,
        ),
        None => None,
    };
    let state = State {
        id: new_id(),
        project_id: ctx.project.clone(),
        name: name.to_string(),
        group,
    };
    db.insert_state(&state)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("Created state {}: {name}", state.id);
    }
    Ok(())
}

pub fn add_label(ctx: &Ctx, name: &str, color: Option<&str>) -> Result<()> {
    let db = ctx.open()?;
    let label = Label {
        id: new_id(),
        project_id: ctx.project.clone(),
        name: name.to_string(),
        color: color.map(|s| s.to_string()),
    };
    db.insert_label(&label)?;
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&label)?);
    } else {
        println!("Created label {}: {name}", label.id);
    }
    Ok(())
}
