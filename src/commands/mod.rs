pub mod attach;
pub mod favorite;
pub mod init;
pub mod issue;
pub mod module;
pub mod props;
pub mod seed;
pub mod weblink;

use std::path::PathBuf;

use colored::Colorize;

use stint::db::Database;
use stint::errors::Result;
use stint::models::{ModuleRecord, ModuleStatus};

/// Per-invocation context shared by every command.
pub struct Ctx {
    pub db_path: PathBuf,
    pub workspace: String,
    pub project: String,
    pub actor: String,
    pub json: bool,
}

impl Ctx {
    pub fn open(&self) -> Result<Database> {
        Database::open(&self.db_path)
    }
}

/// Format a module status as a colored string.
pub fn format_status(s: ModuleStatus) -> String {
    match s {
        ModuleStatus::Backlog => "backlog".bright_black().to_string(),
        ModuleStatus::Planned => "planned".white().to_string(),
        ModuleStatus::InProgress => "in-progress".cyan().to_string(),
        ModuleStatus::Paused => "paused".yellow().to_string(),
        ModuleStatus::Completed => "completed".green().to_string(),
        ModuleStatus::Cancelled => "cancelled".red().to_string(),
    }
}

/// Print annotated modules as a table or JSON.
pub fn print_modules(records: &[ModuleRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No modules found.");
        return Ok(());
    }

    println!(
        "{:<38} {:<13} {:<30} {:<4} {:>6} {:>5}",
        "ID", "STATUS", "NAME", "FAV", "ISSUES", "DONE"
    );
    println!("{}", "-".repeat(100));
    for r in records {
        // Truncate on char boundaries; byte slicing panics on multibyte names.
        let name = if r.name.chars().count() > 28 {
            let head: String = r.name.chars().take(25).collect();
            format!("{head}...")
        } else {
            r.name.clone()
        };
        println!(
            "{:<38} {:<13} {:<30} {:<4} {:>6} {:>5}",
            r.id,
            format_status(r.status),
            name,
            if r.is_favorite { "*" } else { "" },
            r.counts.total_issues,
            r.counts.completed_issues,
        );
    }
    Ok(())
}
