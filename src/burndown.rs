use crate::db::Database;
use crate::errors::Result;
use crate::models::{CompletionChart, Module};

/// Completion-chart collaborator: maps a module's date range to a
/// date-indexed remaining-issue series. Called only when both start_date and
/// target_date are set; the caller substitutes an empty map otherwise.
pub trait BurndownEngine {
    fn completion_chart(&self, db: &Database, module: &Module) -> Result<CompletionChart>;
}

/// Default engine: derives remaining counts from issue completion
/// timestamps. For each day in the range, remaining = countable issues minus
/// those completed on or before that day.
pub struct IssueBurndown;

impl BurndownEngine for IssueBurndown {
    fn completion_chart(&self, db: &Database, module: &Module) -> Result<CompletionChart> {
        let mut chart = CompletionChart::new();
        let (Some(start), Some(target)) = (module.start_date, module.target_date) else {
            return Ok(chart);
        };

        let total = db.module_counts(&module.id)?.total_issues;
        let completions = db.completions_by_day(&module.id)?;

        // Completions that predate the window still reduce day one.
        let mut done: i64 = completions
            .iter()
            .filter(|(day, _)| *day < start)
            .map(|(_, count)| count)
            .sum();
        let mut pending = completions.into_iter().filter(|(day, _)| *day >= start);
        let mut next = pending.next();

        for day in start.iter_days() {
            if day > target {
                break;
            }
            while let Some((completed_day, count)) = next {
                if completed_day > day {
                    next = Some((completed_day, count));
                    break;
                }
                done += count;
                next = pending.next();
            }
            chart.insert(day, total - done);
        }
        Ok(chart)
    }
}
