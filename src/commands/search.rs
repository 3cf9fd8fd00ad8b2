use std::collections::HashSet;

use clap::Args;
use comfy_table::{Cell, Color as CellColor};

use super::{failure, to_json, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::{Job, JobStatus, JobStore};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search term (company or title)
    pub query: String,
    /// Search company name only
    #[arg(short, long, conflicts_with = "title")]
    pub company: bool,
    /// Search job title only
    #[arg(short, long)]
    pub title: bool,
    /// Filter by status
    #[arg(short, long)]
    pub status: Option<JobStatus>,
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// search: 会社名・職種の部分一致で検索する。
/// フラグが無ければ両方を検索し、ID で重複を除く（会社名の一致が先）。
pub(super) fn execute(ctx: &Context, args: SearchArgs) -> CommandResult {
    let jobs = match find(ctx.store, &args) {
        Ok(jobs) => jobs,
        Err(e) => return failure("search", e),
    };

    if args.json {
        return match to_json(&jobs) {
            Ok(json) => CommandResult::success(json),
            Err(e) => failure("search", e),
        };
    }

    if jobs.is_empty() {
        return CommandResult::success(format!(
            "{}\n",
            color::dim(&format!("No jobs found matching '{}'", args.query))
        ));
    }

    let mut table = render::table(&["ID", "Company", "Title", "Location", "Status"]);
    for job in &jobs {
        table.add_row(vec![
            Cell::new(job.id),
            Cell::new(&job.company).fg(CellColor::Cyan),
            Cell::new(&job.title),
            Cell::new(job.location.as_deref().unwrap_or("-")),
            render::status_cell(&job.status),
        ]);
    }
    CommandResult::success(format!(
        "{}\n{table}\n",
        color::bold(&format!("Search Results for '{}'", args.query))
    ))
}

fn find(store: &JobStore, args: &SearchArgs) -> anyhow::Result<Vec<Job>> {
    let query = args.query.as_str();
    if args.company {
        return store.search_jobs(Some(query), None, args.status);
    }
    if args.title {
        return store.search_jobs(None, Some(query), args.status);
    }

    let by_company = store.search_jobs(Some(query), None, args.status)?;
    let by_title = store.search_jobs(None, Some(query), args.status)?;
    let mut seen = HashSet::new();
    Ok(by_company
        .into_iter()
        .chain(by_title)
        .filter(|job| seen.insert(job.id))
        .collect())
}
