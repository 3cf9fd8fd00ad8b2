use clap::Args;
use comfy_table::{Cell, Color as CellColor};

use super::{failure, to_json, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::{date_part, Job, JobStatus, Source};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(short, long)]
    pub status: Option<JobStatus>,
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub(super) fn execute(ctx: &Context, args: ListArgs) -> CommandResult {
    let jobs = match ctx.store.list_jobs(args.status) {
        Ok(jobs) => jobs,
        Err(e) => return failure("list", e),
    };

    if args.json {
        return match to_json(&jobs) {
            Ok(json) => CommandResult::success(json),
            Err(e) => failure("list", e),
        };
    }

    if jobs.is_empty() {
        return CommandResult::success(format!("{}\n", color::dim("No jobs found.")));
    }
    CommandResult::success(render_jobs(&jobs))
}

fn render_jobs(jobs: &[Job]) -> String {
    let mut table = render::table(&[
        "ID", "Company", "Title", "Location", "Status", "Src", "Applied", "Updated",
    ]);
    for job in jobs {
        table.add_row(vec![
            Cell::new(job.id),
            Cell::new(&job.company).fg(CellColor::Cyan),
            Cell::new(&job.title),
            Cell::new(job.location.as_deref().unwrap_or("-")),
            render::status_cell(&job.status),
            source_cell(job.source),
            Cell::new(job.applied_at.as_deref().map(date_part).unwrap_or("-")),
            Cell::new(date_part(&job.updated_at)),
        ]);
    }
    format!("{}\n{table}\n", color::bold("Your Job Applications"))
}

/// AI が登録したジョブの印
pub(super) fn source_cell(source: Source) -> Cell {
    match source {
        Source::Ai => Cell::new("AI").fg(CellColor::Magenta),
        Source::Manual => Cell::new(""),
    }
}
