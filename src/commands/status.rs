use clap::Args;

use super::{failure, heading, require_job, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::JobStatus;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job ID
    pub job_id: i64,
    /// New status (interested, applied, interviewing, offered, rejected, withdrawn, ghosted)
    pub status: JobStatus,
    /// Status change notes
    #[arg(short, long)]
    pub notes: Option<String>,
}

pub(super) fn execute(ctx: &Context, args: StatusArgs) -> CommandResult {
    let run = || -> anyhow::Result<String> {
        let job = require_job(ctx, args.job_id)?;
        ctx.store
            .update_status(job.id, args.status, args.notes.as_deref())?;

        let body = format!(
            "Status updated for job #{}\n\n{}\nNew status: {}",
            job.id,
            heading(&job.title, &job.company),
            color::status(args.status.as_str())
        );
        Ok(render::panel(
            "Status Updated",
            &body,
            color::status_style(Some(args.status)),
        ))
    };

    match run() {
        Ok(out) => CommandResult::success(out),
        Err(e) => failure("status", e),
    }
}
