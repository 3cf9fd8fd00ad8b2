use clap::Args;
use nu_ansi_term::{Color, Style};
use tracing::info;

use super::{failure, heading, require_job, CommandResult, Context};
use crate::cli::{color, render};

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Job ID to delete
    pub job_id: i64,
    /// Skip confirmation
    #[arg(short, long)]
    pub force: bool,
}

/// delete: ジョブとイベントを削除する。`--force` が無ければ確認を取る。
pub(super) fn execute(
    ctx: &Context,
    args: DeleteArgs,
    confirm: &mut dyn FnMut(&str) -> bool,
) -> CommandResult {
    let job = match require_job(ctx, args.job_id) {
        Ok(job) => job,
        Err(e) => return failure("delete", e),
    };

    if !args.force && !confirm(&format!("Delete '{}' at {}?", job.title, job.company)) {
        info!(job_id = job.id, "Delete cancelled");
        return CommandResult::success(format!("{}\n", color::dim("Cancelled")));
    }

    match ctx.store.delete_job(job.id) {
        Ok(_) => {
            let body = format!(
                "Deleted job #{}\n\n{}",
                job.id,
                heading(&job.title, &job.company)
            );
            CommandResult::success(render::panel(
                "Job Deleted",
                &body,
                Style::new().fg(Color::LightRed),
            ))
        }
        Err(e) => failure("delete", e),
    }
}
