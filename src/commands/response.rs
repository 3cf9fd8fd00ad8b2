use clap::Args;
use nu_ansi_term::{Color, Style};

use super::{failure, require_job, CommandResult, Context};
use crate::cli::{color, render};

#[derive(Args, Debug)]
pub struct ResponseArgs {
    /// Job ID
    pub job_id: i64,
    /// They expressed interest (default)
    #[arg(short, long, conflicts_with = "rejected")]
    pub interested: bool,
    /// They rejected the application
    #[arg(short, long)]
    pub rejected: bool,
    /// Response details
    #[arg(short, long)]
    pub notes: Option<String>,
}

/// response: 企業からの返答を記録する。`--rejected` が無ければ興味ありとして扱う。
pub(super) fn execute(ctx: &Context, args: ResponseArgs) -> CommandResult {
    let interested = !args.rejected;
    let run = || -> anyhow::Result<String> {
        let job = require_job(ctx, args.job_id)?;
        ctx.store
            .add_response(job.id, interested, args.notes.as_deref())?;

        let out = if interested {
            let body = format!(
                "{}\n\n{}\nStatus updated to {}",
                color::bold_blue(&format!("Interest from {}!", job.company)),
                color::bold(&job.title),
                color::blue("interviewing")
            );
            render::panel("Response Recorded", &body, Style::new().fg(Color::LightBlue))
        } else {
            let body = format!(
                "{}\n\n{}",
                color::bold_red(&format!("Rejection from {}", job.company)),
                color::bold(&job.title)
            );
            render::panel("Response Recorded", &body, Style::new().fg(Color::LightRed))
        };
        Ok(out)
    };

    match run() {
        Ok(out) => CommandResult::success(out),
        Err(e) => failure("response", e),
    }
}
