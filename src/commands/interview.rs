use clap::Args;
use nu_ansi_term::{Color, Style};

use super::{failure, heading, require_job, CommandResult, Context};
use crate::cli::{color, render};

#[derive(Args, Debug)]
pub struct InterviewArgs {
    /// Job ID
    pub job_id: i64,
    /// Interview notes
    #[arg(short, long)]
    pub notes: Option<String>,
}

pub(super) fn execute(ctx: &Context, args: InterviewArgs) -> CommandResult {
    let run = || -> anyhow::Result<String> {
        let job = require_job(ctx, args.job_id)?;
        ctx.store.add_interview(job.id, args.notes.as_deref())?;

        let body = format!(
            "{}\n\n{}",
            color::bold_blue(&format!("Interview recorded for job #{}", job.id)),
            heading(&job.title, &job.company)
        );
        Ok(render::panel(
            "Interview Added",
            &body,
            Style::new().fg(Color::LightBlue),
        ))
    };

    match run() {
        Ok(out) => CommandResult::success(out),
        Err(e) => failure("interview", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use crate::storage::EventType;

    #[test]
    fn records_interview() {
        let fx = Fixture::new();
        let id = fx.add("Acme", "Rust Engineer");
        let result = fx.run(&["interview", &id.to_string(), "--notes", "Onsite, 4 rounds"]);
        assert!(result.stdout.contains("Interview recorded for job #1"));

        assert_eq!(fx.store.get_job(id).unwrap().unwrap().status, "interviewing");
        let last = fx.store.get_events(id).unwrap().pop().unwrap();
        assert_eq!(last.event_type, EventType::Interview);
    }

    #[test]
    fn missing_job_is_exit_1() {
        let fx = Fixture::new();
        assert_eq!(fx.run(&["interview", "2"]).stderr, "Job #2 not found\n");
    }
}
