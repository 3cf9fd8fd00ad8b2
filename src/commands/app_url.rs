use clap::Args;
use nu_ansi_term::{Color, Style};

use super::{failure, heading, require_job, CommandResult, Context};
use crate::cli::{color, render};

#[derive(Args, Debug)]
pub struct AppUrlArgs {
    /// Job ID
    pub job_id: i64,
    /// Application tracking URL (e.g. Workday)
    pub url: String,
}

pub(super) fn execute(ctx: &Context, args: AppUrlArgs) -> CommandResult {
    let run = || -> anyhow::Result<String> {
        let job = require_job(ctx, args.job_id)?;
        ctx.store.set_application_url(job.id, &args.url)?;

        let body = format!(
            "Application URL set for job #{}\n\n{}\n{}",
            job.id,
            heading(&job.title, &job.company),
            color::link(&args.url)
        );
        Ok(render::panel(
            "Application URL Updated",
            &body,
            Style::new().fg(Color::Yellow),
        ))
    };

    match run() {
        Ok(out) => CommandResult::success(out),
        Err(e) => failure("app-url", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;

    #[test]
    fn sets_application_url() {
        let fx = Fixture::new();
        let id = fx.add("Acme", "Rust Engineer");
        let result = fx.run(&["app-url", &id.to_string(), "https://jobs.lever.co/acme/1"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("https://jobs.lever.co/acme/1"));
        assert_eq!(
            fx.store.get_job(id).unwrap().unwrap().application_url.as_deref(),
            Some("https://jobs.lever.co/acme/1")
        );
    }

    #[test]
    fn missing_job_is_exit_1() {
        let fx = Fixture::new();
        assert_eq!(fx.run(&["app-url", "5", "https://x"]).exit_code, 1);
    }
}
