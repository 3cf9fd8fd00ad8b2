use clap::Args;
use nu_ansi_term::{Color, Style};

use super::{failure, heading, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::NewJob;

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Company name
    pub company: String,
    /// Job title
    pub title: String,
    /// Job posting URL (e.g. LinkedIn)
    #[arg(short = 'u', long)]
    pub url: Option<String>,
    /// Job location
    #[arg(short, long)]
    pub location: Option<String>,
    /// Salary range
    #[arg(short, long)]
    pub salary: Option<String>,
    /// Job description
    #[arg(short = 'd', long = "desc")]
    pub description: Option<String>,
    /// Mark as added by AI (e.g. from an email scan)
    #[arg(long)]
    pub ai: bool,
}

/// add: 新しいジョブを `interested` で登録する。
pub(super) fn execute(ctx: &Context, args: AddArgs) -> CommandResult {
    let job = NewJob {
        company: args.company,
        title: args.title,
        posting_url: args.url,
        location: args.location,
        salary: args.salary,
        description: args.description,
        ai: args.ai,
    };

    match ctx.store.add_job(&job) {
        Ok(job_id) => {
            let body = format!(
                "{}\n\n{}",
                color::bold_green(&format!("Added job #{job_id}")),
                heading(&job.title, &job.company)
            );
            CommandResult::success(render::panel(
                "Job Added",
                &body,
                Style::new().fg(Color::LightGreen),
            ))
        }
        Err(e) => failure("add", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;

    #[test]
    fn adds_job_and_prints_panel() {
        let fx = Fixture::new();
        let result = fx.run(&[
            "add",
            "Acme",
            "Rust Engineer",
            "-u",
            "https://www.linkedin.com/jobs/view/1",
            "--ai",
        ]);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("Job Added"));
        assert!(result.stdout.contains("Added job #1"));
        assert!(result.stdout.contains("Rust Engineer at Acme"));

        let job = fx.store.get_job(1).unwrap().unwrap();
        assert_eq!(job.status, "interested");
        assert_eq!(job.source.as_str(), "ai");
        assert_eq!(
            job.posting_url.as_deref(),
            Some("https://www.linkedin.com/jobs/view/1")
        );
    }

    #[test]
    fn short_flags_fill_optional_fields() {
        let fx = Fixture::new();
        fx.run(&["add", "Globex", "SRE", "-l", "Remote", "-s", "$150k", "-d", "On-call"]);
        let job = fx.store.get_job(1).unwrap().unwrap();
        assert_eq!(job.location.as_deref(), Some("Remote"));
        assert_eq!(job.salary.as_deref(), Some("$150k"));
        assert_eq!(job.description.as_deref(), Some("On-call"));
        assert_eq!(job.source.as_str(), "manual");
    }
}
