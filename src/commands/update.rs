use chrono::NaiveDate;
use clap::Args;
use nu_ansi_term::{Color, Style};

use super::{failure, heading, parse_date, require_job, CommandResult, Context, EXIT_FAILURE};
use crate::cli::{color, render};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Job ID
    pub job_id: i64,
    /// Update applied date (YYYY-MM-DD)
    #[arg(short = 'a', long = "applied", value_parser = parse_date)]
    pub applied_date: Option<NaiveDate>,
    /// Update location
    #[arg(short, long)]
    pub location: Option<String>,
    /// Update job posting URL (e.g. LinkedIn)
    #[arg(short, long)]
    pub posting_url: Option<String>,
}

/// update: 勤務地・求人 URL・応募日を更新する。
/// 何も指定されていない場合と、応募日の変更で applied イベントが無い場合はエラー。
pub(super) fn execute(ctx: &Context, args: UpdateArgs) -> CommandResult {
    let job = match require_job(ctx, args.job_id) {
        Ok(job) => job,
        Err(e) => return failure("update", e),
    };

    if args.applied_date.is_none() && args.location.is_none() && args.posting_url.is_none() {
        return CommandResult::error(
            format!(
                "{}\n",
                color::yellow("No updates specified. Use --applied, --location, or --posting-url.")
            ),
            EXIT_FAILURE,
        );
    }

    let run = || -> anyhow::Result<Result<Vec<String>, CommandResult>> {
        let mut updates = Vec::new();

        if args.location.is_some() || args.posting_url.is_some() {
            ctx.store
                .update_job(job.id, args.location.as_deref(), args.posting_url.as_deref())?;
        }
        if let Some(location) = &args.location {
            updates.push(format!("Location: {}", color::yellow(location)));
        }
        if let Some(url) = &args.posting_url {
            updates.push(format!("Posting URL: {}", color::link(url)));
        }

        if let Some(date) = args.applied_date {
            if !ctx.store.update_applied_date(job.id, date)? {
                return Ok(Err(CommandResult::error(
                    format!(
                        "{}\n",
                        color::red(&format!(
                            "Job #{} has no applied event to update. Use 'apply' first.",
                            job.id
                        ))
                    ),
                    EXIT_FAILURE,
                )));
            }
            updates.push(format!(
                "Applied date: {}",
                color::yellow(&date.format("%Y-%m-%d").to_string())
            ));
        }
        Ok(Ok(updates))
    };

    match run() {
        Ok(Ok(updates)) => {
            let body = format!(
                "Updated job #{}\n\n{}\n{}",
                job.id,
                heading(&job.title, &job.company),
                updates.join("\n")
            );
            CommandResult::success(render::panel(
                "Job Updated",
                &body,
                Style::new().fg(Color::LightGreen),
            ))
        }
        Ok(Err(refused)) => refused,
        Err(e) => failure("update", e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use crate::storage::{Application, EventType};

    #[test]
    fn nothing_to_update_is_refused() {
        let fx = Fixture::new();
        let id = fx.add("Acme", "Rust Engineer");
        let result = fx.run(&["update", &id.to_string()]);
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("No updates specified"));
    }

    #[test]
    fn updates_location_and_posting_url() {
        let fx = Fixture::new();
        let id = fx.add("Acme", "Rust Engineer");
        let result = fx.run(&[
            "update",
            &id.to_string(),
            "-l",
            "Berlin",
            "-p",
            "https://www.linkedin.com/jobs/view/9",
        ]);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("Location: Berlin"));

        let job = fx.store.get_job(id).unwrap().unwrap();
        assert_eq!(job.location.as_deref(), Some("Berlin"));
        assert_eq!(
            job.posting_url.as_deref(),
            Some("https://www.linkedin.com/jobs/view/9")
        );
    }

    #[test]
    fn applied_date_requires_applied_event() {
        let fx = Fixture::new();
        let id = fx.add("Acme", "Rust Engineer");
        let result = fx.run(&["update", &id.to_string(), "--applied", "2024-01-02"]);
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("Use 'apply' first"));

        fx.store.apply_to_job(id, &Application::default()).unwrap();
        let result = fx.run(&["update", &id.to_string(), "-a", "2024-01-02"]);
        assert_eq!(result.exit_code, 0);
        let events = fx.store.get_events(id).unwrap();
        let applied = events
            .iter()
            .find(|e| e.event_type == EventType::Applied)
            .unwrap();
        assert_eq!(applied.event_date, "2024-01-02T00:00:00Z");
    }

    #[test]
    fn missing_job_is_reported_before_other_checks() {
        let fx = Fixture::new();
        let result = fx.run(&["update", "7"]);
        assert_eq!(result.stderr, "Job #7 not found\n");
    }
}
