use clap::Args;
use comfy_table::{Attribute, Cell};
use serde_json::json;

use super::{failure, require_job, to_json, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::{date_time_part, Event, Job, Source};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Job ID to show details for
    pub job_id: i64,
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

pub(super) fn execute(ctx: &Context, args: ShowArgs) -> CommandResult {
    let run = || -> anyhow::Result<String> {
        let job = require_job(ctx, args.job_id)?;
        let events = ctx.store.get_events(job.id)?;
        if args.json {
            return to_json(&json!({ "job": job, "events": events }));
        }
        Ok(render_job(&job, &events))
    };

    match run() {
        Ok(out) => CommandResult::success(out),
        Err(e) => failure("show", e),
    }
}

fn render_job(job: &Job, events: &[Event]) -> String {
    let mut details = vec![
        color::bold(&job.title),
        color::cyan(&format!("at {}", job.company)),
        String::new(),
    ];
    if let Some(location) = &job.location {
        details.push(format!("Location: {location}"));
    }
    if let Some(salary) = &job.salary {
        details.push(format!("Salary: {salary}"));
    }
    if let Some(url) = &job.posting_url {
        details.push(format!("{} {}", color::dim("Posting:"), color::link(url)));
    }
    if let Some(url) = &job.application_url {
        details.push(format!("{} {}", color::dim("Application:"), color::link(url)));
    }
    if let Some(description) = &job.description {
        details.push(String::new());
        details.extend(description.lines().map(str::to_string));
    }

    details.push(String::new());
    let mut status_line = format!("{} {}", color::dim("Status:"), color::status(&job.status));
    if job.source == Source::Ai {
        status_line.push_str(&format!("  {}", color::magenta("(Added by AI)")));
    }
    details.push(status_line);

    let mut out = render::panel(
        &format!("Job #{}", job.id),
        &details.join("\n"),
        color::status_style(job.status()),
    );

    if !events.is_empty() {
        out.push('\n');
        out.push_str(&color::bold("Timeline"));
        out.push('\n');

        let mut timeline = render::plain_table();
        for event in events {
            let mut parts = Vec::new();
            if let Some(notes) = &event.notes {
                parts.push(notes.clone());
            }
            if let Some(resume) = &event.resume_path {
                parts.push(format!("Resume: {resume}"));
            }
            if let Some(cover) = &event.cover_letter_path {
                parts.push(format!("Cover Letter: {cover}"));
            }
            let details = if parts.is_empty() {
                "-".to_string()
            } else {
                parts.join("\n")
            };

            timeline.add_row(vec![
                Cell::new(date_time_part(&event.event_date)),
                Cell::new(event.event_type).add_attribute(Attribute::Bold),
                Cell::new(details),
            ]);
        }
        out.push_str(&timeline.to_string());
        out.push('\n');
    }
    out
}
