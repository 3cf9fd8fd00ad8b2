use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use nu_ansi_term::{Color, Style};

use super::{failure, heading, parse_date, require_job, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::Application;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Job ID to mark as applied
    pub job_id: i64,
    /// Path to resume file
    #[arg(short, long)]
    pub resume: Option<PathBuf>,
    /// Path to cover letter
    #[arg(short, long)]
    pub cover_letter: Option<PathBuf>,
    /// Application tracking URL (e.g. Workday)
    #[arg(short, long)]
    pub app_url: Option<String>,
    /// Application notes
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Date applied (YYYY-MM-DD), defaults to today
    #[arg(short, long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,
}

/// apply: 応募を記録する。履歴書・カバーレターは絶対パスで保存する。
pub(super) fn execute(ctx: &Context, args: ApplyArgs) -> CommandResult {
    let run = || -> anyhow::Result<String> {
        let job = require_job(ctx, args.job_id)?;
        let application = Application {
            resume_path: args.resume.as_deref().map(absolute_path),
            cover_letter_path: args.cover_letter.as_deref().map(absolute_path),
            application_url: args.app_url.clone(),
            notes: args.notes.clone(),
            applied_on: args.date,
        };
        ctx.store.apply_to_job(job.id, &application)?;

        let body = format!(
            "{}\n\n{}",
            color::bold_yellow(&format!("Applied to job #{}", job.id)),
            heading(&job.title, &job.company)
        );
        Ok(render::panel(
            "Application Recorded",
            &body,
            Style::new().fg(Color::Yellow),
        ))
    };

    match run() {
        Ok(out) => CommandResult::success(out),
        Err(e) => failure("apply", e),
    }
}

/// 相対パスをカレントディレクトリ基準の絶対パスにする（ファイルの存在は問わない）。
fn absolute_path(path: &Path) -> String {
    if path.is_absolute() {
        return path.display().to_string();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
