//! `job` のサブコマンド
//!
//! 各サブコマンドは clap の `Args` と `execute` 関数を持ち、[`CommandResult`] を返す。
//! 出力は main でまとめて表示するので、ここでは文字列を組み立てるだけにする。

mod add;
mod app_url;
mod apply;
mod delete;
mod interview;
mod list;
mod playbook;
mod report;
mod response;
mod scan;
mod search;
mod show;
mod status;
mod update;

use std::io::{self, BufRead, Write};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::cli::color;
use crate::config::JobLogConfig;
use crate::storage::{Job, JobNotFound, JobStore};

/// 成功
pub const EXIT_OK: i32 = 0;
/// 失敗（ジョブが無い、操作を拒否した等）
pub const EXIT_FAILURE: i32 = 1;
/// 引数エラー
pub const EXIT_USAGE: i32 = 2;

/// コマンド実行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// 標準出力に出す内容
    pub stdout: String,
    /// 標準エラー出力に出す内容
    pub stderr: String,
    /// 終了コード (0 = 成功)
    pub exit_code: i32,
}

impl CommandResult {
    /// 成功結果を返すヘルパー
    pub fn success(stdout: String) -> Self {
        Self {
            stdout,
            stderr: String::new(),
            exit_code: EXIT_OK,
        }
    }

    /// エラー結果を返すヘルパー
    pub fn error(stderr: String, exit_code: i32) -> Self {
        Self {
            stdout: String::new(),
            stderr,
            exit_code,
        }
    }
}

/// コマンドから参照する共有状態
pub struct Context<'a> {
    pub store: &'a JobStore,
    pub config: &'a JobLogConfig,
}

#[derive(Parser, Debug)]
#[command(
    name = "job",
    version,
    about = "Track job applications from the terminal",
    long_about = "Track job applications in a local SQLite database and reconcile them with \
                  exported email."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new job you're interested in
    Add(add::AddArgs),
    /// Record that you applied to a job
    Apply(apply::ApplyArgs),
    /// Set the application tracking URL for a job
    #[command(name = "app-url")]
    AppUrl(app_url::AppUrlArgs),
    /// Update fields on an existing job
    Update(update::UpdateArgs),
    /// Delete a job and all its events
    Delete(delete::DeleteArgs),
    /// Record a response from a company
    Response(response::ResponseArgs),
    /// Add interview notes for a job
    Interview(interview::InterviewArgs),
    /// Update the status of a job
    Status(status::StatusArgs),
    /// List all tracked jobs
    List(list::ListArgs),
    /// Search for jobs by company or title
    Search(search::SearchArgs),
    /// Show detailed information about a job
    Show(show::ShowArgs),
    /// Show activity report for the last N days
    Report(report::ReportArgs),
    /// Scan exported email and reconcile it with the tracker
    Scan(scan::ScanArgs),
    /// Print the instructions for an AI agent working with your mailbox
    Playbook,
}

/// clap の `try_parse_from` を使って引数をパースする。
///
/// - パース成功 → `Ok(Cli)`
/// - `--help` / `--version` → `Err(CommandResult::success(...))`
/// - 引数エラー → `Err(CommandResult::error(..., 2))`
pub fn parse_args<I, T>(args: I) -> Result<Cli, CommandResult>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let msg = e.to_string();
        if e.use_stderr() {
            CommandResult::error(msg, EXIT_USAGE)
        } else {
            CommandResult::success(msg)
        }
    })
}

/// サブコマンドを振り分ける。
pub fn dispatch(ctx: &Context, command: Command) -> CommandResult {
    match command {
        Command::Add(args) => add::execute(ctx, args),
        Command::Apply(args) => apply::execute(ctx, args),
        Command::AppUrl(args) => app_url::execute(ctx, args),
        Command::Update(args) => update::execute(ctx, args),
        Command::Delete(args) => delete::execute(ctx, args, &mut confirm_on_terminal),
        Command::Response(args) => response::execute(ctx, args),
        Command::Interview(args) => interview::execute(ctx, args),
        Command::Status(args) => status::execute(ctx, args),
        Command::List(args) => list::execute(ctx, args),
        Command::Search(args) => search::execute(ctx, args),
        Command::Show(args) => show::execute(ctx, args),
        Command::Report(args) => report::execute(ctx, args),
        Command::Scan(args) => scan::execute(ctx, args),
        Command::Playbook => playbook::execute(),
    }
}

/// `YYYY-MM-DD` 形式の日付をパースする（clap の value_parser 用）。
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}' (expected YYYY-MM-DD)"))
}

/// エラーを表示用の結果に変換する。
/// ジョブが見つからない場合は `Job #N not found` だけを表示する。
fn failure(command: &str, err: anyhow::Error) -> CommandResult {
    if let Some(not_found) = err.downcast_ref::<JobNotFound>() {
        return CommandResult::error(format!("{}\n", color::red(&not_found.to_string())), EXIT_FAILURE);
    }
    warn!(command, error = %format!("{err:#}"), "Command failed");
    CommandResult::error(
        format!("{} {err:#}\n", color::bold_red("job: error:")),
        EXIT_FAILURE,
    )
}

/// ジョブを取得する。存在しなければ `JobNotFound` エラー。
fn require_job(ctx: &Context, job_id: i64) -> anyhow::Result<Job> {
    ctx.store
        .get_job(job_id)?
        .ok_or_else(|| JobNotFound(job_id).into())
}

/// パネル本文によく出る「<title> at <company>」
fn heading(title: &str, company: &str) -> String {
    format!("{} at {}", color::bold(title), color::cyan(company))
}

/// `--json` 出力用
fn to_json<T: serde::Serialize>(value: &T) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// 端末で `[y/N]` の確認を取る。`y` / `yes` のときだけ `true`。
fn confirm_on_terminal(question: &str) -> bool {
    eprint!("{question} [y/N]: ");
    let _ = io::stderr().flush();

    let mut input = String::new();
    match io::stdin().lock().read_line(&mut input) {
        Ok(_) => is_yes(&input),
        Err(_) => false,
    }
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use super::{dispatch, parse_args, Command, CommandResult, Context};
    use crate::config::JobLogConfig;
    use crate::storage::{JobStore, NewJob};

    pub struct Fixture {
        pub store: JobStore,
        pub config: JobLogConfig,
        _tmp: TempDir,
    }

    impl Fixture {
        pub fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let store = JobStore::open_at(tmp.path().to_path_buf()).unwrap();
            Self {
                store,
                config: JobLogConfig::default(),
                _tmp: tmp,
            }
        }

        pub fn ctx(&self) -> Context<'_> {
            Context {
                store: &self.store,
                config: &self.config,
            }
        }

        /// `job <argv...>` を実行する
        pub fn run(&self, argv: &[&str]) -> CommandResult {
            dispatch(&self.ctx(), command(argv))
        }

        pub fn add(&self, company: &str, title: &str) -> i64 {
            self.store
                .add_job(&NewJob {
                    company: company.to_string(),
                    title: title.to_string(),
                    ..NewJob::default()
                })
                .unwrap()
        }
    }

    pub fn command(argv: &[&str]) -> Command {
        parse_args(std::iter::once("job").chain(argv.iter().copied()))
            .unwrap()
            .command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = parse_args(["job", "add", "Acme", "Rust Engineer", "--ai"]).unwrap();
        assert!(matches!(cli.command, Command::Add(_)));

        let cli = parse_args(["job", "app-url", "3", "https://example.com"]).unwrap();
        assert!(matches!(cli.command, Command::AppUrl(_)));
    }

    #[test]
    fn invalid_date_is_usage_error() {
        let err = parse_args(["job", "apply", "1", "--date", "2024-13-01"]).unwrap_err();
        assert_eq!(err.exit_code, EXIT_USAGE);
        assert!(err.stderr.contains("YYYY-MM-DD"));
    }

    #[test]
    fn unknown_status_is_usage_error() {
        let err = parse_args(["job", "status", "1", "hired"]).unwrap_err();
        assert_eq!(err.exit_code, EXIT_USAGE);
        assert!(err.stderr.contains("interested"));
    }

    #[test]
    fn help_is_not_an_error() {
        let result = parse_args(["job", "--help"]).unwrap_err();
        assert_eq!(result.exit_code, EXIT_OK);
        assert!(result.stdout.contains("Usage"));
    }

    #[test]
    fn parse_date_accepts_iso_dates() {
        assert_eq!(
            parse_date("2024-03-05"),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())
        );
        assert!(parse_date("03/05/2024").is_err());
    }

    #[test]
    fn not_found_maps_to_plain_message() {
        let result = failure("show", JobNotFound(42).into());
        assert_eq!(result.exit_code, EXIT_FAILURE);
        assert_eq!(result.stderr, "Job #42 not found\n");
    }

    #[test]
    fn other_errors_are_prefixed() {
        let result = failure("scan", anyhow::anyhow!("boom"));
        assert_eq!(result.stderr, "job: error: boom\n");
    }

    #[test]
    fn yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("no"));
    }
}
