use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

use super::{failure, to_json, CommandResult, Context};
use crate::cli::color;
use crate::scan::ats::AtsDirectory;
use crate::scan::classifier::{Classification, EmailClassifier};
use crate::scan::extract::{extract, Extracted};
use crate::scan::mail::{self, MailMessage};
use crate::scan::reconcile::{Action, Reconciler};

/// この件数以上のときだけ進捗バーを出す
const PROGRESS_THRESHOLD: usize = 20;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Mail file or directory (.eml, .mbox or .json export)
    pub path: PathBuf,
    /// Apply the planned commands instead of only printing them
    #[arg(long)]
    pub commit: bool,
    /// Also process messages that were already scanned
    #[arg(long)]
    pub rescan: bool,
    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

/// スキャン結果全体
#[derive(Debug, Serialize)]
struct ScanReport {
    committed: bool,
    total: usize,
    already_scanned: usize,
    not_job_related: usize,
    items: Vec<ScanItem>,
}

/// 求人関連メール 1 通分の結果
#[derive(Debug, Serialize)]
struct ScanItem {
    message_key: String,
    subject: String,
    from: String,
    date: Option<String>,
    classification: Classification,
    extracted: Extracted,
    actions: Vec<Action>,
    commands: Vec<String>,
    /// `--commit` で操作したジョブ
    job_id: Option<i64>,
}

impl ScanItem {
    fn needs_user(&self) -> bool {
        self.actions
            .iter()
            .any(|a| matches!(a, Action::AskUser { .. }))
    }
}

/// scan: エクスポートされたメールを読み、トラッカーとの差分を計画（`--commit` なら実行）する。
pub(super) fn execute(ctx: &Context, args: ScanArgs) -> CommandResult {
    match run(ctx, &args) {
        Ok(report) if args.json => match to_json(&report) {
            Ok(json) => CommandResult::success(json),
            Err(e) => failure("scan", e),
        },
        Ok(report) => CommandResult::success(render_report(&report)),
        Err(e) => failure("scan", e),
    }
}

fn run(ctx: &Context, args: &ScanArgs) -> anyhow::Result<ScanReport> {
    let messages = mail::load_path(&args.path)?;
    let ats = AtsDirectory::new(&ctx.config.scan.ats_domains);
    let classifier = EmailClassifier::new(ats.clone(), &ctx.config.scan.ignore_senders);
    let reconciler = Reconciler::new(ctx.store, ctx.config.scan.min_confidence);

    info!(
        path = %args.path.display(),
        messages = messages.len(),
        commit = args.commit,
        rescan = args.rescan,
        "Scan started"
    );

    let progress = progress_bar(messages.len(), args.json);
    let mut report = ScanReport {
        committed: args.commit,
        total: messages.len(),
        already_scanned: 0,
        not_job_related: 0,
        items: Vec::new(),
    };

    for message in &messages {
        progress.inc(1);
        let key = message.key();
        if !args.rescan && ctx.store.is_scanned(&key)? {
            report.already_scanned += 1;
            continue;
        }

        let classification = classifier.classify(message);
        if !classification.kind.is_job_related() {
            report.not_job_related += 1;
            if args.commit {
                ctx.store
                    .mark_scanned(&key, classification.kind.as_str(), None)?;
            }
            continue;
        }

        let extracted = extract(message, &ats);
        let actions = reconciler.plan(&message.subject, &classification, &extracted)?;
        let mut item = new_item(key, message, classification, extracted, actions);

        // ユーザー確認が必要なものは記録せず、次回のスキャンでも再度出す
        if args.commit && !item.needs_user() {
            item.job_id = reconciler.execute(&item.actions)?;
            ctx.store.mark_scanned(
                &item.message_key,
                item.classification.kind.as_str(),
                item.job_id,
            )?;
        }
        debug!(subject = %item.subject, actions = item.actions.len(), "Message reconciled");
        report.items.push(item);
    }
    progress.finish_and_clear();

    info!(
        total = report.total,
        job_related = report.items.len(),
        already_scanned = report.already_scanned,
        "Scan finished"
    );
    Ok(report)
}

fn new_item(
    message_key: String,
    message: &MailMessage,
    classification: Classification,
    extracted: Extracted,
    actions: Vec<Action>,
) -> ScanItem {
    let commands = actions.iter().filter_map(Action::to_command_line).collect();
    ScanItem {
        message_key,
        subject: message.subject.clone(),
        from: message.from.clone(),
        date: message.received_on().map(|d| d.format("%Y-%m-%d").to_string()),
        classification,
        extracted,
        actions,
        commands,
        job_id: None,
    }
}

/// 件数が多く、端末に出力しているときだけ進捗バーを表示する。
fn progress_bar(len: usize, json: bool) -> ProgressBar {
    if json || len < PROGRESS_THRESHOLD || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::with_template("{spinner} Scanning mail {pos}/{len} {wide_bar}")
            .expect("Invalid progress template"),
    );
    bar
}

fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();
    out.push_str(&color::bold(&format!(
        "Scanned {} message(s): {} job-related, {} unrelated, {} already scanned",
        report.total,
        report.items.len(),
        report.not_job_related,
        report.already_scanned
    )));
    out.push_str("\n\n");

    for item in &report.items {
        let label = format!(
            "[{}/{}]",
            item.classification.kind.as_str(),
            item.classification.confidence.as_str()
        );
        out.push_str(&format!(
            "{} {} {}\n",
            color::magenta(&label),
            color::dim(item.date.as_deref().unwrap_or("----------")),
            item.subject
        ));

        let fields: Vec<String> = [
            ("company", item.extracted.company.as_deref()),
            ("title", item.extracted.title.as_deref()),
            ("app url", item.extracted.application_url.as_deref()),
        ]
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("{}: {v}", color::dim(name))))
        .collect();
        if !fields.is_empty() {
            out.push_str(&format!("  {}\n", fields.join("  ")));
        }

        for action in &item.actions {
            let line = match action {
                Action::AskUser { question } => format!("  {} {question}", color::yellow("?")),
                Action::Skip { reason } => format!("  {}", color::dim(&format!("- skip: {reason}"))),
                _ => match action.to_command_line() {
                    Some(command) => format!("  {} {command}", color::green("$")),
                    None => continue,
                },
            };
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    let writes: usize = report
        .items
        .iter()
        .flat_map(|item| item.actions.iter())
        .filter(|a| a.is_write())
        .count();
    let questions = report.items.iter().filter(|item| item.needs_user()).count();

    if report.committed {
        let applied: usize = report
            .items
            .iter()
            .filter(|item| item.job_id.is_some())
            .map(|item| item.actions.iter().filter(|a| a.is_write()).count())
            .sum();
        out.push_str(&color::green(&format!("Applied {applied} change(s).")));
    } else if writes > 0 {
        out.push_str(&color::yellow(&format!(
            "Dry run: {writes} change(s) planned, nothing written. Re-run with --commit to apply."
        )));
    } else {
        out.push_str(&color::dim("Nothing to change."));
    }
    out.push('\n');

    if questions > 0 {
        out.push_str(&color::yellow(&format!(
            "{questions} message(s) need your answer; they will be shown again on the next scan."
        )));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::super::test_support::Fixture;

    const CONFIRMATION: &str = "Message-ID: <1@acme.example>
From: Acme Careers <no-reply@acme.wd5.myworkday.com>
Subject: Thank you for applying to Acme Corporation!
Date: Tue, 01 Oct 2024 10:00:00 -0700
Content-Type: text/plain; charset=utf-8

Thank you for applying for the Senior Rust Engineer position.
Track your application at https://acme.wd5.myworkdayjobs.com/en-US/careers/userHome.
";

    const REJECTION: &str = "Message-ID: <2@acme.example>
From: Acme Careers <no-reply@acme.wd5.myworkday.com>
Subject: Your application to Acme Corporation
Date: Tue, 08 Oct 2024 09:00:00 -0700

Unfortunately, we have decided to move forward with other candidates for the Senior Rust Engineer position.
";

    const NEWSLETTER: &str = "Message-ID: <3@news.example>
From: Weekly Digest <digest@news.example>
Subject: This week in Rust
Date: Wed, 02 Oct 2024 08:00:00 +0000

Lots of crates were released.
";

    const VAGUE: &str = "Message-ID: <4@initech.example>
From: recruiting@initech.example
Subject: Update on your application
Date: Thu, 03 Oct 2024 08:00:00 +0000

Please log in to the portal to see the latest status.
";

    fn mail_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn path(dir: &TempDir) -> String {
        dir.path().display().to_string()
    }

    #[test]
    fn dry_run_prints_commands_and_writes_nothing() {
        let fx = Fixture::new();
        let dir = mail_dir(&[("a.eml", CONFIRMATION), ("b.eml", NEWSLETTER)]);

        let result = fx.run(&["scan", &path(&dir)]);
        assert_eq!(result.exit_code, 0, "{}", result.stderr);
        let out = result.stdout;
        assert!(out.contains("1 job-related, 1 unrelated"));
        assert!(out.contains("[confirmation/high]"));
        assert!(out.contains("$ job add 'Acme Corporation' 'Senior Rust Engineer' --ai"));
        assert!(out.contains("$ job apply <new> --date 2024-10-01 --app-url"));
        assert!(out.contains("Dry run"));

        assert!(fx.store.list_jobs(None).unwrap().is_empty());
        assert!(!fx.store.is_scanned(&crate::scan::mail::parse_eml(CONFIRMATION).key()).unwrap());
    }

    #[test]
    fn commit_applies_in_date_order_and_is_idempotent() {
        let fx = Fixture::new();
        // ファイル名順とは逆の日付順で処理されること
        let dir = mail_dir(&[("1-rejection.eml", REJECTION), ("2-confirmation.eml", CONFIRMATION)]);

        let result = fx.run(&["scan", &path(&dir), "--commit"]);
        assert_eq!(result.exit_code, 0, "{}", result.stderr);
        assert!(result.stdout.contains("Applied"));

        let jobs = fx.store.list_jobs(None).unwrap();
        assert_eq!(jobs.len(), 1);
        let job = &jobs[0];
        assert_eq!(job.company, "Acme Corporation");
        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.status, "rejected");
        assert_eq!(job.source.as_str(), "ai");
        assert_eq!(
            job.application_url.as_deref(),
            Some("https://acme.wd5.myworkdayjobs.com/en-US/careers/userHome")
        );

        let again = fx.run(&["scan", &path(&dir), "--commit", "--json"]);
        let report: serde_json::Value = serde_json::from_str(&again.stdout).unwrap();
        assert_eq!(report["already_scanned"], 2);
        assert_eq!(report["items"].as_array().unwrap().len(), 0);
        assert_eq!(fx.store.list_jobs(None).unwrap().len(), 1);
    }

    #[test]
    fn low_confidence_messages_are_left_for_the_user() {
        let fx = Fixture::new();
        let dir = mail_dir(&[("vague.eml", VAGUE)]);

        let out = fx.run(&["scan", &path(&dir), "--commit"]).stdout;
        assert!(out.contains("? Is \"Update on your application\" a rejection email?"));
        assert!(out.contains("need your answer"));
        assert!(fx.store.list_jobs(None).unwrap().is_empty());
        assert!(!fx.store.is_scanned(&crate::scan::mail::parse_eml(VAGUE).key()).unwrap());
    }

    #[test]
    fn json_report_lists_actions_and_commands() {
        let fx = Fixture::new();
        let dir = mail_dir(&[("a.eml", CONFIRMATION)]);

        let out = fx.run(&["scan", &path(&dir), "--json"]).stdout;
        let report: serde_json::Value = serde_json::from_str(&out).unwrap();
        let item = &report["items"][0];
        assert_eq!(item["classification"]["kind"], "application_confirmation");
        assert_eq!(item["extracted"]["company"], "Acme Corporation");
        assert_eq!(item["actions"][0]["action"], "add");
        assert_eq!(item["actions"][1]["job"], serde_json::Value::Null);
        assert_eq!(item["commands"].as_array().unwrap().len(), 2);
        assert_eq!(report["committed"], false);
    }

    #[test]
    fn rescan_processes_messages_again() {
        let fx = Fixture::new();
        let dir = mail_dir(&[("a.eml", CONFIRMATION)]);
        fx.run(&["scan", &path(&dir), "--commit"]);

        let out = fx.run(&["scan", &path(&dir), "--rescan"]).stdout;
        assert!(out.contains("skip: job #1 is already applied"));
    }

    #[test]
    fn missing_path_is_an_error() {
        let fx = Fixture::new();
        let result = fx.run(&["scan", "/nonexistent/mail.eml"]);
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.starts_with("job: error:"));
    }
}
