use clap::Args;
use comfy_table::{Attribute, Cell, Color as CellColor};
use nu_ansi_term::{Color, Style};

use super::list::source_cell;
use super::{failure, CommandResult, Context};
use crate::cli::{color, render};
use crate::storage::{date_part, Activity, EventType};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Number of days to include in report (default from config, 7)
    #[arg(short, long)]
    pub days: Option<u32>,
}

/// report: 直近 N 日の集計・登録ジョブ・イベントを表示する。
pub(super) fn execute(ctx: &Context, args: ReportArgs) -> CommandResult {
    let days = args.days.unwrap_or(ctx.config.report.days);
    match ctx.store.get_activity(days) {
        Ok(activity) => CommandResult::success(render_report(&activity)),
        Err(e) => failure("report", e),
    }
}

fn render_report(activity: &Activity) -> String {
    let mut out = format!(
        "\n{}\n\n",
        color::bold(&format!("Activity Report - Last {} Days", activity.days))
    );

    let stats = [
        ("Jobs Added", color::cyan(&activity.jobs_added.len().to_string())),
        (
            "Applications Sent",
            color::yellow(&activity.count(EventType::Applied).to_string()),
        ),
        (
            "Responses",
            color::blue(&activity.count(EventType::Response).to_string()),
        ),
        (
            "Interviews",
            color::blue(&activity.count(EventType::Interview).to_string()),
        ),
        (
            "Offers",
            color::green(&activity.count(EventType::Offer).to_string()),
        ),
        (
            "Rejections",
            color::red(&activity.count(EventType::Rejected).to_string()),
        ),
    ];
    let summary = stats
        .iter()
        .map(|(label, value)| format!("{:<20}{}", color::dim(label), value))
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&render::panel(
        "Summary",
        &summary,
        Style::new().fg(Color::LightGreen),
    ));

    if !activity.jobs_added.is_empty() {
        out.push_str(&format!("\n{}\n", color::bold("Jobs Added")));
        let mut table = render::table(&["ID", "Company", "Title", "Status", "Src", "Added"]);
        for job in &activity.jobs_added {
            table.add_row(vec![
                Cell::new(job.id),
                Cell::new(&job.company).fg(CellColor::Cyan),
                Cell::new(&job.title),
                render::status_cell(&job.status),
                source_cell(job.source),
                Cell::new(date_part(&job.created_at)),
            ]);
        }
        out.push_str(&format!("{table}\n"));
    }

    // 登録は上の表で見せるので、タイムラインからは除く
    let other_events: Vec<_> = activity
        .events
        .iter()
        .filter(|e| e.event_type != EventType::Added)
        .collect();
    if !other_events.is_empty() {
        out.push_str(&format!("\n{}\n", color::bold("Activity Timeline")));
        let mut table = render::table(&["Date", "Event", "Company", "Title", "Notes"]);
        for event in &other_events {
            table.add_row(vec![
                Cell::new(date_part(&event.event_date)),
                event_cell(event.event_type),
                Cell::new(&event.company).fg(CellColor::Cyan),
                Cell::new(&event.title),
                Cell::new(event.notes.as_deref().unwrap_or("-")),
            ]);
        }
        out.push_str(&format!("{table}\n"));
    }

    if activity.jobs_added.is_empty() && other_events.is_empty() {
        out.push_str(&format!("{}\n", color::dim("No activity in this period.")));
    }
    out
}

fn event_cell(event_type: EventType) -> Cell {
    let cell = Cell::new(event_type);
    match event_type {
        EventType::Applied => cell.fg(CellColor::Yellow),
        EventType::Interview | EventType::Response => cell.fg(CellColor::Blue),
        EventType::Rejected => cell.fg(CellColor::Red),
        EventType::Offer => cell.fg(CellColor::Green),
        EventType::Withdrawn => cell.add_attribute(Attribute::Dim),
        EventType::Added | EventType::Note => cell,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use crate::storage::{Application, JobStatus};
    use chrono::NaiveDate;

    /// Summary パネルの行から数値を取り出す
    fn stat(out: &str, label: &str) -> u32 {
        out.lines()
            .find(|line| line.contains(label))
            .and_then(|line| line.split_whitespace().find_map(|w| w.parse().ok()))
            .unwrap()
    }

    #[test]
    fn empty_period() {
        let fx = Fixture::new();
        let out = fx.run(&["report"]).stdout;
        assert!(out.contains("Activity Report - Last 7 Days"));
        assert!(out.contains("No activity in this period."));
    }

    #[test]
    fn counts_recent_activity() {
        let fx = Fixture::new();
        let a = fx.add("Acme", "Rust Engineer");
        let b = fx.add("Globex", "SRE");
        fx.store.apply_to_job(a, &Application::default()).unwrap();
        fx.store.add_response(b, false, Some("Filled")).unwrap();
        fx.store.update_status(a, JobStatus::Offered, None).unwrap();

        let out = fx.run(&["report", "-d", "3"]).stdout;
        assert!(out.contains("Last 3 Days"));
        assert!(out.contains("Jobs Added"));
        assert!(out.contains("Activity Timeline"));
        assert!(out.contains("Filled"));
        assert!(!out.contains("No activity"));

        assert_eq!(stat(&out, "Applications Sent"), 1);
        assert_eq!(stat(&out, "Rejections"), 1);
        assert_eq!(stat(&out, "Offers"), 1);
        assert_eq!(stat(&out, "Interviews"), 0);
    }

    #[test]
    fn old_events_fall_outside_window() {
        let fx = Fixture::new();
        let id = fx.add("Acme", "Rust Engineer");
        fx.store
            .apply_to_job(
                id,
                &Application {
                    applied_on: NaiveDate::from_ymd_opt(2020, 1, 1),
                    ..Application::default()
                },
            )
            .unwrap();

        let out = fx.run(&["report"]).stdout;
        assert!(out.contains("Jobs Added"));
        assert!(!out.contains("Activity Timeline"));
    }

    #[test]
    fn very_large_window_reports_everything() {
        let fx = Fixture::new();
        fx.add("Acme", "Rust Engineer");

        let result = fx.run(&["report", "--days", "4000000000"]);
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("Last 4000000000 Days"));
        assert!(result.stdout.contains("Acme"));
    }

    #[test]
    fn days_default_comes_from_config() {
        let mut fx = Fixture::new();
        fx.config.report.days = 30;
        let out = fx.run(&["report"]).stdout;
        assert!(out.contains("Last 30 Days"));
    }
}
