use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};

use nu_ansi_term::{Color, Style};

use crate::storage::{EventType, JobStatus};

/// 色付け有効フラグ。`init` を呼ぶまでは無効（テストではプレーンテキストになる）。
static ENABLED: AtomicBool = AtomicBool::new(false);

/// `NO_COLOR` が未設定で、stdout が端末のときだけ色を有効にする。
pub fn init() {
    let enabled = std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal();
    set_enabled(enabled);
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn paint(style: Style, text: &str) -> String {
    if enabled() {
        style.paint(text).to_string()
    } else {
        text.to_string()
    }
}

fn styled(color: Color, text: &str, is_bold: bool) -> String {
    let style = if is_bold {
        color.bold()
    } else {
        Style::new().fg(color)
    };
    paint(style, text)
}

pub fn red(text: &str) -> String {
    styled(Color::LightRed, text, false)
}

pub fn magenta(text: &str) -> String {
    styled(Color::Magenta, text, false)
}

pub fn green(text: &str) -> String {
    styled(Color::LightGreen, text, false)
}

pub fn yellow(text: &str) -> String {
    styled(Color::Yellow, text, false)
}

pub fn cyan(text: &str) -> String {
    styled(Color::Cyan, text, false)
}

pub fn blue(text: &str) -> String {
    styled(Color::LightBlue, text, false)
}

pub fn bold(text: &str) -> String {
    paint(Style::new().bold(), text)
}

pub fn dim(text: &str) -> String {
    paint(Style::new().dimmed(), text)
}

pub fn link(text: &str) -> String {
    paint(Style::new().fg(Color::LightBlue).underline(), text)
}

pub fn bold_red(text: &str) -> String {
    styled(Color::LightRed, text, true)
}

pub fn bold_green(text: &str) -> String {
    styled(Color::LightGreen, text, true)
}

pub fn bold_yellow(text: &str) -> String {
    styled(Color::Yellow, text, true)
}

pub fn bold_blue(text: &str) -> String {
    styled(Color::LightBlue, text, true)
}

/// ステータスごとの表示スタイル
pub fn status_style(status: Option<JobStatus>) -> Style {
    match status {
        Some(JobStatus::Interested) => Style::new().fg(Color::Cyan),
        Some(JobStatus::Applied) => Style::new().fg(Color::Yellow),
        Some(JobStatus::Interviewing) => Style::new().fg(Color::LightBlue),
        Some(JobStatus::Offered) => Style::new().fg(Color::LightGreen),
        Some(JobStatus::Rejected) => Style::new().fg(Color::LightRed),
        Some(JobStatus::Withdrawn) => Style::new().dimmed(),
        Some(JobStatus::Ghosted) => Style::new().fg(Color::Red).dimmed(),
        None => Style::new(),
    }
}

/// ステータス文字列を色付けする（未知の値はそのまま）
pub fn status(status: &str) -> String {
    paint(status_style(status.parse().ok()), status)
}

/// イベント種別の表示スタイル
pub fn event_style(event_type: EventType) -> Style {
    match event_type {
        EventType::Applied => Style::new().fg(Color::Yellow),
        EventType::Interview | EventType::Response => Style::new().fg(Color::LightBlue),
        EventType::Rejected => Style::new().fg(Color::LightRed),
        EventType::Offer => Style::new().fg(Color::LightGreen),
        EventType::Withdrawn => Style::new().dimmed(),
        EventType::Added | EventType::Note => Style::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // テストでは init を呼ばないので常にプレーンテキスト
    #[test]
    fn disabled_by_default_returns_plain_text() {
        assert!(!enabled());
        assert_eq!(red("error"), "error");
        assert_eq!(status("applied"), "applied");
        assert_eq!(link("https://example.com"), "https://example.com");
    }

    #[test]
    fn status_styles_follow_status() {
        assert_eq!(status_style(None), Style::new());
        assert_eq!(
            status_style(Some(JobStatus::Rejected)),
            Style::new().fg(Color::LightRed)
        );
        assert_eq!(
            event_style(EventType::Offer),
            Style::new().fg(Color::LightGreen)
        );
    }
}
