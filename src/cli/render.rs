//! 端末出力の部品（枠付きパネル・テーブル・Markdown）

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::{NOTHING, UTF8_FULL};
use comfy_table::{Attribute, Cell, Color as CellColor, ContentArrangement, Table};
use nu_ansi_term::Style;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_width::UnicodeWidthStr;

use super::color;
use crate::storage::JobStatus;

static ANSI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("valid ansi pattern"));

/// ANSI エスケープを除いた表示幅（全角文字は 2 桁）
fn visible_width(text: &str) -> usize {
    ANSI.replace_all(text, "").width()
}

/// タイトル付きの角丸枠でテキストを囲む。
///
/// ```text
/// ╭─ Job Added ──────────╮
/// │ Added job #1         │
/// ╰──────────────────────╯
/// ```
pub fn panel(title: &str, body: &str, border: Style) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let inner = lines
        .iter()
        .map(|line| visible_width(line))
        .chain(std::iter::once(title.width() + 3))
        .max()
        .unwrap_or(0);

    let title_fill = inner.saturating_sub(title.width() + 1);
    let mut out = String::new();
    out.push_str(&color::paint(border, "╭─ "));
    out.push_str(&color::bold(title));
    out.push_str(&color::paint(border, &format!(" {}╮", "─".repeat(title_fill))));
    out.push('\n');

    for line in &lines {
        let pad = inner - visible_width(line);
        out.push_str(&color::paint(border, "│"));
        out.push(' ');
        out.push_str(line);
        out.push_str(&" ".repeat(pad));
        out.push(' ');
        out.push_str(&color::paint(border, "│"));
        out.push('\n');
    }

    out.push_str(&color::paint(border, &format!("╰{}╯", "─".repeat(inner + 2))));
    out.push('\n');
    out
}

/// ヘッダー付きの角丸テーブル
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(CellColor::Magenta).add_attribute(Attribute::Bold)),
        );
    apply_styling(&mut table);
    table
}

/// 罫線もヘッダーも無いテーブル（タイムライン・集計用）
pub fn plain_table() -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);
    apply_styling(&mut table);
    table
}

fn apply_styling(table: &mut Table) {
    if color::enabled() {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }
}

/// ステータスのセル（色付き）
pub fn status_cell(status: &str) -> Cell {
    let cell = Cell::new(status);
    match status.parse::<JobStatus>().ok() {
        Some(JobStatus::Interested) => cell.fg(CellColor::Cyan),
        Some(JobStatus::Applied) => cell.fg(CellColor::Yellow),
        Some(JobStatus::Interviewing) => cell.fg(CellColor::Blue),
        Some(JobStatus::Offered) => cell.fg(CellColor::Green),
        Some(JobStatus::Rejected) => cell.fg(CellColor::Red),
        Some(JobStatus::Withdrawn | JobStatus::Ghosted) => cell.fg(CellColor::DarkGrey),
        None => cell,
    }
}

/// Markdown を端末向けに整形する。色が無効なら原文をそのまま返す。
pub fn markdown(text: &str) -> String {
    if color::enabled() {
        termimad::MadSkin::default().term_text(text).to_string()
    } else {
        text.to_string()
    }
}
