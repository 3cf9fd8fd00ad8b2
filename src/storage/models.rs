//! トラッカーが扱うレコード型
//!
//! DB の行と 1:1 に対応する構造体と、ステータス・イベント種別の列挙型。
//! 列挙型は DB には小文字の文字列として保存する。

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// 応募のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// 保存しただけで未応募
    Interested,
    /// 応募済み
    Applied,
    /// 選考中（面接プロセス）
    Interviewing,
    /// オファーあり
    Offered,
    /// 不採用
    Rejected,
    /// 辞退
    Withdrawn,
    /// 応募後に音沙汰なし
    Ghosted,
}

impl JobStatus {
    pub const ALL: [JobStatus; 7] = [
        JobStatus::Interested,
        JobStatus::Applied,
        JobStatus::Interviewing,
        JobStatus::Offered,
        JobStatus::Rejected,
        JobStatus::Withdrawn,
        JobStatus::Ghosted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Interested => "interested",
            JobStatus::Applied => "applied",
            JobStatus::Interviewing => "interviewing",
            JobStatus::Offered => "offered",
            JobStatus::Rejected => "rejected",
            JobStatus::Withdrawn => "withdrawn",
            JobStatus::Ghosted => "ghosted",
        }
    }

    /// ステータス変更時に記録するイベント種別。
    pub fn event_type(&self) -> EventType {
        match self {
            JobStatus::Offered => EventType::Offer,
            JobStatus::Rejected => EventType::Rejected,
            JobStatus::Withdrawn => EventType::Withdrawn,
            _ => EventType::Note,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    /// 大文字小文字を区別しない。`new` は `interested` の別名として受け付ける。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        if lower == "new" {
            return Ok(JobStatus::Interested);
        }
        JobStatus::ALL
            .iter()
            .find(|status| status.as_str() == lower)
            .copied()
            .ok_or_else(|| {
                let valid: Vec<&str> = JobStatus::ALL.iter().map(|s| s.as_str()).collect();
                format!("invalid status '{s}' (expected one of: {})", valid.join(", "))
            })
    }
}

/// タイムラインのイベント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Added,
    Applied,
    Response,
    Interview,
    Offer,
    Rejected,
    Withdrawn,
    Note,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Added => "added",
            EventType::Applied => "applied",
            EventType::Response => "response",
            EventType::Interview => "interview",
            EventType::Offer => "offer",
            EventType::Rejected => "rejected",
            EventType::Withdrawn => "withdrawn",
            EventType::Note => "note",
        }
    }

    /// DB の文字列から復元する。未知の値は `Note` として扱う。
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "added" => EventType::Added,
            "applied" => EventType::Applied,
            "response" => EventType::Response,
            "interview" => EventType::Interview,
            "offer" => EventType::Offer,
            "rejected" => EventType::Rejected,
            "withdrawn" => EventType::Withdrawn,
            _ => EventType::Note,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ジョブの登録元
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Manual,
    /// メールスキャン等で AI / 自動処理が登録したもの
    Ai,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Manual => "manual",
            Source::Ai => "ai",
        }
    }

    pub fn parse_lossy(s: &str) -> Self {
        if s == "ai" {
            Source::Ai
        } else {
            Source::Manual
        }
    }
}

/// 追跡中のジョブ 1 件
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: i64,
    pub company: String,
    pub title: String,
    pub posting_url: Option<String>,
    pub application_url: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    /// DB 上の値が未知の場合も表示できるよう文字列のまま保持する
    pub status: String,
    pub source: Source,
    pub created_at: String,
    pub updated_at: String,
    /// 最初の applied イベントの日時（`list_jobs` のみ設定）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<String>,
}

impl Job {
    pub fn status(&self) -> Option<JobStatus> {
        self.status.parse().ok()
    }
}

/// `add_job` の入力
#[derive(Debug, Clone, Default)]
pub struct NewJob {
    pub company: String,
    pub title: String,
    pub posting_url: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub ai: bool,
}

/// `apply_to_job` の入力
#[derive(Debug, Clone, Default)]
pub struct Application {
    pub resume_path: Option<String>,
    pub cover_letter_path: Option<String>,
    pub application_url: Option<String>,
    pub notes: Option<String>,
    pub applied_on: Option<chrono::NaiveDate>,
}

/// タイムラインのイベント 1 件
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: i64,
    pub job_id: i64,
    pub event_type: EventType,
    pub event_date: String,
    pub notes: Option<String>,
    pub resume_path: Option<String>,
    pub cover_letter_path: Option<String>,
}

/// レポート用: 期間内のイベントと対象ジョブの会社名・職種
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEvent {
    pub id: i64,
    pub job_id: i64,
    pub event_type: EventType,
    pub event_date: String,
    pub notes: Option<String>,
    pub company: String,
    pub title: String,
}

/// 直近 N 日のアクティビティ集計
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub days: u32,
    pub jobs_added: Vec<Job>,
    /// 新しい順
    pub events: Vec<ActivityEvent>,
    pub summary: BTreeMap<EventType, usize>,
}

impl Activity {
    pub fn count(&self, event_type: EventType) -> usize {
        self.summary.get(&event_type).copied().unwrap_or(0)
    }
}
