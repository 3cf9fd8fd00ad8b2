pub mod activity;
pub mod jobs;
pub mod models;
pub mod scanned;

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use tracing::debug;

use crate::config::JobLogConfig;

pub use models::{
    Activity, ActivityEvent, Application, Event, EventType, Job, JobStatus, NewJob, Source,
};

/// DB ファイル名
pub const DB_FILE_NAME: &str = "jobs.db";

/// 指定 ID のジョブが存在しないことを示すエラー。
/// `anyhow::Error` に包んで返し、コマンド層で downcast して終了コードに変換する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobNotFound(pub i64);

impl fmt::Display for JobNotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job #{} not found", self.0)
    }
}

impl std::error::Error for JobNotFound {}

/// 応募状況を永続化するストア。
/// SQLite に jobs / events / scanned_messages の 3 テーブルを持つ。
pub struct JobStore {
    conn: Connection,
    db_path: PathBuf,
}

impl JobStore {
    /// 設定からデータディレクトリを決定し、DB を開く。
    pub fn open(config: &JobLogConfig) -> Result<Self> {
        let data_dir = config.data_dir()?;
        Self::open_at(data_dir)
    }

    /// 指定されたディレクトリで JobStore を初期化する（テスト用にも使用）。
    pub fn open_at(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir).with_context(|| {
            format!("failed to create data directory: {}", data_dir.display())
        })?;

        let db_path = data_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open database: {}", db_path.display()))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("failed to enable foreign keys")?;

        Self::migrate(&conn)?;
        debug!(path = %db_path.display(), "JobStore opened");

        Ok(Self { conn, db_path })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// DB スキーマのマイグレーションを実行する（冪等）。
    fn migrate(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS jobs (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                company         TEXT    NOT NULL,
                title           TEXT    NOT NULL,
                posting_url     TEXT,
                application_url TEXT,
                location        TEXT,
                salary          TEXT,
                description     TEXT,
                status          TEXT    NOT NULL DEFAULT 'interested',
                source          TEXT    NOT NULL DEFAULT 'manual',
                created_at      TEXT    NOT NULL,
                updated_at      TEXT    NOT NULL
            );
            CREATE TABLE IF NOT EXISTS events (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                job_id            INTEGER NOT NULL REFERENCES jobs(id),
                event_type        TEXT    NOT NULL,
                event_date        TEXT    NOT NULL,
                notes             TEXT,
                resume_path       TEXT,
                cover_letter_path TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_events_job_id ON events(job_id);
            CREATE TABLE IF NOT EXISTS scanned_messages (
                message_key TEXT PRIMARY KEY,
                kind        TEXT NOT NULL,
                job_id      INTEGER,
                scanned_at  TEXT NOT NULL
            );",
        )
        .context("failed to create tracker tables")?;

        Ok(())
    }

    /// 現在時刻を DB 保存用の文字列にする。
    fn now() -> String {
        timestamp(Utc::now())
    }
}

/// DB に保存するタイムスタンプ形式（RFC 3339, UTC, 秒精度）。
/// 固定長なので文字列比較がそのまま時刻順になる。
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// 日付のみの指定を当日 00:00 UTC のタイムスタンプにする。
pub fn date_timestamp(date: NaiveDate) -> String {
    timestamp(date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// 保存済みタイムスタンプから日付部分 (`YYYY-MM-DD`) を取り出す。
pub fn date_part(stored: &str) -> &str {
    stored.get(..10).unwrap_or(stored)
}

/// 保存済みタイムスタンプを `YYYY-MM-DD HH:MM` で表示用に整形する。
pub fn date_time_part(stored: &str) -> String {
    match DateTime::parse_from_rfc3339(stored) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => stored.to_string(),
    }
}
