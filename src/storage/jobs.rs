//! ジョブとタイムラインイベントの CRUD
//!
//! ステータスを変える操作は、必ず対応するイベントを同じトランザクションで記録する。

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::models::{Application, Event, EventType, Job, JobStatus, NewJob, Source};
use super::{date_timestamp, JobNotFound, JobStore};

/// jobs テーブルの SELECT カラム（`row_to_job` の順序と一致させる）
pub(super) const JOB_COLUMNS: &str = "id, company, title, posting_url, application_url, location, \
     salary, description, status, source, created_at, updated_at";

/// DB の行を Job に変換する。
/// `JOB_COLUMNS` の順序を前提とし、13 列目があれば applied_at として読む。
pub(super) fn row_to_job(row: &Row) -> rusqlite::Result<Job> {
    let source: String = row.get(9)?;
    Ok(Job {
        id: row.get(0)?,
        company: row.get(1)?,
        title: row.get(2)?,
        posting_url: row.get(3)?,
        application_url: row.get(4)?,
        location: row.get(5)?,
        salary: row.get(6)?,
        description: row.get(7)?,
        status: row.get(8)?,
        source: Source::parse_lossy(&source),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        applied_at: if row.as_ref().column_count() > 12 {
            row.get(12)?
        } else {
            None
        },
    })
}

/// LIKE 用のパターンを作る。`%` と `_` はリテラルとして扱う。
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn insert_event(
    conn: &Connection,
    job_id: i64,
    event_type: EventType,
    event_date: &str,
    notes: Option<&str>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO events (job_id, event_type, event_date, notes) VALUES (?1, ?2, ?3, ?4)",
        params![job_id, event_type.as_str(), event_date, notes],
    )
    .with_context(|| format!("failed to insert {event_type} event for job #{job_id}"))?;
    Ok(conn.last_insert_rowid())
}

fn set_status(conn: &Connection, job_id: i64, status: JobStatus, now: &str) -> Result<()> {
    conn.execute(
        "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now, job_id],
    )
    .with_context(|| format!("failed to update status of job #{job_id}"))?;
    Ok(())
}

impl JobStore {
    /// 新しいジョブを登録し、ID を返す。
    /// ステータスは `interested` で始まり、`added` イベントを記録する。
    pub fn add_job(&self, job: &NewJob) -> Result<i64> {
        let now = Self::now();
        let source = if job.ai { Source::Ai } else { Source::Manual };

        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin transaction")?;

        tx.execute(
            "INSERT INTO jobs (company, title, posting_url, location, salary, description,
                               status, source, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                job.company,
                job.title,
                job.posting_url,
                job.location,
                job.salary,
                job.description,
                JobStatus::Interested.as_str(),
                source.as_str(),
                now,
            ],
        )
        .context("failed to insert job")?;
        let job_id = tx.last_insert_rowid();

        let note = format!("Added {} at {}", job.title, job.company);
        insert_event(&tx, job_id, EventType::Added, &now, Some(&note))?;
        tx.commit().context("failed to commit new job")?;

        info!(job_id, company = %job.company, title = %job.title, source = source.as_str(), "Job added");
        Ok(job_id)
    }

    /// 応募を記録する。ステータスを `applied` にし、`applied` イベントを追加する。
    /// 日付が指定されなければ現在時刻で記録する。
    pub fn apply_to_job(&self, job_id: i64, application: &Application) -> Result<()> {
        self.ensure_exists(job_id)?;
        let now = Self::now();
        let event_date = application
            .applied_on
            .map(date_timestamp)
            .unwrap_or_else(|| now.clone());

        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin transaction")?;

        set_status(&tx, job_id, JobStatus::Applied, &now)?;
        if let Some(url) = &application.application_url {
            tx.execute(
                "UPDATE jobs SET application_url = ?1 WHERE id = ?2",
                params![url, job_id],
            )
            .context("failed to set application url")?;
        }

        tx.execute(
            "INSERT INTO events (job_id, event_type, event_date, notes, resume_path, cover_letter_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job_id,
                EventType::Applied.as_str(),
                event_date,
                application.notes,
                application.resume_path,
                application.cover_letter_path,
            ],
        )
        .context("failed to insert applied event")?;
        tx.commit().context("failed to commit application")?;

        info!(job_id, event_date = %event_date, "Application recorded");
        Ok(())
    }

    /// 企業からの返答を記録する。
    /// - 興味あり → `interviewing` + `response` イベント
    /// - 不採用 → `rejected` + `rejected` イベント
    pub fn add_response(&self, job_id: i64, interested: bool, notes: Option<&str>) -> Result<()> {
        self.ensure_exists(job_id)?;
        let (status, event_type) = if interested {
            (JobStatus::Interviewing, EventType::Response)
        } else {
            (JobStatus::Rejected, EventType::Rejected)
        };
        self.transition(job_id, status, event_type, notes)?;
        info!(job_id, interested, "Response recorded");
        Ok(())
    }

    /// 面接を記録する。ステータスは `interviewing` になる。
    pub fn add_interview(&self, job_id: i64, notes: Option<&str>) -> Result<()> {
        self.ensure_exists(job_id)?;
        self.transition(job_id, JobStatus::Interviewing, EventType::Interview, notes)?;
        info!(job_id, "Interview recorded");
        Ok(())
    }

    /// ステータスを直接変更する。メモ省略時は `Status changed to <status>` を記録する。
    pub fn update_status(&self, job_id: i64, status: JobStatus, notes: Option<&str>) -> Result<()> {
        self.ensure_exists(job_id)?;
        let default_note = format!("Status changed to {status}");
        let notes = notes.unwrap_or(&default_note);
        self.transition(job_id, status, status.event_type(), Some(notes))?;
        info!(job_id, status = status.as_str(), "Status updated");
        Ok(())
    }

    fn transition(
        &self,
        job_id: i64,
        status: JobStatus,
        event_type: EventType,
        notes: Option<&str>,
    ) -> Result<()> {
        let now = Self::now();
        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin transaction")?;
        set_status(&tx, job_id, status, &now)?;
        insert_event(&tx, job_id, event_type, &now, notes)?;
        tx.commit().context("failed to commit status change")?;
        Ok(())
    }

    /// 応募管理 URL（Workday 等）を設定する。
    pub fn set_application_url(&self, job_id: i64, url: &str) -> Result<()> {
        self.ensure_exists(job_id)?;
        self.conn
            .execute(
                "UPDATE jobs SET application_url = ?1, updated_at = ?2 WHERE id = ?3",
                params![url, Self::now(), job_id],
            )
            .context("failed to set application url")?;
        debug!(job_id, url, "Application URL set");
        Ok(())
    }

    /// 勤務地・求人 URL を更新する。`None` のフィールドは変更しない。
    pub fn update_job(
        &self,
        job_id: i64,
        location: Option<&str>,
        posting_url: Option<&str>,
    ) -> Result<()> {
        self.ensure_exists(job_id)?;
        let now = Self::now();

        if let Some(location) = location {
            self.conn
                .execute(
                    "UPDATE jobs SET location = ?1, updated_at = ?2 WHERE id = ?3",
                    params![location, now, job_id],
                )
                .context("failed to update location")?;
        }

        if let Some(posting_url) = posting_url {
            self.conn
                .execute(
                    "UPDATE jobs SET posting_url = ?1, updated_at = ?2 WHERE id = ?3",
                    params![posting_url, now, job_id],
                )
                .context("failed to update posting url")?;
        }

        debug!(job_id, ?location, ?posting_url, "Job fields updated");
        Ok(())
    }

    /// `applied` イベントの日付を書き換える。
    /// 該当イベントが無ければ `false` を返す（先に apply が必要）。
    pub fn update_applied_date(&self, job_id: i64, date: NaiveDate) -> Result<bool> {
        self.ensure_exists(job_id)?;
        let changed = self
            .conn
            .execute(
                "UPDATE events SET event_date = ?1 WHERE job_id = ?2 AND event_type = 'applied'",
                params![date_timestamp(date), job_id],
            )
            .context("failed to update applied date")?;
        Ok(changed > 0)
    }

    /// ジョブとそのイベントを削除する。存在しなければ `false`。
    pub fn delete_job(&self, job_id: i64) -> Result<bool> {
        if self.get_job(job_id)?.is_none() {
            return Ok(false);
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .context("failed to begin transaction")?;
        tx.execute("DELETE FROM events WHERE job_id = ?1", [job_id])
            .context("failed to delete events")?;
        tx.execute(
            "UPDATE scanned_messages SET job_id = NULL WHERE job_id = ?1",
            [job_id],
        )
        .context("failed to detach scanned messages")?;
        tx.execute("DELETE FROM jobs WHERE id = ?1", [job_id])
            .context("failed to delete job")?;
        tx.commit().context("failed to commit delete")?;

        info!(job_id, "Job deleted");
        Ok(true)
    }

    /// ID でジョブを 1 件取得する。
    pub fn get_job(&self, job_id: i64) -> Result<Option<Job>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1");
        self.conn
            .query_row(&sql, [job_id], row_to_job)
            .optional()
            .with_context(|| format!("failed to load job #{job_id}"))
    }

    /// ジョブのイベントを古い順に返す。
    pub fn get_events(&self, job_id: i64) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, job_id, event_type, event_date, notes, resume_path, cover_letter_path
                 FROM events WHERE job_id = ?1 ORDER BY event_date ASC, id ASC",
            )
            .context("failed to prepare events query")?;

        let rows = stmt
            .query_map([job_id], |row| {
                let event_type: String = row.get(2)?;
                Ok(Event {
                    id: row.get(0)?,
                    job_id: row.get(1)?,
                    event_type: EventType::parse_lossy(&event_type),
                    event_date: row.get(3)?,
                    notes: row.get(4)?,
                    resume_path: row.get(5)?,
                    cover_letter_path: row.get(6)?,
                })
            })
            .context("failed to query events")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read event row")
    }

    /// 全ジョブを更新日時の新しい順に返す。`applied_at` も埋める。
    pub fn list_jobs(&self, status: Option<JobStatus>) -> Result<Vec<Job>> {
        let columns = JOB_COLUMNS
            .split(", ")
            .map(|c| format!("j.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!(
            "SELECT {columns},
                    (SELECT MIN(event_date) FROM events
                     WHERE job_id = j.id AND event_type = 'applied') AS applied_at
             FROM jobs j"
        );
        if status.is_some() {
            sql.push_str(" WHERE j.status = ?1");
        }
        sql.push_str(" ORDER BY j.updated_at DESC, j.id DESC");

        let mut stmt = self.conn.prepare(&sql).context("failed to prepare list query")?;
        let rows = match status {
            Some(status) => stmt.query_map([status.as_str()], row_to_job),
            None => stmt.query_map([], row_to_job),
        }
        .context("failed to list jobs")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read job row")
    }

    /// 会社名・職種の部分一致（大文字小文字無視）で検索する。
    /// 指定された条件はすべて AND で結合する。
    pub fn search_jobs(
        &self,
        company: Option<&str>,
        title: Option<&str>,
        status: Option<JobStatus>,
    ) -> Result<Vec<Job>> {
        let mut conditions = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(company) = company {
            conditions.push("company LIKE ? ESCAPE '\\'");
            values.push(like_pattern(company));
        }
        if let Some(title) = title {
            conditions.push("title LIKE ? ESCAPE '\\'");
            values.push(like_pattern(title));
        }
        if let Some(status) = status {
            conditions.push("status = ?");
            values.push(status.as_str().to_string());
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs{where_clause} ORDER BY updated_at DESC, id DESC"
        );

        let mut stmt = self.conn.prepare(&sql).context("failed to prepare search query")?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(values.iter()), row_to_job)
            .context("failed to search jobs")?;

        let jobs = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read job row")?;
        debug!(?company, ?title, results = jobs.len(), "Search executed");
        Ok(jobs)
    }

    fn ensure_exists(&self, job_id: i64) -> Result<()> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM jobs WHERE id = ?1", [job_id], |_| Ok(()))
            .optional()
            .with_context(|| format!("failed to look up job #{job_id}"))?;
        match exists {
            Some(()) => Ok(()),
            None => Err(JobNotFound(job_id).into()),
        }
    }
}
