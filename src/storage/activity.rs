use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, Utc};

use super::jobs::{row_to_job, JOB_COLUMNS};
use super::models::{Activity, ActivityEvent, EventType};
use super::{timestamp, JobStore};

/// どの保存済みタイムスタンプよりも前に並ぶ文字列
const EARLIEST: &str = "0000-01-01T00:00:00Z";

/// 期間の開始時刻。表せない過去（紀元前や chrono の範囲外）になる場合は `None`。
fn window_start(days: u32) -> Option<DateTime<Utc>> {
    let start = Utc::now().checked_sub_signed(Duration::try_days(i64::from(days))?)?;
    (start.year() >= 1).then_some(start)
}

impl JobStore {
    /// 直近 `days` 日間のアクティビティを集計する。
    ///
    /// - 期間内に登録されたジョブ（新しい順）
    /// - 期間内の日付を持つイベント（新しい順、`added` を含む）
    /// - イベント種別ごとの件数
    pub fn get_activity(&self, days: u32) -> Result<Activity> {
        let cutoff = window_start(days)
            .map(timestamp)
            .unwrap_or_else(|| EARLIEST.to_string());

        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE created_at >= ?1 ORDER BY created_at DESC, id DESC"
        );
        let mut stmt = self.conn.prepare(&sql).context("failed to prepare activity query")?;
        let jobs_added = stmt
            .query_map([&cutoff], row_to_job)
            .context("failed to query added jobs")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read job row")?;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT e.id, e.job_id, e.event_type, e.event_date, e.notes, j.company, j.title
                 FROM events e
                 JOIN jobs j ON e.job_id = j.id
                 WHERE e.event_date >= ?1
                 ORDER BY e.event_date DESC, e.id DESC",
            )
            .context("failed to prepare events query")?;
        let events = stmt
            .query_map([&cutoff], |row| {
                let event_type: String = row.get(2)?;
                Ok(ActivityEvent {
                    id: row.get(0)?,
                    job_id: row.get(1)?,
                    event_type: EventType::parse_lossy(&event_type),
                    event_date: row.get(3)?,
                    notes: row.get(4)?,
                    company: row.get(5)?,
                    title: row.get(6)?,
                })
            })
            .context("failed to query events")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("failed to read event row")?;

        let mut summary = BTreeMap::new();
        for event in &events {
            *summary.entry(event.event_type).or_insert(0) += 1;
        }

        Ok(Activity {
            days,
            jobs_added,
            events,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::{Application, EventType, JobStore, NewJob};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn new_job(company: &str) -> NewJob {
        NewJob {
            company: company.to_string(),
            title: "Engineer".to_string(),
            ..NewJob::default()
        }
    }

    #[test]
    fn activity_counts_recent_events() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open_at(tmp.path().to_path_buf()).unwrap();

        let a = store.add_job(&new_job("Acme")).unwrap();
        let b = store.add_job(&new_job("Globex")).unwrap();
        store.apply_to_job(a, &Application::default()).unwrap();
        store.apply_to_job(b, &Application::default()).unwrap();
        store.add_response(b, false, Some("no thanks")).unwrap();

        let activity = store.get_activity(7).unwrap();
        assert_eq!(activity.jobs_added.len(), 2);
        assert_eq!(activity.count(EventType::Added), 2);
        assert_eq!(activity.count(EventType::Applied), 2);
        assert_eq!(activity.count(EventType::Rejected), 1);
        assert_eq!(activity.count(EventType::Interview), 0);
        assert_eq!(activity.events.len(), 5);
    }

    #[test]
    fn activity_excludes_events_outside_window() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open_at(tmp.path().to_path_buf()).unwrap();

        let id = store.add_job(&new_job("Acme")).unwrap();
        store
            .apply_to_job(
                id,
                &Application {
                    applied_on: NaiveDate::from_ymd_opt(2001, 1, 1),
                    ..Application::default()
                },
            )
            .unwrap();

        let activity = store.get_activity(7).unwrap();
        assert_eq!(activity.count(EventType::Applied), 0);
        assert_eq!(activity.count(EventType::Added), 1);
        assert!(activity
            .events
            .iter()
            .all(|e| e.company == "Acme" && e.event_type == EventType::Added));
    }

    #[test]
    fn huge_window_covers_everything() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open_at(tmp.path().to_path_buf()).unwrap();

        let id = store.add_job(&new_job("Acme")).unwrap();
        store
            .apply_to_job(
                id,
                &Application {
                    applied_on: NaiveDate::from_ymd_opt(1999, 12, 31),
                    ..Application::default()
                },
            )
            .unwrap();

        for days in [u32::MAX, 1_000_000] {
            let activity = store.get_activity(days).unwrap();
            assert_eq!(activity.days, days);
            assert_eq!(activity.jobs_added.len(), 1);
            assert_eq!(activity.count(EventType::Applied), 1);
        }
    }

    #[test]
    fn window_start_is_none_when_out_of_range() {
        assert!(super::window_start(7).is_some());
        assert!(super::window_start(1_000_000).is_none());
        assert!(super::window_start(u32::MAX).is_none());
    }

    #[test]
    fn empty_store_has_no_activity() {
        let tmp = TempDir::new().unwrap();
        let store = JobStore::open_at(tmp.path().to_path_buf()).unwrap();
        let activity = store.get_activity(30).unwrap();
        assert!(activity.jobs_added.is_empty());
        assert!(activity.events.is_empty());
        assert!(activity.summary.is_empty());
        assert_eq!(activity.days, 30);
    }
}
