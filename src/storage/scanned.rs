//! スキャン済みメールの記録
//!
//! 同じメールを再スキャンしたときに二重登録しないよう、
//! メッセージキー（SHA-256）ごとに処理結果を残す。

use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

use super::JobStore;

impl JobStore {
    /// メッセージキーが既に処理済みかを返す。
    pub fn is_scanned(&self, message_key: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM scanned_messages WHERE message_key = ?1",
                [message_key],
                |_| Ok(()),
            )
            .optional()
            .context("failed to look up scanned message")?;
        Ok(found.is_some())
    }

    /// メッセージを処理済みとして記録する。再記録時は内容を上書きする。
    pub fn mark_scanned(&self, message_key: &str, kind: &str, job_id: Option<i64>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO scanned_messages (message_key, kind, job_id, scanned_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(message_key) DO UPDATE
                 SET kind = excluded.kind, job_id = excluded.job_id, scanned_at = excluded.scanned_at",
                params![message_key, kind, job_id, Self::now()],
            )
            .context("failed to record scanned message")?;
        Ok(())
    }
}
