//! ログ初期化モジュール
//!
//! `tracing` + `tracing-subscriber` を使用して、ログを外部ファイルに出力する。
//! ターミナルには何も出さない（コマンドの出力を汚さないため）。
//! ログファイルはデータディレクトリ配下の `logs/` に日次ローテーションで保存される。

use std::path::Path;

use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, EnvFilter};

/// ログレベルを制御する環境変数
const LOG_ENV: &str = "JOB_LOG_LOG";

/// ログファイル名のプレフィックス
const LOG_PREFIX: &str = "job-log.log";

/// `<log_dir>/job-log.log.YYYY-MM-DD` に書き込む日次ローテーションのアペンダー。
/// ディレクトリが無ければ作成する。
fn file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .build(log_dir)
}

/// ログシステムを初期化する。
///
/// - ログレベルは `JOB_LOG_LOG` 環境変数で制御（デフォルト: `info`）
/// - ログファイルは `<log_dir>/job-log.log.YYYY-MM-DD`（UTC 日付）に出力
///
/// # Returns
/// ログファイルを開けた場合は `WorkerGuard` を返す。`main()` で保持し続けること
/// （ドロップするとログ出力が停止する）。開けない場合は警告を出してログなしで続行する。
pub fn init_logging(log_dir: &Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let appender = match file_appender(log_dir) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!(
                "job: warning: failed to create log file in {}: {e}",
                log_dir.display()
            );
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .init();

    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn appender_creates_missing_dir_and_dated_file() {
        let tmp = TempDir::new().unwrap();
        let log_dir = tmp.path().join("logs");

        let mut appender = file_appender(&log_dir).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let names: Vec<String> = std::fs::read_dir(&log_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        let date = names[0].strip_prefix("job-log.log.").unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok(), "{date}");
        assert_eq!(
            std::fs::read_to_string(log_dir.join(&names[0])).unwrap(),
            "hello\n"
        );
    }
}
