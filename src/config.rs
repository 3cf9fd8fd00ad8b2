//! 設定ファイル管理
//!
//! `~/.config/job-log/config.toml` から TOML 形式の設定を読み込む。
//! ファイルが存在しない場合はテンプレートを生成し、デフォルト値を使用する。
//! 同じディレクトリの `.env` も読み込み、`JOB_LOG_DB_PATH` で DB の置き場所を上書きできる。
//!
//! # 設定ファイル例
//!
//! ```toml
//! [database]
//! dir = "~/Documents/job-log"
//!
//! [scan]
//! min_confidence = "medium"
//! ats_domains = ["recruitee.com"]
//! ignore_senders = ["newsletter@example.com"]
//!
//! [report]
//! days = 14
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::scan::classifier::Confidence;

/// DB ディレクトリを上書きする環境変数
pub const DB_PATH_ENV: &str = "JOB_LOG_DB_PATH";

/// job-log の設定全体
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct JobLogConfig {
    /// DB の保存先
    pub database: DatabaseConfig,
    /// メールスキャン関連設定
    pub scan: ScanConfig,
    /// レポート関連設定
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    /// DB を置くディレクトリ。省略時はプラットフォーム標準のデータディレクトリ。
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// これ未満の確信度のメールは自動処理せずユーザーに確認する
    pub min_confidence: Confidence,
    /// 組み込みリストに追加する ATS ドメイン
    pub ats_domains: Vec<String>,
    /// 求人メールとして扱わない送信者（アドレスまたはドメインの部分一致）
    pub ignore_senders: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_confidence: Confidence::Medium,
            ats_domains: Vec::new(),
            ignore_senders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// `report` のデフォルト集計日数
    pub days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { days: 7 }
    }
}

impl JobLogConfig {
    /// 設定ファイルと `.env` を読み込む。
    ///
    /// 設定ファイルが無ければテンプレートを生成してデフォルト値を返す。
    /// パースエラーの場合は警告を表示してデフォルト値を返す。
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_env(&path);
        Self::load_from(&path)
    }

    /// 指定パスの設定ファイルを読み込む。
    pub fn load_from(path: &Path) -> Self {
        debug!(path = %path.display(), "Loading config file");

        if !path.exists() {
            Self::create_default_config(path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<JobLogConfig>(&content) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        min_confidence = ?config.scan.min_confidence,
                        extra_ats_domains = config.scan.ats_domains.len(),
                        report_days = config.report.days,
                        "Config loaded successfully"
                    );
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse config file");
                    eprintln!("job: warning: failed to parse config file: {e}");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read config file");
                eprintln!("job: warning: failed to read config file: {e}");
                Self::default()
            }
        }
    }

    /// 設定ファイルのパスを返す。
    ///
    /// dotfiles として管理しやすいよう `~/.config/job-log/config.toml` に固定する。
    /// `$HOME` が取得できない場合は `./.config/job-log/config.toml` にフォールバックする。
    pub fn config_path() -> PathBuf {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".config/job-log/config.toml")
    }

    /// 設定ファイルと同じディレクトリの `.env` を読み込む。
    /// シェルで設定済みの環境変数は上書きしない。
    fn load_env(config_path: &Path) {
        let Some(dir) = config_path.parent() else {
            return;
        };
        let env_file = dir.join(".env");
        if env_file.exists() {
            match dotenvy::from_path(&env_file) {
                Ok(()) => debug!(path = %env_file.display(), ".env loaded"),
                Err(e) => warn!(path = %env_file.display(), error = %e, "Failed to load .env"),
            }
        }
    }

    /// DB を置くディレクトリを決定する。
    ///
    /// 優先順位:
    /// 1. `JOB_LOG_DB_PATH` 環境変数（シェルまたは `.env`）
    /// 2. 設定ファイルの `[database] dir`
    /// 3. `directories` によるプラットフォーム標準のデータディレクトリ
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Ok(custom) = std::env::var(DB_PATH_ENV) {
            if !custom.trim().is_empty() {
                return Ok(expand_home(custom.trim()));
            }
        }

        if let Some(dir) = &self.database.dir {
            return Ok(expand_home(dir));
        }

        default_data_dir()
    }
}

/// プラットフォーム標準のデータディレクトリ（ログの出力先にも使う）。
pub fn default_data_dir() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "job-log").context("failed to determine data directory")?;
    Ok(proj_dirs.data_dir().to_path_buf())
}

/// 先頭の `~` をホームディレクトリに展開する。
fn expand_home(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(path.trim_start_matches('~').trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

impl JobLogConfig {
    /// 設定ファイルが存在しない場合にテンプレートから生成する。
    ///
    /// 生成に失敗した場合は警告を表示するが、コマンドの実行は継続する。
    fn create_default_config(path: &Path) {
        const TEMPLATE: &str = r#"# job-log configuration

[database]
# dir = "~/Documents/job-log"

[scan]
# min_confidence = "medium"   # low | medium | high
# ats_domains = ["recruitee.com"]
# ignore_senders = ["newsletter@example.com"]

[report]
# days = 7
"#;

        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %e, "Failed to create config directory");
                return;
            }
        }

        match std::fs::write(path, TEMPLATE) {
            Ok(()) => info!(path = %path.display(), "Created default config file"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to create default config file")
            }
        }
    }
}
