//! メールとトラッカーの突き合わせ
//!
//! 分類・抽出済みのメール 1 通について、トラッカーに対して行うべき操作（[`Action`]）を計画する。
//! 計画は `job` コマンドの行として表示でき、`--commit` 時はそのまま JobStore に適用する。

use anyhow::{bail, Result};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use super::classifier::{Classification, Confidence, EmailKind};
use super::extract::Extracted;
use crate::storage::{Application, Job, JobStatus, JobStore, NewJob};

/// 職種が取れなかったときの仮タイトル
pub const UNKNOWN_TITLE: &str = "Unknown role";

/// dry-run 表示で、同じ計画内の `add` で作られるジョブ ID の代わりに出す文字列
pub const NEW_JOB_PLACEHOLDER: &str = "<new>";

/// 操作対象のジョブ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobRef {
    /// 既存のジョブ
    Existing(i64),
    /// 同じ計画の `Add` で作られるジョブ
    New,
}

impl JobRef {
    fn arg(&self) -> String {
        match self {
            JobRef::Existing(id) => id.to_string(),
            JobRef::New => NEW_JOB_PLACEHOLDER.to_string(),
        }
    }
}

/// トラッカーへの操作 1 つ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Add {
        company: String,
        title: String,
        posting_url: Option<String>,
    },
    Apply {
        job: JobRef,
        applied_on: Option<NaiveDate>,
        application_url: Option<String>,
        notes: Option<String>,
    },
    AppUrl {
        job: JobRef,
        url: String,
    },
    Respond {
        job: JobRef,
        interested: bool,
        notes: Option<String>,
    },
    Status {
        job: JobRef,
        status: JobStatus,
        notes: Option<String>,
    },
    UpdatePostingUrl {
        job: JobRef,
        url: String,
    },
    /// 自動では決められないので、ユーザーに確認する
    AskUser {
        question: String,
    },
    /// 何もしない
    Skip {
        reason: String,
    },
}

impl Action {
    /// 同等の `job` コマンド行。AskUser / Skip は `None`。
    pub fn to_command_line(&self) -> Option<String> {
        let args: Vec<String> = match self {
            Action::Add {
                company,
                title,
                posting_url,
            } => {
                let mut args = vec!["add".into(), company.clone(), title.clone()];
                if let Some(url) = posting_url {
                    args.extend(["--url".into(), url.clone()]);
                }
                args.push("--ai".into());
                args
            }
            Action::Apply {
                job,
                applied_on,
                application_url,
                notes,
            } => {
                let mut args = vec!["apply".into(), job.arg()];
                if let Some(date) = applied_on {
                    args.extend(["--date".into(), date.format("%Y-%m-%d").to_string()]);
                }
                if let Some(url) = application_url {
                    args.extend(["--app-url".into(), url.clone()]);
                }
                push_notes(&mut args, notes);
                args
            }
            Action::AppUrl { job, url } => vec!["app-url".into(), job.arg(), url.clone()],
            Action::Respond {
                job,
                interested,
                notes,
            } => {
                let flag = if *interested { "--interested" } else { "--rejected" };
                let mut args = vec!["response".into(), job.arg(), flag.into()];
                push_notes(&mut args, notes);
                args
            }
            Action::Status { job, status, notes } => {
                let mut args = vec!["status".into(), job.arg(), status.as_str().into()];
                push_notes(&mut args, notes);
                args
            }
            Action::UpdatePostingUrl { job, url } => {
                vec!["update".into(), job.arg(), "--posting-url".into(), url.clone()]
            }
            Action::AskUser { .. } | Action::Skip { .. } => return None,
        };

        let mut line = String::from("job");
        for arg in &args {
            line.push(' ');
            if arg == NEW_JOB_PLACEHOLDER {
                line.push_str(arg);
            } else {
                line.push_str(&shell_words::quote(arg));
            }
        }
        Some(line)
    }

    /// トラッカーを書き換える操作か
    pub fn is_write(&self) -> bool {
        !matches!(self, Action::AskUser { .. } | Action::Skip { .. })
    }
}

fn push_notes(args: &mut Vec<String>, notes: &Option<String>) {
    if let Some(notes) = notes {
        args.extend(["--notes".into(), notes.clone()]);
    }
}

/// 計画の立案と実行
pub struct Reconciler<'a> {
    store: &'a JobStore,
    min_confidence: Confidence,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a JobStore, min_confidence: Confidence) -> Self {
        Self {
            store,
            min_confidence,
        }
    }

    /// メール 1 通分の操作を計画する。DB には書き込まない。
    pub fn plan(
        &self,
        subject: &str,
        classification: &Classification,
        extracted: &Extracted,
    ) -> Result<Vec<Action>> {
        if !classification.kind.is_job_related() {
            return Ok(vec![Action::Skip {
                reason: "not job related".to_string(),
            }]);
        }

        let kind = classification.kind.as_str();
        if classification.confidence < self.min_confidence {
            return Ok(vec![Action::AskUser {
                question: format!(
                    "Is \"{subject}\" a {kind} email? (confidence: {})",
                    classification.confidence.as_str()
                ),
            }]);
        }

        let Some(company) = extracted.company.as_deref() else {
            return Ok(vec![Action::AskUser {
                question: format!("Which company is the {kind} email \"{subject}\" from?"),
            }]);
        };

        let notes = Some(format!("From email: {subject}"));
        let candidates = self.candidates(company, extracted.title.as_deref())?;
        debug!(company, candidates = candidates.len(), kind, "Reconciling email");

        match candidates.as_slice() {
            [] => {
                let title = extracted
                    .title
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
                let mut actions = vec![Action::Add {
                    company: company.to_string(),
                    title,
                    posting_url: extracted.posting_url.clone(),
                }];
                actions.extend(transition(
                    JobRef::New,
                    JobStatus::Interested,
                    classification.kind,
                    extracted,
                    notes,
                ));
                Ok(actions)
            }
            [job] => Ok(plan_for_existing(job, classification.kind, extracted, notes)),
            many => {
                let ids = many
                    .iter()
                    .map(|job| format!("#{} {}", job.id, job.title))
                    .collect::<Vec<_>>()
                    .join(", ");
                Ok(vec![Action::AskUser {
                    question: format!(
                        "Which {company} job does the {kind} email \"{subject}\" refer to? ({ids})"
                    ),
                }])
            }
        }
    }

    /// 会社名で検索し、職種が分かっていれば絞り込む。
    /// 職種で絞り込んで 0 件になる場合は、会社名だけの候補をそのまま返す（ユーザー確認に回す）。
    fn candidates(&self, company: &str, title: Option<&str>) -> Result<Vec<Job>> {
        let by_company = self.store.search_jobs(Some(company), None, None)?;
        let Some(title) = title else {
            return Ok(by_company);
        };

        let wanted = title.to_lowercase();
        let narrowed: Vec<Job> = by_company
            .iter()
            .filter(|job| {
                let have = job.title.to_lowercase();
                have.contains(&wanted) || wanted.contains(&have) || job.title == UNKNOWN_TITLE
            })
            .cloned()
            .collect();

        if narrowed.is_empty() {
            Ok(by_company)
        } else {
            Ok(narrowed)
        }
    }

    /// 計画を実行する。操作したジョブの ID を返す。
    pub fn execute(&self, actions: &[Action]) -> Result<Option<i64>> {
        let mut new_job: Option<i64> = None;
        let mut touched: Option<i64> = None;

        for action in actions {
            match action {
                Action::Add {
                    company,
                    title,
                    posting_url,
                } => {
                    let id = self.store.add_job(&NewJob {
                        company: company.clone(),
                        title: title.clone(),
                        posting_url: posting_url.clone(),
                        ai: true,
                        ..NewJob::default()
                    })?;
                    new_job = Some(id);
                    touched = Some(id);
                }
                Action::Apply {
                    job,
                    applied_on,
                    application_url,
                    notes,
                } => {
                    let id = resolve(job, new_job)?;
                    self.store.apply_to_job(
                        id,
                        &Application {
                            application_url: application_url.clone(),
                            notes: notes.clone(),
                            applied_on: *applied_on,
                            ..Application::default()
                        },
                    )?;
                    touched = Some(id);
                }
                Action::AppUrl { job, url } => {
                    let id = resolve(job, new_job)?;
                    self.store.set_application_url(id, url)?;
                    touched = Some(id);
                }
                Action::Respond {
                    job,
                    interested,
                    notes,
                } => {
                    let id = resolve(job, new_job)?;
                    self.store.add_response(id, *interested, notes.as_deref())?;
                    touched = Some(id);
                }
                Action::Status { job, status, notes } => {
                    let id = resolve(job, new_job)?;
                    self.store.update_status(id, *status, notes.as_deref())?;
                    touched = Some(id);
                }
                Action::UpdatePostingUrl { job, url } => {
                    let id = resolve(job, new_job)?;
                    self.store.update_job(id, None, Some(url))?;
                    touched = Some(id);
                }
                Action::AskUser { .. } | Action::Skip { .. } => {}
            }
        }

        if let Some(job_id) = touched {
            info!(job_id, actions = actions.len(), "Scan actions applied");
        }
        Ok(touched)
    }
}

fn resolve(job: &JobRef, new_job: Option<i64>) -> Result<i64> {
    match (job, new_job) {
        (JobRef::Existing(id), _) => Ok(*id),
        (JobRef::New, Some(id)) => Ok(id),
        (JobRef::New, None) => bail!("action refers to a job that was not added"),
    }
}

/// 既存ジョブ 1 件にマッチしたときの計画
fn plan_for_existing(
    job: &Job,
    kind: EmailKind,
    extracted: &Extracted,
    notes: Option<String>,
) -> Vec<Action> {
    let target = JobRef::Existing(job.id);
    let status = job.status().unwrap_or(JobStatus::Interested);
    let mut actions: Vec<Action> = transition(target, status, kind, extracted, notes)
        .into_iter()
        .collect();

    let applies = actions.iter().any(|a| matches!(a, Action::Apply { .. }));
    if !applies && job.application_url.is_none() {
        if let Some(url) = &extracted.application_url {
            actions.push(Action::AppUrl {
                job: target,
                url: url.clone(),
            });
        }
    }

    if job.posting_url.is_none() {
        if let Some(url) = &extracted.posting_url {
            actions.push(Action::UpdatePostingUrl {
                job: target,
                url: url.clone(),
            });
        }
    }

    if actions.is_empty() {
        actions.push(Action::Skip {
            reason: format!("job #{} is already {}", job.id, job.status),
        });
    }
    actions
}

/// メールの種類と現在のステータスから、状態を前に進める操作を返す。
fn transition(
    job: JobRef,
    current: JobStatus,
    kind: EmailKind,
    extracted: &Extracted,
    notes: Option<String>,
) -> Option<Action> {
    match kind {
        EmailKind::ApplicationConfirmation if current == JobStatus::Interested => {
            Some(Action::Apply {
                job,
                applied_on: extracted.applied_on,
                application_url: extracted.application_url.clone(),
                notes,
            })
        }
        EmailKind::Rejection if current != JobStatus::Rejected => Some(Action::Respond {
            job,
            interested: false,
            notes,
        }),
        EmailKind::Interview
            if !matches!(current, JobStatus::Interviewing | JobStatus::Offered) =>
        {
            Some(Action::Respond {
                job,
                interested: true,
                notes,
            })
        }
        EmailKind::Offer if current != JobStatus::Offered => Some(Action::Status {
            job,
            status: JobStatus::Offered,
            notes,
        }),
        _ => None,
    }
}
