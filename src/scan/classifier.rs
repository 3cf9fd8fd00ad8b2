//! メール分類器
//!
//! 求人関連メールの種類をルールで判定する。
//!
//! AI を呼ばずに、件名・本文のフレーズと送信元ドメインから
//! メールが応募確認・不採用・面接依頼・オファーのどれかを判定する。
//! 判定の強さを確信度として返し、低い場合はユーザーに確認させる。

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ats::AtsDirectory;
use super::mail::MailMessage;

/// 判定結果の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    /// オファー
    Offer,
    /// 不採用通知
    Rejection,
    /// 面接・次のステップの案内
    Interview,
    /// 応募受付の確認
    ApplicationConfirmation,
    /// 求人とは無関係（求人アラート等も含む）
    NotJobRelated,
}

impl EmailKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailKind::Offer => "offer",
            EmailKind::Rejection => "rejection",
            EmailKind::Interview => "interview",
            EmailKind::ApplicationConfirmation => "confirmation",
            EmailKind::NotJobRelated => "not_job_related",
        }
    }

    pub fn is_job_related(&self) -> bool {
        *self != EmailKind::NotJobRelated
    }
}

/// 判定の確信度
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

/// 分類結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: EmailKind,
    pub confidence: Confidence,
    /// 判定理由（ログ・表示用の短いラベル）
    pub reason: &'static str,
}

/// 種類ごとのフレーズ集
struct Rule {
    kind: EmailKind,
    /// 単独で判定できるフレーズ
    strong: &'static [&'static str],
    /// 件名に含まれる場合のみ、低確信度で判定するフレーズ
    weak: &'static [&'static str],
}

/// 判定の優先順位順。不採用通知も「応募ありがとう」を含むことが多いため、確認より先に見る。
const RULES: &[Rule] = &[
    Rule {
        kind: EmailKind::Offer,
        strong: &[
            "pleased to offer you",
            "pleased to extend",
            "extend you an offer",
            "extend an offer",
            "offer letter",
            "offer of employment",
            "job offer",
        ],
        weak: &["offer"],
    },
    Rule {
        kind: EmailKind::Rejection,
        strong: &[
            "not to move forward",
            "not be moving forward",
            "won't be moving forward",
            "will not be moving forward",
            "not moving forward with your",
            "decided to pursue other candidates",
            "move forward with other candidates",
            "moving forward with other candidates",
            "decided to move forward with another",
            "position has been filled",
            "regret to inform",
            "have not been selected",
            "were not selected",
            "no longer under consideration",
            "decided not to proceed",
            "not able to offer you",
        ],
        weak: &["unfortunately", "update on your application", "application status"],
    },
    Rule {
        kind: EmailKind::Interview,
        strong: &[
            "schedule an interview",
            "schedule a call",
            "schedule a time",
            "invite you to interview",
            "like to invite you",
            "phone screen",
            "interview invitation",
            "technical interview",
            "your availability",
            "book a time",
            "next round",
        ],
        weak: &["interview", "next steps"],
    },
    Rule {
        kind: EmailKind::ApplicationConfirmation,
        strong: &[
            "thank you for applying",
            "thanks for applying",
            "application received",
            "received your application",
            "application has been received",
            "application was received",
            "application has been submitted",
            "application was submitted",
            "thank you for your application",
            "thanks for your application",
            "successfully applied",
            "application confirmation",
            "we have your application",
        ],
        weak: &["your application", "applied"],
    },
];

/// 求人アラート・おすすめメール（応募とは無関係）の件名フレーズ
const JOB_ALERT_PHRASES: &[&str] = &[
    "job alert",
    "jobs you may be interested in",
    "jobs you might like",
    "recommended jobs",
    "new jobs for you",
    "jobs matching",
    "is hiring",
];

/// ルールベースのメール分類器
pub struct EmailClassifier {
    ats: AtsDirectory,
    ignore_senders: Vec<String>,
}

impl EmailClassifier {
    pub fn new(ats: AtsDirectory, ignore_senders: &[String]) -> Self {
        Self {
            ats,
            ignore_senders: ignore_senders
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// メールを分類する。
    ///
    /// 判定ロジック（優先順位順）:
    /// 0. 無視リストの送信者 → NotJobRelated
    /// 1. 求人アラートの件名 → NotJobRelated
    /// 2. 強いフレーズ（オファー → 不採用 → 面接 → 応募確認の順）
    /// 3. 件名の弱いフレーズ → 低確信度
    /// 4. デフォルト → NotJobRelated
    pub fn classify(&self, message: &MailMessage) -> Classification {
        let sender = message.sender_address();
        if self.ignore_senders.iter().any(|s| sender.contains(s.as_str())) {
            debug!(sender = %sender, reason = "ignored_sender", "Classified as NotJobRelated");
            return Classification {
                kind: EmailKind::NotJobRelated,
                confidence: Confidence::High,
                reason: "ignored_sender",
            };
        }

        let subject = message.subject.to_lowercase();
        let body = normalize_quotes(&message.body.to_lowercase());
        let subject = normalize_quotes(&subject);

        if contains_any(&subject, JOB_ALERT_PHRASES) {
            debug!(subject = %message.subject, reason = "job_alert", "Classified as NotJobRelated");
            return Classification {
                kind: EmailKind::NotJobRelated,
                confidence: Confidence::High,
                reason: "job_alert",
            };
        }

        let from_ats = message
            .sender_domain()
            .map(|domain| self.ats.is_ats(&domain))
            .unwrap_or(false);

        for rule in RULES {
            let in_subject = contains_any(&subject, rule.strong);
            let in_body = contains_any(&body, rule.strong);
            if !in_subject && !in_body {
                continue;
            }

            let (confidence, reason) = if in_subject && in_body {
                (Confidence::High, "subject_and_body")
            } else if from_ats {
                (Confidence::High, "ats_sender")
            } else if in_subject {
                (Confidence::Medium, "subject_phrase")
            } else {
                (Confidence::Medium, "body_phrase")
            };

            debug!(
                subject = %message.subject,
                kind = rule.kind.as_str(),
                confidence = confidence.as_str(),
                reason,
                "Email classified"
            );
            return Classification {
                kind: rule.kind,
                confidence,
                reason,
            };
        }

        for rule in RULES {
            if contains_any(&subject, rule.weak) {
                debug!(
                    subject = %message.subject,
                    kind = rule.kind.as_str(),
                    reason = "weak_subject_phrase",
                    "Email classified with low confidence"
                );
                return Classification {
                    kind: rule.kind,
                    confidence: Confidence::Low,
                    reason: "weak_subject_phrase",
                };
            }
        }

        debug!(subject = %message.subject, reason = "default", "Classified as NotJobRelated");
        Classification {
            kind: EmailKind::NotJobRelated,
            confidence: Confidence::High,
            reason: "default",
        }
    }
}

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

/// 曲がった引用符（’）を ASCII に揃える。"won’t" 等のマッチ用。
fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{2018}', '\u{2019}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> EmailClassifier {
        EmailClassifier::new(AtsDirectory::default(), &["digest@example.com".to_string()])
    }

    fn message(from: &str, subject: &str, body: &str) -> MailMessage {
        MailMessage {
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            ..MailMessage::default()
        }
    }

    #[test]
    fn confirmation_in_subject_and_body_is_high() {
        let c = classifier().classify(&message(
            "Acme <jobs@acme.com>",
            "Thank you for applying to Acme",
            "We have received your application for the Rust Engineer position.",
        ));
        assert_eq!(c.kind, EmailKind::ApplicationConfirmation);
        assert_eq!(c.confidence, Confidence::High);
    }

    #[test]
    fn rejection_wins_over_confirmation() {
        let c = classifier().classify(&message(
            "Acme <jobs@acme.com>",
            "Your application to Acme",
            "Thank you for applying. Unfortunately, we have decided to move forward with other candidates.",
        ));
        assert_eq!(c.kind, EmailKind::Rejection);
        assert_eq!(c.confidence, Confidence::Medium);
        assert_eq!(c.reason, "body_phrase");
    }

    #[test]
    fn curly_apostrophe_still_matches() {
        let c = classifier().classify(&message(
            "a@acme.com",
            "Update",
            "We won\u{2019}t be moving forward with your candidacy.",
        ));
        assert_eq!(c.kind, EmailKind::Rejection);
    }

    #[test]
    fn ats_sender_raises_confidence() {
        let c = classifier().classify(&message(
            "Acme Hiring Team <no-reply@hire.lever.co>",
            "Next steps",
            "We'd like to schedule a call to discuss the role.",
        ));
        assert_eq!(c.kind, EmailKind::Interview);
        assert_eq!(c.confidence, Confidence::High);
        assert_eq!(c.reason, "ats_sender");
    }

    #[test]
    fn offer_has_top_priority() {
        let c = classifier().classify(&message(
            "a@acme.com",
            "Offer letter",
            "We are pleased to offer you the position. Your next steps are below.",
        ));
        assert_eq!(c.kind, EmailKind::Offer);
        assert_eq!(c.confidence, Confidence::High);
    }

    #[test]
    fn weak_subject_phrase_is_low_confidence() {
        let c = classifier().classify(&message(
            "a@acme.com",
            "An update on your application",
            "Please log in to the portal to view it.",
        ));
        assert_eq!(c.kind, EmailKind::Rejection);
        assert_eq!(c.confidence, Confidence::Low);
    }

    #[test]
    fn job_alerts_are_not_job_related() {
        let c = classifier().classify(&message(
            "jobs-noreply@linkedin.com",
            "Job alert: 30 new Rust jobs",
            "Thank you for applying ... Apply now",
        ));
        assert_eq!(c.kind, EmailKind::NotJobRelated);
        assert_eq!(c.reason, "job_alert");
    }

    #[test]
    fn ignored_sender_is_skipped() {
        let c = classifier().classify(&message(
            "Weekly <digest@example.com>",
            "Thank you for applying",
            "received your application",
        ));
        assert_eq!(c.kind, EmailKind::NotJobRelated);
        assert_eq!(c.reason, "ignored_sender");
    }

    #[test]
    fn unrelated_mail_defaults_to_not_job_related() {
        let c = classifier().classify(&message(
            "friend@example.org",
            "Dinner on Friday?",
            "Let me know if you're free.",
        ));
        assert_eq!(c.kind, EmailKind::NotJobRelated);
        assert!(!c.kind.is_job_related());
    }

    #[test]
    fn confidence_orders_low_to_high() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }
}
