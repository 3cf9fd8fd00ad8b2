//! 求人メールからのフィールド抽出
//!
//! 会社名・職種・日付・応募管理 URL・求人 URL をヒューリスティックで取り出す。
//! どれも取れない可能性があるため、すべて `Option` で返す。

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::ats::{host_matches, parse_url, url_host, AtsDirectory};
use super::mail::MailMessage;

/// 大文字（または数字）で始まる単語を最大 5 語まで連ねたもの
const COMPANY: &str = r"([A-Z0-9][\w&'\-]*(?:\.[A-Za-z]+)?(?: (?:&|[A-Z0-9][\w&'\-]*(?:\.[A-Za-z]+)?)){0,4})";

static COMPANY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        format!(r"(?i:applying|applied|application|apply|sent) (?i:to|at|with) {COMPANY}"),
        format!(r"(?i:position|role|opening|opportunity|job|team) (?i:at|with) {COMPANY}"),
        format!(r"(?i:interest in|interested in)(?i: joining| working at| working with)? {COMPANY}"),
        format!(r"(?i:the )?{COMPANY} (?i:recruiting|talent acquisition|talent|hiring|careers|people) (?i:team)"),
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid company pattern"))
    .collect()
});

static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(?:for|in) the ([^.,;:!?\n]{2,80}?) (?:position|role|opening|job)\b",
        r"(?i)(?:position|role|job title|job)\s*:\s*([^\n]{2,80})",
        r"(?i)application for (?:the )?([^.,;:!?\n]{2,80}?)(?: position| role| at |\s+[-–|(]|[.!\n]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid title pattern"))
    .collect()
});

static URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s<>"'()\[\]]+"#).expect("valid url pattern"));

/// 送信者の表示名から取り除く語（会社名の後ろに付くもの）
const SENDER_NAME_SUFFIXES: &[&str] = &[
    "talent acquisition",
    "recruiting team",
    "recruitment team",
    "hiring team",
    "careers team",
    "people team",
    "recruiting",
    "recruitment",
    "recruiter",
    "careers",
    "career",
    "talent",
    "hiring",
    "jobs",
    "team",
    "hr",
];

/// 会社名として扱わない表示名・ドメイン
const GENERIC_SENDERS: &[&str] = &[
    "no-reply", "noreply", "do-not-reply", "donotreply", "notifications", "linkedin", "indeed",
    "glassdoor", "workday", "greenhouse", "lever", "ashby", "smartrecruiters", "icims", "jobvite",
    "workable", "bamboohr", "taleo", "gmail", "outlook", "hotmail", "yahoo", "icloud",
];

/// 会社名として誤検出しやすい語
const COMPANY_STOPWORDS: &[&str] = &["The", "Our", "Us", "We", "You", "Your", "This", "A", "An"];

/// 抽出結果
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extracted {
    pub company: Option<String>,
    pub title: Option<String>,
    pub applied_on: Option<NaiveDate>,
    pub application_url: Option<String>,
    pub posting_url: Option<String>,
    /// 応募管理 URL の ATS 名（Workday 等）
    pub ats_vendor: Option<String>,
}

/// メールからフィールドを抽出する。
pub fn extract(message: &MailMessage, ats: &AtsDirectory) -> Extracted {
    let urls = find_urls(&message.body);

    let application_url = urls
        .iter()
        .find(|url| url_host(url).map(|h| ats.is_ats(&h)).unwrap_or(false))
        .cloned();
    let ats_vendor = application_url
        .as_deref()
        .and_then(url_host)
        .and_then(|h| ats.vendor(&h).map(|v| v.to_string()));
    let posting_url = urls.iter().find(|url| is_posting_url(url)).cloned();

    let company = company_from_text(&message.subject)
        .or_else(|| company_from_text(&message.body))
        .or_else(|| company_from_sender_name(message))
        .or_else(|| application_url.as_deref().and_then(company_from_ats_url))
        .or_else(|| company_from_sender_domain(message, ats));

    let title = title_from_text(&message.subject).or_else(|| title_from_text(&message.body));

    Extracted {
        company,
        title,
        applied_on: message.received_on(),
        application_url,
        posting_url,
        ats_vendor,
    }
}

/// 本文中の URL を出現順に返す（末尾の句読点は除く、配信停止リンクは除外）。
pub fn find_urls(text: &str) -> Vec<String> {
    URL.find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']).to_string())
        .filter(|url| !url.to_lowercase().contains("unsubscribe"))
        .collect()
}

fn is_posting_url(url: &str) -> bool {
    let Some(host) = url_host(url) else {
        return false;
    };
    let lower = url.to_lowercase();
    AtsDirectory::is_posting_site(&host)
        && (lower.contains("/jobs/view/") || lower.contains("/viewjob") || lower.contains("/job/"))
}

fn company_from_text(text: &str) -> Option<String> {
    COMPANY_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| clean_company(m.as_str()))
            .find(|company| is_plausible_company(company))
    })
}

fn clean_company(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches(['.', ',', '\'', '-']);
    trimmed
        .strip_prefix("The ")
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn is_plausible_company(company: &str) -> bool {
    !company.is_empty()
        && company.len() <= 60
        && !COMPANY_STOPWORDS.contains(&company)
        && !GENERIC_SENDERS.contains(&company.to_lowercase().as_str())
}

/// 送信者表示名から会社名を推定する（"Acme Careers" → "Acme"）。
fn company_from_sender_name(message: &MailMessage) -> Option<String> {
    let name = message.sender_name()?;
    // "Acme via Greenhouse" / "Acme @ Lever"
    let name = name
        .split(" via ")
        .next()
        .and_then(|n| n.split(" @ ").next())
        .unwrap_or(&name)
        .trim();

    let mut company = name.to_string();
    loop {
        let lower = company.to_lowercase();
        let Some(suffix) = SENDER_NAME_SUFFIXES
            .iter()
            .find(|suffix| lower.ends_with(&format!(" {suffix}")) || lower == **suffix)
        else {
            break;
        };
        let keep = company.len().saturating_sub(suffix.len());
        if keep == 0 {
            // 表示名が "Careers" だけなら会社名は分からない
            return None;
        }
        if !company.is_char_boundary(keep) {
            break;
        }
        company.truncate(keep);
        company = company.trim().trim_end_matches(['-', '|', ',']).trim().to_string();
    }

    let lower = company.to_lowercase();
    if company.is_empty() || lower.split_whitespace().any(|w| GENERIC_SENDERS.contains(&w)) {
        return None;
    }
    Some(company)
}

/// ATS の URL から企業スラッグを取り出す。
/// - `acme.wd5.myworkdayjobs.com` → Acme
/// - `boards.greenhouse.io/acme/...`、`jobs.lever.co/acme/...`、`jobs.ashbyhq.com/acme/...` → Acme
fn company_from_ats_url(raw: &str) -> Option<String> {
    let url = parse_url(raw)?;
    let host = url.host_str()?.to_lowercase();

    if host_matches(&host, "myworkdayjobs.com") {
        let tenant = host.split('.').next()?;
        return Some(humanize_slug(tenant));
    }

    let path_hosts = ["greenhouse.io", "lever.co", "ashbyhq.com", "smartrecruiters.com"];
    if path_hosts.iter().any(|d| host_matches(&host, d)) {
        let slug = url.path_segments()?.find(|segment| !segment.is_empty())?;
        if slug != "embed" && slug != "jobs" {
            return Some(humanize_slug(&slug.to_lowercase()));
        }
    }
    None
}

/// ATS でもフリーメールでもない送信元ドメインから会社名を推定する（`mail.acme.com` → Acme）。
fn company_from_sender_domain(message: &MailMessage, ats: &AtsDirectory) -> Option<String> {
    let domain = message.sender_domain()?;
    if ats.is_ats(&domain) || AtsDirectory::is_posting_site(&domain) {
        return None;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return None;
    }
    let name = labels[labels.len() - 2];
    if GENERIC_SENDERS.contains(&name) {
        return None;
    }
    Some(humanize_slug(name))
}

/// `acme-corp` → `Acme Corp`
fn humanize_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_from_text(text: &str) -> Option<String> {
    TITLE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| clean_title(m.as_str()))
            .find(|title| is_plausible_title(title))
    })
}

fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(['"', '\'', '“', '”'])
        .trim_end_matches(['.', ',', '!'])
        .trim()
        .to_string()
}

fn is_plausible_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    title.len() >= 2
        && title.len() <= 80
        && !lower.contains("http")
        && !["position", "role", "job", "application"].contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::mail::{html_to_text, parse_date};

    fn message(from: &str, subject: &str, body: &str) -> MailMessage {
        MailMessage {
            from: from.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            date: parse_date("Tue, 1 Oct 2024 10:00:00 -0700"),
            ..MailMessage::default()
        }
    }

    fn run(from: &str, subject: &str, body: &str) -> Extracted {
        extract(&message(from, subject, body), &AtsDirectory::default())
    }

    #[test]
    fn workday_confirmation() {
        let e = run(
            "Acme Corporation <acme@myworkday.com>",
            "Thank you for applying to Acme Corporation!",
            "Thank you for applying for the Senior Rust Engineer position.\n\
             Track your application at https://acme.wd5.myworkdayjobs.com/en-US/careers/userHome.\n",
        );
        assert_eq!(e.company.as_deref(), Some("Acme Corporation"));
        assert_eq!(e.title.as_deref(), Some("Senior Rust Engineer"));
        assert_eq!(
            e.application_url.as_deref(),
            Some("https://acme.wd5.myworkdayjobs.com/en-US/careers/userHome")
        );
        assert_eq!(e.ats_vendor.as_deref(), Some("Workday"));
        assert_eq!(e.applied_on, NaiveDate::from_ymd_opt(2024, 10, 1));
    }

    #[test]
    fn greenhouse_role_at_company() {
        let e = run(
            "Greenhouse <no-reply@greenhouse.io>",
            "Thanks for your application",
            "Thanks for your interest in the Platform Engineer role at Globex.\n\
             https://boards.greenhouse.io/globex/jobs/4012345",
        );
        assert_eq!(e.company.as_deref(), Some("Globex"));
        assert_eq!(e.title.as_deref(), Some("Platform Engineer"));
        assert_eq!(e.ats_vendor.as_deref(), Some("Greenhouse"));
    }

    #[test]
    fn title_from_labelled_line() {
        let e = run(
            "Initech Recruiting <talent@initech.com>",
            "Application update",
            "Position: Backend Developer (Remote)\nWe will be in touch.",
        );
        assert_eq!(e.title.as_deref(), Some("Backend Developer (Remote)"));
        assert_eq!(e.company.as_deref(), Some("Initech"));
    }

    #[test]
    fn application_for_subject() {
        let e = run(
            "a@hooli.com",
            "Your application for Data Scientist - Hooli",
            "",
        );
        assert_eq!(e.title.as_deref(), Some("Data Scientist"));
        assert_eq!(e.company.as_deref(), Some("Hooli"));
    }

    #[test]
    fn company_from_sender_name_strips_suffixes() {
        let e = run("\"Umbrella Talent Acquisition\" <jobs@mail.umbrella.example>", "Hello", "");
        assert_eq!(e.company.as_deref(), Some("Umbrella"));

        let e = run("Vandelay Industries via Lever <no-reply@hire.lever.co>", "Hi", "");
        assert_eq!(e.company.as_deref(), Some("Vandelay Industries"));
    }

    #[test]
    fn company_from_lever_url_slug() {
        let e = run(
            "no-reply@hire.lever.co",
            "Update",
            "See https://jobs.lever.co/stark-industries/abc-123.",
        );
        assert_eq!(e.company.as_deref(), Some("Stark Industries"));
        assert_eq!(
            e.application_url.as_deref(),
            Some("https://jobs.lever.co/stark-industries/abc-123")
        );
    }

    #[test]
    fn company_from_mixed_case_greenhouse_url() {
        let e = run(
            "no-reply@greenhouse.io",
            "Update",
            "Status: https://Boards.Greenhouse.io/Acme/jobs/1",
        );
        assert_eq!(e.company.as_deref(), Some("Acme"));
        assert_eq!(e.ats_vendor.as_deref(), Some("Greenhouse"));
    }

    #[test]
    fn bare_department_sender_falls_back_to_domain() {
        let e = run("Careers <jobs@acme.com>", "Application update", "We got your materials.");
        assert_eq!(e.company.as_deref(), Some("Acme"));

        let e = run("Hiring Team <jobs@globex.com>", "Update", "Thanks.");
        assert_eq!(e.company.as_deref(), Some("Globex"));
    }

    #[test]
    fn html_only_mail_extracts_company_and_title() {
        let body = html_to_text(
            "<html><body><p>Thank you for applying to <strong>Acme</strong> for the \
             <b>Rust Engineer</b> position.</p></body></html>",
        );
        let e = run("no-reply@myworkday.com", "Application received", &body);
        assert_eq!(e.company.as_deref(), Some("Acme"));
        assert_eq!(e.title.as_deref(), Some("Rust Engineer"));
    }

    #[test]
    fn free_mail_domain_is_not_a_company() {
        let e = run("someone@gmail.com", "Hey", "no signal here");
        assert_eq!(e.company, None);
        assert_eq!(e.title, None);
    }

    #[test]
    fn posting_url_and_unsubscribe_links() {
        let urls = find_urls(
            "Job: https://www.linkedin.com/jobs/view/3900000001/, \
             opt out: https://acme.com/unsubscribe?id=1",
        );
        assert_eq!(urls, vec!["https://www.linkedin.com/jobs/view/3900000001/"]);
        assert!(is_posting_url(&urls[0]));
        assert!(!is_posting_url("https://www.linkedin.com/feed/"));
    }

    #[test]
    fn humanizes_slugs() {
        assert_eq!(humanize_slug("acme"), "Acme");
        assert_eq!(humanize_slug("wayne_enterprises"), "Wayne Enterprises");
    }
}
