//! 既知の ATS（応募者管理システム）ドメイン

use url::Url;

/// 組み込みの ATS ドメインと表示名
const KNOWN_ATS: &[(&str, &str)] = &[
    ("myworkdayjobs.com", "Workday"),
    ("myworkday.com", "Workday"),
    ("workday.com", "Workday"),
    ("greenhouse.io", "Greenhouse"),
    ("lever.co", "Lever"),
    ("ashbyhq.com", "Ashby"),
    ("smartrecruiters.com", "SmartRecruiters"),
    ("icims.com", "iCIMS"),
    ("jobvite.com", "Jobvite"),
    ("workable.com", "Workable"),
    ("bamboohr.com", "BambooHR"),
    ("taleo.net", "Taleo"),
    ("successfactors.com", "SuccessFactors"),
    ("successfactors.eu", "SuccessFactors"),
    ("breezy.hr", "Breezy"),
    ("jazzhr.com", "JazzHR"),
    ("applytojob.com", "JazzHR"),
    ("recruitee.com", "Recruitee"),
    ("teamtailor.com", "Teamtailor"),
    ("rippling.com", "Rippling"),
];

/// 求人ポスティングのサイト（ATS ではないが求人 URL として扱う）
const POSTING_SITES: &[&str] = &["linkedin.com", "indeed.com", "glassdoor.com", "wellfound.com"];

/// ATS ドメインの一覧。組み込み + 設定ファイルの追加分。
#[derive(Debug, Clone, Default)]
pub struct AtsDirectory {
    extra: Vec<String>,
}

impl AtsDirectory {
    pub fn new(extra: &[String]) -> Self {
        Self {
            extra: extra
                .iter()
                .map(|d| d.trim().trim_start_matches('.').to_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// ホスト名が ATS のものなら、その表示名を返す。
    pub fn vendor(&self, host: &str) -> Option<&str> {
        let host = host.to_lowercase();
        if let Some((_, name)) = KNOWN_ATS
            .iter()
            .find(|(domain, _)| host_matches(&host, domain))
        {
            return Some(*name);
        }
        self.extra
            .iter()
            .find(|domain| host_matches(&host, domain))
            .map(|domain| domain.as_str())
    }

    pub fn is_ats(&self, host: &str) -> bool {
        self.vendor(host).is_some()
    }

    /// 求人ポスティングサイトのホストか。
    pub fn is_posting_site(host: &str) -> bool {
        let host = host.to_lowercase();
        POSTING_SITES.iter().any(|domain| host_matches(&host, domain))
    }
}

/// `host` が `domain` そのものか、そのサブドメインか。
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// URL をパースする。スキームが無い場合は `https://` を補う。
pub fn parse_url(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{raw}")).ok(),
        Err(_) => None,
    }
}

/// URL からホスト名を取り出す（小文字、認証情報・ポートを除く）。
pub fn url_host(raw: &str) -> Option<String> {
    let url = parse_url(raw)?;
    url.host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_builtin_vendors_and_subdomains() {
        let ats = AtsDirectory::default();
        assert_eq!(ats.vendor("acme.wd5.myworkdayjobs.com"), Some("Workday"));
        assert_eq!(ats.vendor("boards.greenhouse.io"), Some("Greenhouse"));
        assert_eq!(ats.vendor("jobs.lever.co"), Some("Lever"));
        assert!(!ats.is_ats("acme.com"));
        assert!(!ats.is_ats("notlever.co"));
    }

    #[test]
    fn extra_domains_are_matched() {
        let ats = AtsDirectory::new(&[".Personio.de".to_string(), " ".to_string()]);
        assert_eq!(ats.vendor("acme.jobs.personio.de"), Some("personio.de"));
    }

    #[test]
    fn posting_sites() {
        assert!(AtsDirectory::is_posting_site("www.linkedin.com"));
        assert!(!AtsDirectory::is_posting_site("jobs.lever.co"));
    }

    #[test]
    fn extracts_url_host() {
        assert_eq!(
            url_host("https://user@Acme.wd5.myworkdayjobs.com:443/en-US/job/1?x=y").as_deref(),
            Some("acme.wd5.myworkdayjobs.com")
        );
        assert_eq!(url_host("jobs.lever.co/acme").as_deref(), Some("jobs.lever.co"));
        assert_eq!(
            url_host("https://Boards.Greenhouse.io/acme/jobs/1").as_deref(),
            Some("boards.greenhouse.io")
        );
        assert_eq!(url_host("mailto:jobs@acme.com"), None);
        assert_eq!(url_host("https://exa mple.com"), None);
    }
}
