//! メールの読み込み
//!
//! ローカルにエクスポートされたメール（`.eml` / `.mbox` / `.json`）を読み込み、
//! 分類・抽出に必要な最小限のフィールドだけを持つ `MailMessage` に変換する。
//! MIME は text/plain を優先し、無ければ text/html をテキスト化して使う。

use std::path::Path;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// multipart の入れ子の最大深さ
const MAX_MIME_DEPTH: usize = 8;

static ENCODED_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"=\?([^?]+)\?([bBqQ])\?([^?]*)\?=").expect("valid encoded-word pattern")
});
static ENCODED_WORD_GAP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\?=\s+=\?").expect("valid encoded-word gap pattern"));
static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)\s*>").expect("valid html pattern")
});

/// 分類に使うメール 1 通
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailMessage {
    pub message_id: Option<String>,
    /// `From` ヘッダそのまま（例: `"Acme Careers" <no-reply@acme.com>`）
    pub from: String,
    pub subject: String,
    pub date: Option<DateTime<FixedOffset>>,
    /// 本文のプレーンテキスト
    pub body: String,
}

impl MailMessage {
    /// 再スキャン判定用のキー。Message-ID があればそれを、無ければ送信者・件名・日付をハッシュする。
    pub fn key(&self) -> String {
        let source = match &self.message_id {
            Some(id) => id.trim().to_string(),
            None => format!(
                "{}\n{}\n{}",
                self.from,
                self.subject,
                self.date.map(|d| d.to_rfc3339()).unwrap_or_default()
            ),
        };
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// 送信者のメールアドレス（小文字）
    pub fn sender_address(&self) -> String {
        let from = self.from.trim();
        let address = match (from.rfind('<'), from.rfind('>')) {
            (Some(start), Some(end)) if start < end => &from[start + 1..end],
            _ => from,
        };
        address.trim().to_lowercase()
    }

    /// 送信者の表示名（`"Acme Careers" <...>` の `Acme Careers`）
    pub fn sender_name(&self) -> Option<String> {
        let from = self.from.trim();
        let start = from.find('<')?;
        let name = from[..start].trim().trim_matches('"').trim();
        if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        }
    }

    /// 送信者アドレスのドメイン部
    pub fn sender_domain(&self) -> Option<String> {
        let address = self.sender_address();
        let (_, domain) = address.rsplit_once('@')?;
        if domain.is_empty() {
            None
        } else {
            Some(domain.to_string())
        }
    }

    /// 受信日（送信側のタイムゾーンでの日付）
    pub fn received_on(&self) -> Option<NaiveDate> {
        self.date.map(|d| d.date_naive())
    }
}

/// ファイルまたはディレクトリからメールを読み込み、古い順に並べて返す。
///
/// ディレクトリは直下のファイルのみを名前順に読む。
/// 読めないファイルや未対応の拡張子は警告ログを出してスキップする。
pub fn load_path(path: &Path) -> Result<Vec<MailMessage>> {
    let mut messages = Vec::new();

    if path.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(path)
            .with_context(|| format!("failed to read directory: {}", path.display()))?
            .flatten()
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for file in entries {
            match load_file(&file) {
                Ok(mut loaded) => messages.append(&mut loaded),
                Err(e) => warn!(path = %file.display(), error = %e, "Skipping unreadable mail file"),
            }
        }
    } else {
        messages = load_file(path)?;
    }

    // 日付の無いメールは末尾へ（安定ソートなのでファイル順は保たれる）
    messages.sort_by_key(|m| (m.date.is_none(), m.date));
    debug!(path = %path.display(), count = messages.len(), "Mail loaded");
    Ok(messages)
}

/// 拡張子に応じてファイルを 1 つ読み込む。
fn load_file(path: &Path) -> Result<Vec<MailMessage>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let raw = String::from_utf8_lossy(&bytes);

    match extension.as_str() {
        "eml" | "txt" | "msg" => Ok(vec![parse_eml(&raw)]),
        "mbox" => Ok(split_mbox(&raw).into_iter().map(|m| parse_eml(&m)).collect()),
        "json" => parse_json(&raw).with_context(|| format!("invalid JSON export: {}", path.display())),
        other => anyhow::bail!("unsupported mail file extension '{other}'"),
    }
}

/// mbox を 1 通ずつに分割する（`From ` 区切り行は含めない）。
pub fn split_mbox(raw: &str) -> Vec<String> {
    let raw = raw.replace("\r\n", "\n");
    let mut messages = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    let mut previous_blank = true;

    for line in raw.lines() {
        if previous_blank && line.starts_with("From ") {
            if let Some(lines) = current.take() {
                messages.push(lines.join("\n"));
            }
            current = Some(Vec::new());
        } else if let Some(lines) = current.as_mut() {
            // mboxrd のエスケープ (">From ") を戻す
            let unescaped = line.strip_prefix('>').filter(|rest| {
                rest.trim_start_matches('>').starts_with("From ")
            });
            lines.push(unescaped.unwrap_or(line));
        }
        previous_blank = line.trim().is_empty();
    }

    if let Some(lines) = current {
        messages.push(lines.join("\n"));
    }
    messages
}

/// JSON エクスポート 1 件分
#[derive(Debug, Deserialize)]
struct JsonMessage {
    #[serde(default, alias = "message_id")]
    id: Option<String>,
    #[serde(default)]
    from: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, alias = "snippet", alias = "text")]
    body: String,
}

/// `[{ "subject": ..., "from": ..., "date": ..., "body": ... }]` 形式の JSON を読む。
pub fn parse_json(raw: &str) -> Result<Vec<MailMessage>> {
    let parsed: Vec<JsonMessage> = serde_json::from_str(raw).context("failed to parse JSON")?;
    Ok(parsed
        .into_iter()
        .map(|m| MailMessage {
            message_id: m.id,
            from: m.from,
            subject: m.subject,
            date: m.date.as_deref().and_then(parse_date),
            body: if looks_like_html(&m.body) {
                html_to_text(&m.body)
            } else {
                m.body
            },
        })
        .collect())
}

/// RFC 822 形式のメール 1 通をパースする。
pub fn parse_eml(raw: &str) -> MailMessage {
    let normalized = raw.replace("\r\n", "\n");
    let (headers, body) = split_headers(&normalized);

    let subject = header(&headers, "subject")
        .map(decode_encoded_words)
        .unwrap_or_default();
    let from = header(&headers, "from")
        .map(decode_encoded_words)
        .unwrap_or_default();
    let message_id = header(&headers, "message-id").map(|s| s.trim().to_string());
    let date = header(&headers, "date").and_then(parse_date);

    let body = extract_text(&headers, body, 0).unwrap_or_default();

    MailMessage {
        message_id,
        from,
        subject,
        date,
        body: body.trim().to_string(),
    }
}

/// ヘッダ部と本文に分割し、折り返されたヘッダを連結する。
/// ヘッダ名は小文字化する。
fn split_headers(raw: &str) -> (Vec<(String, String)>, &str) {
    let (head, body) = match raw.find("\n\n") {
        Some(idx) => (&raw[..idx], &raw[idx + 2..]),
        None => (raw, ""),
    };

    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    (headers, body)
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// `Content-Type` を MIME タイプ（小文字）とパラメータに分ける。
fn content_type(headers: &[(String, String)]) -> (String, Vec<(String, String)>) {
    let Some(value) = header(headers, "content-type") else {
        return ("text/plain".to_string(), Vec::new());
    };

    let mut pieces = value.split(';');
    let mime = pieces.next().unwrap_or("").trim().to_lowercase();
    let params = pieces
        .filter_map(|p| p.split_once('='))
        .map(|(k, v)| {
            (
                k.trim().to_lowercase(),
                v.trim().trim_matches('"').to_string(),
            )
        })
        .collect();
    (mime, params)
}

/// MIME パートから本文テキストを取り出す。
/// text/plain を優先し、無ければ text/html をテキスト化する。
fn extract_text(headers: &[(String, String)], body: &str, depth: usize) -> Option<String> {
    let mut leaves = Vec::new();
    collect_leaves(headers, body, depth, &mut leaves);

    let plain = leaves
        .iter()
        .find(|(mime, text)| mime == "text/plain" && !text.trim().is_empty());
    if let Some((_, text)) = plain {
        return Some(text.clone());
    }

    leaves
        .iter()
        .find(|(mime, _)| mime == "text/html")
        .map(|(_, html)| html_to_text(html))
}

fn collect_leaves(
    headers: &[(String, String)],
    body: &str,
    depth: usize,
    leaves: &mut Vec<(String, String)>,
) {
    let (mime, params) = content_type(headers);

    if mime.starts_with("multipart/") {
        if depth >= MAX_MIME_DEPTH {
            return;
        }
        let Some((_, boundary)) = params.iter().find(|(k, _)| k == "boundary") else {
            return;
        };
        for part in split_multipart(body, boundary) {
            let (part_headers, part_body) = split_headers(&part);
            collect_leaves(&part_headers, part_body, depth + 1, leaves);
        }
        return;
    }

    if mime == "text/plain" || mime == "text/html" {
        let encoding = header(headers, "content-transfer-encoding");
        leaves.push((mime, decode_transfer(body, encoding)));
    }
}

fn split_multipart(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{boundary}");
    let closing = format!("--{boundary}--");
    let mut parts = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in body.lines() {
        let trimmed = line.trim_end();
        if trimmed == closing {
            if let Some(lines) = current.take() {
                parts.push(lines.join("\n"));
            }
            break;
        }
        if trimmed == delimiter {
            if let Some(lines) = current.take() {
                parts.push(lines.join("\n"));
            }
            current = Some(Vec::new());
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some(lines) = current {
        parts.push(lines.join("\n"));
    }
    parts
}

fn decode_transfer(body: &str, encoding: Option<&str>) -> String {
    match encoding.map(|e| e.trim().to_lowercase()).as_deref() {
        Some("quoted-printable") => decode_quoted_printable(body),
        Some("base64") => {
            let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
            match STANDARD.decode(compact.as_bytes()) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    debug!(error = %e, "Invalid base64 body, using raw text");
                    body.to_string()
                }
            }
        }
        _ => body.to_string(),
    }
}

/// quoted-printable をデコードする（ソフト改行 `=\n` と `=XX`）。
pub fn decode_quoted_printable(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'=' {
            if bytes.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            if let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) {
                if let (Some(hi), Some(lo)) = (hex_value(hi), hex_value(lo)) {
                    out.push(hi << 4 | lo);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// RFC 2047 のエンコード済みワード（`=?UTF-8?Q?...?=`）をデコードする。
/// 文字コードは UTF-8 とみなす。
pub fn decode_encoded_words(value: &str) -> String {
    let joined = ENCODED_WORD_GAP.replace_all(value, "?==?");
    ENCODED_WORD
        .replace_all(&joined, |caps: &regex::Captures| {
            let text = &caps[3];
            match &caps[2] {
                "B" | "b" => STANDARD
                    .decode(text.as_bytes())
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .unwrap_or_else(|_| caps[0].to_string()),
                _ => decode_quoted_printable(&text.replace('_', " ")),
            }
        })
        .trim()
        .to_string()
}

/// `Date` ヘッダ（RFC 2822）を読む。RFC 3339 と `YYYY-MM-DD` も受け付ける。
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    // 末尾のタイムゾーンコメント "(PDT)" を除く
    let value = match value.rfind('(') {
        Some(idx) if value.ends_with(')') => value[..idx].trim(),
        _ => value,
    };

    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc().fixed_offset())
        })
}

fn looks_like_html(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("<html") || lower.contains("<body") || lower.contains("<a href") || lower.contains("<p>")
}

/// 改行で区切るブロック要素
const BLOCK_TAGS: &[&str] = &[
    "p", "br", "div", "li", "tr", "ul", "ol", "table", "h1", "h2", "h3", "h4", "h5", "h6",
    "blockquote", "pre", "hr", "section", "article", "header", "footer", "title",
];

/// HTML 本文をテキスト化する。
///
/// インライン要素（`<b>`、`<a>` 等）は前後の文とつなげ、ブロック要素の境目だけ改行する。
/// リンク先 URL は抽出に使うため、本文末尾に 1 行ずつ追記する。
pub fn html_to_text(html: &str) -> String {
    let cleaned = SCRIPT_OR_STYLE.replace_all(html, " ");
    let document = Html::parse_document(&cleaned);

    let mut raw = String::new();
    push_text(document.root_element(), &mut raw);

    let mut lines: Vec<String> = raw
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect();

    if let Ok(links) = Selector::parse("a[href]") {
        for link in document.select(&links) {
            if let Some(href) = link.value().attr("href") {
                if href.starts_with("http://") || href.starts_with("https://") {
                    lines.push(href.to_string());
                }
            }
        }
    }

    lines.join("\n")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // テキスト中の改行は空白と同じ扱い
            Node::Text(text) => out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                let name = child.value().name();
                if name == "head" {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                } else if name == "td" || name == "th" {
                    out.push(' ');
                }
                push_text(child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
