//! Fetches URLs with one GET per configured user-agent, consolidating
//! identical-hash responses. Mirrors `DownloadURLReemitterModule`; only the
//! time-bounded recent-downloads structure is kept (the size-bounded deque
//! from the distilled source is dead code and is not implemented).

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use triage_protocol::{Kind, Object, Payload};
use triage_worker::Transformer;

pub const DEFAULT_GET_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REDOWNLOAD_HOLDOFF: Duration = Duration::from_secs(60 * 60 * 6);
pub const MAX_DLS_FROM_DOMAIN: u64 = 100;
pub const DOMAIN_DL_HOLDOFF: Duration = Duration::from_secs(60 * 60);

pub struct DownloaderConfig {
    pub max_download: usize,
    pub user_agents: Vec<String>,
    pub domain_blacklist: Vec<String>,
    pub domain_overdraw: u64,
    pub get_timeout: Duration,
}

struct CompletedDownload {
    user_agent: String,
    content: Vec<u8>,
    hashdig: String,
}

pub struct Downloader {
    config: DownloaderConfig,
    client: reqwest::blocking::Client,
    recent_downloads: VecDeque<(Instant, String)>,
    domain_draw: HashMap<String, (Instant, u64)>,
}

impl Downloader {
    pub fn new(config: DownloaderConfig) -> Self {
        Downloader {
            client: reqwest::blocking::Client::new(),
            config,
            recent_downloads: VecDeque::new(),
            domain_draw: HashMap::new(),
        }
    }

    fn is_in_recent_downloads(&self, url: &str) -> bool {
        self.recent_downloads.iter().any(|(_, u)| u == url)
    }

    fn add_to_recent_downloads(&mut self, url: &str) {
        let now = Instant::now();
        self.recent_downloads.push_back((now, url.to_string()));
        while let Some((ts, _)) = self.recent_downloads.front() {
            if now.duration_since(*ts) > DEFAULT_REDOWNLOAD_HOLDOFF {
                self.recent_downloads.pop_front();
            } else {
                break;
            }
        }
    }

    /// Mirrors the source as written: a domain only becomes un-overdrawn by
    /// aging out of this map entirely, which nothing here currently does;
    /// re-observing an overdrawn domain just refreshes its timestamp.
    fn is_domain_overdrawn(&mut self, domain: &str, domain_overdraw: u64) -> bool {
        let Some(&(_, cur_cnt)) = self.domain_draw.get(domain) else {
            return false;
        };
        if cur_cnt < domain_overdraw {
            return false;
        }
        self.domain_draw.insert(domain.to_string(), (Instant::now(), cur_cnt));
        true
    }

    fn add_to_domain_draw(&mut self, domain: &str) {
        let cur_cnt = self.domain_draw.get(domain).map(|(_, c)| *c).unwrap_or(0);
        self.domain_draw
            .insert(domain.to_string(), (Instant::now(), cur_cnt + 1));
    }

    fn complete_download(&self, url: &str, user_agent: &str) -> Option<CompletedDownload> {
        let resp = match self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .timeout(self.config.get_timeout)
            .send()
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(target: "triage_transformers", url, error = %e, "download failed");
                return None;
            }
        };

        let status = resp.status().as_u16();
        if (400..600).contains(&status) {
            tracing::debug!(target: "triage_transformers", url, status, "non-2xx response");
            return None;
        }

        let bytes = match resp.bytes() {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(target: "triage_transformers", url, error = %e, "read body failed");
                return None;
            }
        };
        let content = bytes[..bytes.len().min(self.config.max_download)].to_vec();
        let hashdig = format!("{:x}", Sha256::digest(&content));

        Some(CompletedDownload {
            user_agent: user_agent.to_string(),
            content,
            hashdig,
        })
    }

    fn handle_url(&mut self, url: &str) -> Vec<Payload> {
        if self.is_in_recent_downloads(url) {
            return Vec::new();
        }

        let Ok(parsed) = url::Url::parse(url) else {
            tracing::error!(target: "triage_transformers", url, "urlparse failed");
            return Vec::new();
        };
        let domain = parsed.host_str().unwrap_or("").to_string();

        if self
            .config
            .domain_blacklist
            .iter()
            .any(|bl| domain.ends_with(bl.as_str()))
        {
            tracing::info!(target: "triage_transformers", url, domain, "skipping, domain blacklisted");
            return Vec::new();
        }

        if self.is_domain_overdrawn(&domain, self.config.domain_overdraw) {
            tracing::info!(target: "triage_transformers", url, domain, "skipping, domain overdrawn");
            return Vec::new();
        }

        let user_agents = self.config.user_agents.clone();
        let downloads: Vec<CompletedDownload> = user_agents
            .iter()
            .filter_map(|ua| self.complete_download(url, ua))
            .collect();

        let unique_hashes: HashSet<&str> = downloads.iter().map(|d| d.hashdig.as_str()).collect();
        let mut payloads = Vec::new();
        let mut log_entries = Vec::new();

        for hashdig in unique_hashes {
            let matching: Vec<&CompletedDownload> =
                downloads.iter().filter(|d| d.hashdig == hashdig).collect();
            let consolidated_ua = matching
                .iter()
                .map(|d| d.user_agent.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let content = matching[0].content.clone();
            let filetype = detect_filetype(&content);

            log_entries.push(Payload::LogEntry {
                log_data: format!(
                    "Downloaded url {url} hash {hashdig} user-agents {consolidated_ua}"
                ),
            });
            payloads.push(Payload::DownloadedBlob {
                url: url.to_string(),
                user_agents: vec![consolidated_ua],
                content,
                hashdig: hashdig.to_string(),
                filetype,
            });
        }

        if !payloads.is_empty() {
            self.add_to_recent_downloads(url);
            self.add_to_domain_draw(&domain);
        }

        payloads.extend(log_entries);
        payloads
    }
}

fn detect_filetype(content: &[u8]) -> String {
    infer::get(content)
        .map(|t| t.mime_type().to_string())
        .unwrap_or_else(|| "data".to_string())
}

impl Transformer for Downloader {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::UrlRef)
    }

    fn handle(&mut self, input: &Object) -> Vec<Payload> {
        match &input.payload {
            Payload::UrlRef { url } => self.handle_url(url),
            _ => Vec::new(),
        }
    }
}
