//! Submits previously unseen executable downloads to VirusTotal. Mirrors
//! `VirusTotalReemitterModule`, including its class-wide (not per-instance)
//! rate limiter.

use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use serde::Deserialize;

use triage_protocol::{Kind, Object, Payload};
use triage_worker::Transformer;

const VT_API_RATE: Duration = Duration::from_secs(15);
const REPORT_URL: &str = "https://www.virustotal.com/vtapi/v2/file/report";
const SCAN_URL: &str = "https://www.virustotal.com/vtapi/v2/file/scan";

fn last_api_req() -> &'static Mutex<Option<Instant>> {
    static LAST: OnceLock<Mutex<Option<Instant>>> = OnceLock::new();
    LAST.get_or_init(|| Mutex::new(None))
}

/// Blocks the calling thread until at least `VT_API_RATE` has elapsed since
/// the previous call from any instance of this module.
fn rate_limit() {
    let mut last = last_api_req().lock().unwrap_or_else(|p| p.into_inner());
    let now = Instant::now();
    if let Some(prev) = *last {
        let elapsed = now.duration_since(prev);
        if elapsed < VT_API_RATE {
            thread::sleep(VT_API_RATE - elapsed);
        }
    }
    *last = Some(Instant::now());
}

#[derive(Deserialize)]
struct ReportResponse {
    response_code: i32,
}

#[derive(Deserialize)]
struct ScanResponse {
    response_code: i32,
    verbose_msg: String,
}

pub struct VirusTotalSubmitter {
    api_key: String,
    client: reqwest::blocking::Client,
}

impl VirusTotalSubmitter {
    pub fn new(api_key: impl Into<String>) -> Self {
        VirusTotalSubmitter {
            api_key: api_key.into(),
            client: reqwest::blocking::Client::new(),
        }
    }

    fn is_right_filetype(filetype: &str) -> bool {
        filetype.contains("Executable") || filetype.contains("executable")
    }

    fn report_present(&self, hashdig: &str) -> anyhow::Result<bool> {
        rate_limit();
        let resp: ReportResponse = self
            .client
            .get(REPORT_URL)
            .query(&[("apikey", self.api_key.as_str()), ("resource", hashdig)])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.response_code == 1)
    }

    fn submit_bin(&self, url: &str, content: &[u8]) -> anyhow::Result<ScanResponse> {
        rate_limit();
        let part = reqwest::blocking::multipart::Part::bytes(content.to_vec())
            .file_name(url.to_string());
        let form = reqwest::blocking::multipart::Form::new().part("file", part);
        let resp: ScanResponse = self
            .client
            .post(SCAN_URL)
            .query(&[("apikey", self.api_key.as_str())])
            .multipart(form)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp)
    }
}

impl Transformer for VirusTotalSubmitter {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::DownloadedBlob)
    }

    fn handle(&mut self, input: &Object) -> Vec<Payload> {
        let Payload::DownloadedBlob {
            url,
            content,
            hashdig,
            filetype,
            ..
        } = &input.payload
        else {
            return Vec::new();
        };

        if !Self::is_right_filetype(filetype) {
            tracing::info!(target: "triage_transformers", url, "wrong filetype for VT submission");
            return Vec::new();
        }

        match self.report_present(hashdig) {
            Ok(true) => {
                tracing::info!(target: "triage_transformers", hashdig, "hash already submitted");
                return Vec::new();
            }
            Ok(false) => {}
            Err(e) => {
                tracing::error!(target: "triage_transformers", error = %e, "VT report check failed");
                return Vec::new();
            }
        }

        match self.submit_bin(url, content) {
            Ok(resp) => vec![Payload::LogEntry {
                log_data: format!(
                    "Submitted URL {url} hash {hashdig} to VirusTotal with response code {} response {}",
                    resp.response_code, resp.verbose_msg,
                ),
            }],
            Err(e) => {
                tracing::error!(target: "triage_transformers", error = %e, "VT submission failed");
                Vec::new()
            }
        }
    }
}
