//! Built-in transformers: URL extractor, downloader, VirusTotal submitter.

pub mod downloader;
pub mod error;
pub mod url_extractor;
pub mod virustotal;

pub use downloader::{Downloader, DownloaderConfig};
pub use error::{Result, TransformError};
pub use url_extractor::UrlExtractor;
pub use virustotal::VirusTotalSubmitter;

use std::time::Duration;

use triage_worker::args::{opt_i64, opt_str_list, require_str};
use triage_worker::Registry;

pub fn register_all(registry: &mut Registry) -> triage_worker::Result<()> {
    registry.register_transformer(
        "URLParser",
        Box::new(|_args| Ok(Box::new(UrlExtractor::new()))),
    )?;

    registry.register_transformer(
        "DownloadURL",
        Box::new(|args| {
            let max_download = opt_i64(args, "max_download", 1024 * 1024) as usize;
            let user_agents = opt_str_list(args, "user_agents");
            let domain_blacklist = opt_str_list(args, "domain_blacklist");
            let domain_overdraw =
                opt_i64(args, "domain_overdraw", downloader::MAX_DLS_FROM_DOMAIN as i64) as u64;
            let get_timeout = Duration::from_secs(
                opt_i64(args, "get_timeout", downloader::DEFAULT_GET_TIMEOUT.as_secs() as i64)
                    as u64,
            );
            Ok(Box::new(Downloader::new(DownloaderConfig {
                max_download,
                user_agents,
                domain_blacklist,
                domain_overdraw,
                get_timeout,
            })))
        }),
    )?;

    registry.register_transformer(
        "VirusTotal",
        Box::new(|args| {
            let api_key = require_str(args, "api_key")?;
            Ok(Box::new(VirusTotalSubmitter::new(api_key)))
        }),
    )?;

    Ok(())
}
