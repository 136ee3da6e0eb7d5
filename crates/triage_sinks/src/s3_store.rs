//! Uploads each DownloadedBlob to S3 keyed by SHA-256, keeping a locally
//! cached bucket listing refreshed at most once every 24h so most objects
//! don't need a HEAD/GET round trip to dedupe. Mirrors `S3StoreDownloadedObject`.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use triage_protocol::{Kind, Object, Payload};
use triage_worker::Sink;

const MAX_LIST_AGE: Duration = Duration::from_secs(60 * 60 * 24);

pub struct S3StoreSink {
    bucket: String,
    client: Client,
    rt: tokio::runtime::Runtime,
    cached_list: Option<(Instant, HashSet<String>)>,
}

impl S3StoreSink {
    pub fn new(bucket: impl Into<String>, region: Option<String>) -> anyhow::Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let client = rt.block_on(async {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(aws_config::Region::new(region));
            }
            let config = loader.load().await;
            Client::new(&config)
        });
        Ok(S3StoreSink {
            bucket: bucket.into(),
            client,
            rt,
            cached_list: None,
        })
    }

    fn refresh_list(&mut self) {
        tracing::debug!(target: "triage_sinks", "updating S3 bucket file list");
        let bucket = self.bucket.clone();
        let client = self.client.clone();
        let keys: HashSet<String> = self.rt.block_on(async move {
            let mut keys = HashSet::new();
            let mut continuation_token = None;
            loop {
                let mut req = client.list_objects_v2().bucket(&bucket);
                if let Some(token) = &continuation_token {
                    req = req.continuation_token(token);
                }
                let resp = match req.send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::error!(target: "triage_sinks", error = %e, "list_objects_v2 failed");
                        break;
                    }
                };
                for obj in resp.contents() {
                    if let Some(key) = obj.key() {
                        keys.insert(key.to_string());
                    }
                }
                continuation_token = resp.next_continuation_token().map(str::to_string);
                if continuation_token.is_none() {
                    break;
                }
            }
            keys
        });
        self.cached_list = Some((Instant::now(), keys));
    }

    fn bucket_contains(&mut self, key: &str) -> bool {
        let stale = match &self.cached_list {
            None => true,
            Some((ts, _)) => ts.elapsed() > MAX_LIST_AGE,
        };
        if stale {
            self.refresh_list();
        }
        self.cached_list
            .as_ref()
            .map(|(_, keys)| keys.contains(key))
            .unwrap_or(false)
    }
}

impl Sink for S3StoreSink {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::DownloadedBlob)
    }

    fn handle(&mut self, input: &Object) {
        let Payload::DownloadedBlob { hashdig, content, .. } = &input.payload else {
            return;
        };
        if self.bucket_contains(hashdig) {
            tracing::info!(target: "triage_sinks", hashdig, "already present, not uploaded to S3");
            return;
        }

        let bucket = self.bucket.clone();
        let client = self.client.clone();
        let key = hashdig.clone();
        let body = content.clone();
        let result = self.rt.block_on(async move {
            client
                .put_object()
                .bucket(bucket)
                .key(&key)
                .body(ByteStream::from(body))
                .send()
                .await
        });

        match result {
            Ok(_) => {
                tracing::info!(target: "triage_sinks", hashdig, "uploaded to S3");
                if let Some((_, keys)) = &mut self.cached_list {
                    keys.insert(hashdig.clone());
                }
            }
            Err(e) => tracing::error!(target: "triage_sinks", hashdig, error = %e, "S3 upload failed"),
        }
    }
}
