use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

use crate::models::{Outcome, Target};

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, target: &Target) -> Outcome;
}

pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, target: &Target) -> Outcome {
        let headers = match header_map(target) {
            Ok(headers) => headers,
            Err(reason) => return Outcome::failure(&target.url, reason),
        };

        match self.client.get(&target.url).headers(headers).send().await {
            Ok(resp) if resp.status().is_success() => Outcome::success(&target.url),
            Ok(resp) => Outcome::failure(&target.url, format!("HTTP {}", resp.status().as_u16())),
            Err(e) => {
                debug!(url = %target.url, error = %e, "Probe failed");
                Outcome::failure(&target.url, classify(&e))
            }
        }
    }
}

fn header_map(target: &Target) -> Result<HeaderMap, String> {
    let mut map = HeaderMap::with_capacity(target.headers.len());
    for (name, value) in &target.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| format!("invalid header {}", name))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| format!("invalid header {}", name))?;
        map.insert(name, value);
    }
    Ok(map)
}

/// Collapses a transport error into a short, low-cardinality reason.
fn classify(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "timeout".into();
    }
    if err.is_builder() {
        return "invalid url".into();
    }
    if err.is_connect() {
        let mut source = err.source();
        while let Some(cause) = source {
            if let Some(io) = cause.downcast_ref::<std::io::Error>() {
                match io.kind() {
                    std::io::ErrorKind::ConnectionRefused => return "connection refused".into(),
                    std::io::ErrorKind::TimedOut => return "timeout".into(),
                    _ => {}
                }
            }
            if cause.to_string().contains("dns error") {
                return "dns resolution failed".into();
            }
            source = cause.source();
        }
        return "connection failed".into();
    }
    "request failed".into()
}
