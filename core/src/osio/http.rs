//! HTTP-backed [`BackingStore`], talking to the `nmfs-objectd` object
//! store service. Mirrors the teacher's `api_client` idiom: typed async
//! functions driven through `runtime.block_on` from otherwise-synchronous
//! callers.

use super::BackingStore;
use crate::error::{Error, Result};
use reqwest::StatusCode;
use tokio::runtime::Handle;

#[derive(Clone)]
pub struct HttpBackingStore {
    client: reqwest::Client,
    base_url: String,
    rt: Handle,
}

impl HttpBackingStore {
    pub fn new(base_url: impl Into<String>, rt: Handle) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            rt,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/objects/{}", self.base_url, urlencoding_key(key))
    }

    fn lock_url(&self, object: &str) -> String {
        format!("{}/lock/{}", self.base_url, urlencoding_key(object))
    }
}

/// Backing-store keys never contain `/`, but `$` and `.` need no escaping
/// for axum's path extractor; we still percent-encode to be defensive.
fn urlencoding_key(key: &str) -> String {
    key.bytes()
        .map(|b| b as char)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '$' | '.' | '-' | '_') {
                c.to_string()
            } else {
                format!("%{:02X}", c as u8)
            }
        })
        .collect()
}

impl BackingStore for HttpBackingStore {
    fn read_obj(&self, key: &str, offset: u64, length: usize) -> Result<Vec<u8>> {
        let url = self.object_url(key);
        let client = self.client.clone();
        self.rt.block_on(async move {
            let resp = client
                .get(&url)
                .query(&[("offset", offset.to_string()), ("length", length.to_string())])
                .send()
                .await?;
            if resp.status() == StatusCode::NOT_FOUND {
                return Err(Error::NoEntry);
            }
            let resp = resp.error_for_status().map_err(Error::from)?;
            let bytes = resp.bytes().await?;
            Ok(bytes.to_vec())
        })
    }

    fn write_obj(&self, key: &str, offset: u64, data: &[u8]) -> Result<usize> {
        let url = self.object_url(key);
        let client = self.client.clone();
        let body = data.to_vec();
        let len = body.len();
        self.rt.block_on(async move {
            client
                .put(&url)
                .query(&[("offset", offset.to_string())])
                .body(body)
                .send()
                .await?
                .error_for_status()
                .map_err(Error::from)?;
            Ok(len)
        })
    }

    fn exist(&self, key: &str) -> Result<bool> {
        let url = self.object_url(key);
        let client = self.client.clone();
        self.rt.block_on(async move {
            let resp = client.head(&url).send().await?;
            match resp.status() {
                StatusCode::OK => Ok(true),
                StatusCode::NOT_FOUND => Ok(false),
                other => Err(Error::TransportFailure(format!("unexpected status {other}"))),
            }
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let url = self.object_url(key);
        let client = self.client.clone();
        self.rt.block_on(async move {
            let resp = client.delete(&url).send().await?;
            match resp.status() {
                StatusCode::OK | StatusCode::NOT_FOUND => Ok(()),
                other => Err(Error::TransportFailure(format!("unexpected status {other}"))),
            }
        })
    }

    fn lock(&self, object: &str, exclusive: bool) -> Result<()> {
        let url = self.lock_url(object);
        let client = self.client.clone();
        self.rt.block_on(async move {
            let resp = client
                .post(&url)
                .query(&[("exclusive", exclusive.to_string())])
                .send()
                .await?;
            match resp.status() {
                StatusCode::OK => Ok(()),
                StatusCode::CONFLICT => Err(Error::LockContended),
                other => Err(Error::TransportFailure(format!("unexpected status {other}"))),
            }
        })
    }

    fn unlock(&self, object: &str) -> Result<()> {
        let url = self.lock_url(object);
        let client = self.client.clone();
        self.rt.block_on(async move {
            client.delete(&url).send().await?.error_for_status().ok();
            Ok(())
        })
    }
}
