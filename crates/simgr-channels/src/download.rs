use std::future::Future;

use futures_util::StreamExt;
use reqwest::{header::USER_AGENT, Client};
use thiserror::Error;
use tracing::{debug, warn};

use crate::device::Device;
use crate::error::{ChannelError, Result};

const AGENT: &str = concat!("simgr/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },

    #[error("reading {url} failed: {source}")]
    Read {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Transport used for the channel index and the per-device image indexes.
///
/// `device_specific` marks requests whose answer depends on the device being
/// served; what that means on the wire is up to the implementation.
pub trait Download {
    fn download(
        &self,
        url: &str,
        device_specific: bool,
    ) -> impl Future<Output = std::result::Result<Vec<u8>, DownloadError>> + Send;
}

#[derive(Clone)]
pub struct HttpDownloader {
    client: Client,
    device: Option<String>,
}

impl HttpDownloader {
    pub fn new() -> std::result::Result<Self, DownloadError> {
        let client = Client::builder().build().map_err(DownloadError::Client)?;
        Ok(Self {
            client,
            device: None,
        })
    }

    /// Device-specific requests carry the device name in the user agent.
    pub fn for_device(device: &Device) -> std::result::Result<Self, DownloadError> {
        let mut downloader = Self::new()?;
        downloader.device = Some(device.name().to_string());
        Ok(downloader)
    }

    fn user_agent(&self, device_specific: bool) -> String {
        match (&self.device, device_specific) {
            (Some(device), true) => format!("{AGENT} ({device})"),
            _ => AGENT.to_string(),
        }
    }
}

impl Download for HttpDownloader {
    async fn download(
        &self,
        url: &str,
        device_specific: bool,
    ) -> std::result::Result<Vec<u8>, DownloadError> {
        debug!("Downloading {url}");
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent(device_specific))
            .send()
            .await
            .map_err(|source| DownloadError::Request {
                url: url.to_string(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let mut body = Vec::with_capacity(8192);
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| DownloadError::Read {
                url: url.to_string(),
                source,
            })?;
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

/// Downloads the channel index. Transport errors and empty bodies are both
/// reported as [`ChannelError::FetchFailed`].
pub async fn fetch_manifest<D: Download>(downloader: &D, url: &str) -> Result<Vec<u8>> {
    let body = match downloader.download(url, true).await {
        Ok(body) => body,
        Err(err) => {
            warn!("Failed to download channel index {url}: {err}");
            return Err(ChannelError::FetchFailed {
                url: url.to_string(),
                reason: err.to_string(),
            });
        }
    };
    if body.is_empty() {
        warn!("Channel index {url} is empty");
        return Err(ChannelError::FetchFailed {
            url: url.to_string(),
            reason: "empty response".into(),
        });
    }
    Ok(body)
}
