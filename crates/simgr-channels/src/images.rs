use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::channel::Channel;
use crate::download::{Download, DownloadError};

const FULL_IMAGE: &str = "full";

#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("channel {channel} has no entry for device {device}")]
    DeviceMissing { channel: String, device: String },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("device index {url} is empty")]
    Empty { url: String },

    #[error("device index {url} is malformed: {reason}")]
    Malformed { url: String, reason: String },

    #[error("device index {url} lists no full image")]
    NoFullImage { url: String },
}

/// One installable (full) image of a channel for a device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceImage {
    pub version: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version_detail: String,
    #[serde(default)]
    pub files: Vec<ImageFile>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    pub path: String,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub order: u32,
}

#[derive(Deserialize)]
struct DeviceIndex {
    images: Vec<IndexImage>,
}

#[derive(Deserialize)]
struct IndexImage {
    #[serde(rename = "type")]
    kind: String,
    version: u32,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version_detail: String,
    #[serde(default)]
    files: Vec<ImageFile>,
}

/// Loads the images a channel publishes for one device.
pub trait ImageLoader {
    fn load_device_images(
        &self,
        channel: &Channel,
        device: &str,
    ) -> impl Future<Output = Result<Vec<DeviceImage>, ImageLoadError>> + Send;
}

/// Reads the per-device `index.json` referenced by the channel entry.
pub struct IndexImageLoader<D> {
    downloader: D,
    base_url: String,
}

impl<D: Download> IndexImageLoader<D> {
    pub fn new(downloader: D, base_url: &str) -> Self {
        Self {
            downloader,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn downloader(&self) -> &D {
        &self.downloader
    }

    fn index_url(&self, index: &str) -> String {
        if index.starts_with("http://") || index.starts_with("https://") {
            index.to_string()
        } else if index.starts_with('/') {
            format!("{}{}", self.base_url, index)
        } else {
            format!("{}/{}", self.base_url, index)
        }
    }
}

impl<D: Download + Sync> ImageLoader for IndexImageLoader<D> {
    async fn load_device_images(
        &self,
        channel: &Channel,
        device: &str,
    ) -> Result<Vec<DeviceImage>, ImageLoadError> {
        let entry = channel
            .device_entry(device)
            .ok_or_else(|| ImageLoadError::DeviceMissing {
                channel: channel.raw_name().to_string(),
                device: device.to_string(),
            })?;
        let url = self.index_url(&entry.index);
        let body = self.downloader.download(&url, true).await?;
        if body.is_empty() {
            return Err(ImageLoadError::Empty { url });
        }
        let images = parse_device_index(&body, &url)?;
        debug!(
            "Channel {} has {} full image(s) for {device}",
            channel.raw_name(),
            images.len()
        );
        Ok(images)
    }
}

/// Keeps the full images of a device index, newest first.
pub(crate) fn parse_device_index(body: &[u8], url: &str) -> Result<Vec<DeviceImage>, ImageLoadError> {
    let index: DeviceIndex =
        serde_json::from_slice(body).map_err(|err| ImageLoadError::Malformed {
            url: url.to_string(),
            reason: err.to_string(),
        })?;

    let mut images = index
        .images
        .into_iter()
        .filter(|item| item.kind == FULL_IMAGE)
        .map(|item| {
            let mut files = item.files;
            files.sort_by_key(|file| file.order);
            DeviceImage {
                version: item.version,
                description: item.description,
                version_detail: item.version_detail,
                files,
            }
        })
        .collect::<Vec<_>>();
    if images.is_empty() {
        return Err(ImageLoadError::NoFullImage {
            url: url.to_string(),
        });
    }
    images.sort_by(|a, b| b.version.cmp(&a.version));
    Ok(images)
}
