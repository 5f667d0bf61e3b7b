//! Resolution of system-image channels for a single Android device.
//!
//! The channel index is a JSON object keyed by channel name. Resolving it for a
//! [`Device`] drops hidden channels (unless asked not to), drops channels that
//! do not ship images for the device or its base variant, folds alias channels
//! into the channel they duplicate and finally loads the device image index of
//! every remaining channel.

mod channel;
mod device;
mod download;
mod error;
mod images;
mod manifest;
mod resolve;
#[cfg(test)]
mod testing;

pub use channel::{Channel, ChannelSet};
pub use device::{base_variant_of, Device};
pub use download::{fetch_manifest, Download, DownloadError, HttpDownloader};
pub use error::{ChannelError, FailureKind, Result};
pub use images::{DeviceImage, ImageFile, ImageLoadError, ImageLoader, IndexImageLoader};
pub use manifest::{display_name_for, parse_manifest, DeviceEntry, Keyring};
pub use resolve::{resolve, Resolver};

pub const BASE_URL: &str = "http://system-image.ubuntu.com";
pub const CHANNELS_URL: &str = "http://system-image.ubuntu.com/channels.json";
