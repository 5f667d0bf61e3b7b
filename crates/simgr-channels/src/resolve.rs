use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelSet};
use crate::device::Device;
use crate::download::{fetch_manifest, Download, DownloadError, HttpDownloader};
use crate::error::{ChannelError, Result};
use crate::images::{ImageLoader, IndexImageLoader};
use crate::manifest::parse_manifest;

/// Resolves a downloaded channel index for `device`.
///
/// A channel survives when it lists the device or its base variant. An alias
/// channel is folded into its target when the target survived and is not an
/// alias of another survivor itself; the target keeps the alias name in its
/// duplicates. Aliases are followed one hop only, so the head of a chain stays
/// on its own. In an alias cycle the smallest name is treated as the original.
/// Survivors then load their device images in name order and the first failure
/// aborts the whole resolution.
pub async fn resolve<L: ImageLoader>(
    body: &[u8],
    device: &Device,
    show_hidden: bool,
    loader: &L,
) -> Result<ChannelSet> {
    let parsed = parse_manifest(body, show_hidden)?;

    let mut matched: BTreeMap<String, (Channel, String)> = BTreeMap::new();
    for (name, channel) in parsed {
        match matched_device(&channel, device) {
            Some(dev_name) => {
                let dev_name = dev_name.to_string();
                matched.insert(name, (channel, dev_name));
            }
            None => debug!("Channel {name} has no images for {}", device.name()),
        }
    }

    let anchors = cycle_anchors(&matched);

    let mut folded: BTreeSet<String> = BTreeSet::new();
    let mut duplicates: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for name in matched.keys() {
        let Some(target) = resolved_alias(&matched, &anchors, name) else {
            if let Some(target) = matched[name].0.alias() {
                debug!("Alias {target} of channel {name} is not folded, keeping {name}");
            }
            continue;
        };
        if resolved_alias(&matched, &anchors, target).is_some() {
            debug!("Alias {target} of channel {name} is an alias itself, keeping {name}");
            continue;
        }
        debug!("Channel {name} is an alias of {target}");
        folded.insert(name.clone());
        duplicates
            .entry(target.to_string())
            .or_default()
            .push(name.clone());
    }

    let mut resolved = BTreeMap::new();
    for (name, (mut channel, dev_name)) in matched {
        if folded.contains(&name) {
            continue;
        }
        for dup in duplicates.remove(&name).unwrap_or_default() {
            channel.add_duplicate(&dup);
        }

        let images = match loader.load_device_images(&channel, &dev_name).await {
            Ok(images) => images,
            Err(err) => {
                warn!("Failed to load images of channel {name} for {dev_name}: {err}");
                return Err(ChannelError::ImageLoadFailed {
                    channel: name,
                    device: dev_name,
                    reason: err.to_string(),
                });
            }
        };
        channel.set_images(&dev_name, images);
        debug!("Got channel: {}", channel.display_name());
        resolved.insert(name, channel);
    }

    info!(
        "Resolved {} channel(s) for device {}",
        resolved.len(),
        device.name()
    );
    Ok(ChannelSet::from_map(resolved))
}

/// Smallest name of every alias cycle among the matched channels. Anchors
/// keep their place and the rest of the cycle folds into them.
fn cycle_anchors(matched: &BTreeMap<String, (Channel, String)>) -> BTreeSet<String> {
    let mut anchors = BTreeSet::new();
    for start in matched.keys() {
        let mut current = start.as_str();
        let mut cycle = vec![current];
        for _ in 0..matched.len() {
            let next = matched
                .get(current)
                .and_then(|(channel, _)| channel.alias())
                .filter(|target| matched.contains_key(*target));
            let Some(next) = next else {
                break;
            };
            if next == start.as_str() {
                if let Some(anchor) = cycle.iter().min() {
                    anchors.insert(anchor.to_string());
                }
                break;
            }
            if cycle.contains(&next) {
                break;
            }
            cycle.push(next);
            current = next;
        }
    }
    anchors
}

/// Alias target of `name` when that target is among the matched channels.
fn resolved_alias<'a>(
    matched: &'a BTreeMap<String, (Channel, String)>,
    anchors: &BTreeSet<String>,
    name: &str,
) -> Option<&'a str> {
    if anchors.contains(name) {
        return None;
    }
    matched
        .get(name)
        .and_then(|(channel, _)| channel.alias())
        .filter(|target| matched.contains_key(*target))
}

fn matched_device<'a>(channel: &Channel, device: &'a Device) -> Option<&'a str> {
    if channel.has_device(device.name()) {
        return Some(device.name());
    }
    let fallback = device.fallback_name();
    if channel.has_device(fallback) {
        return Some(fallback);
    }
    None
}

/// Fetches the channel index and resolves it.
pub struct Resolver<D, L> {
    downloader: D,
    loader: L,
    channels_url: String,
}

impl<D: Download, L: ImageLoader> Resolver<D, L> {
    pub fn new(downloader: D, loader: L, channels_url: &str) -> Self {
        Self {
            downloader,
            loader,
            channels_url: channels_url.to_string(),
        }
    }

    pub fn channels_url(&self) -> &str {
        &self.channels_url
    }

    /// Each call starts from scratch; nothing from a previous call is reused.
    pub async fn download_and_resolve(
        &self,
        device: &Device,
        show_hidden: bool,
    ) -> Result<ChannelSet> {
        let body = fetch_manifest(&self.downloader, &self.channels_url).await?;
        resolve(&body, device, show_hidden, &self.loader).await
    }
}

impl Resolver<HttpDownloader, IndexImageLoader<HttpDownloader>> {
    pub fn http(
        device: &Device,
        channels_url: &str,
        base_url: &str,
    ) -> std::result::Result<Self, DownloadError> {
        let downloader = HttpDownloader::for_device(device)?;
        let loader = IndexImageLoader::new(downloader.clone(), base_url);
        Ok(Self::new(downloader, loader, channels_url))
    }
}
