use std::collections::BTreeMap;

use serde::Serialize;

use crate::images::DeviceImage;
use crate::manifest::{display_name_for, DeviceEntry};

/// A named image line from the channel index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Channel {
    raw_name: String,
    display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    hidden: bool,
    devices: BTreeMap<String, DeviceEntry>,
    duplicates: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved_device: Option<String>,
    images: Vec<DeviceImage>,
}

impl Channel {
    pub(crate) fn new(
        raw_name: String,
        alias: Option<String>,
        hidden: bool,
        devices: BTreeMap<String, DeviceEntry>,
    ) -> Self {
        let display_name = display_name_for(&raw_name).to_string();
        let alias = alias.filter(|alias| !alias.is_empty() && *alias != raw_name);
        Self {
            raw_name,
            display_name,
            alias,
            hidden,
            devices,
            duplicates: Vec::new(),
            resolved_device: None,
            images: Vec::new(),
        }
    }

    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn has_device(&self, device: &str) -> bool {
        self.devices.contains_key(device)
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn device_entry(&self, device: &str) -> Option<&DeviceEntry> {
        self.devices.get(device)
    }

    /// Raw names of alias channels folded into this one.
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// Device name the images were loaded for; the base variant when the
    /// primary name is not listed.
    pub fn resolved_device(&self) -> Option<&str> {
        self.resolved_device.as_deref()
    }

    pub fn images(&self) -> &[DeviceImage] {
        &self.images
    }

    pub fn latest_image(&self) -> Option<&DeviceImage> {
        self.images.first()
    }

    pub(crate) fn add_duplicate(&mut self, raw_name: &str) {
        if !self.duplicates.iter().any(|item| item == raw_name) {
            self.duplicates.push(raw_name.to_string());
        }
    }

    pub(crate) fn set_images(&mut self, device: &str, images: Vec<DeviceImage>) {
        self.resolved_device = Some(device.to_string());
        self.images = images;
    }
}

/// Resolved channels ordered by raw name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChannelSet {
    channels: BTreeMap<String, Channel>,
}

impl ChannelSet {
    pub(crate) fn from_map(channels: BTreeMap<String, Channel>) -> Self {
        Self { channels }
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Channel> {
        self.channels
    }
}

impl<'a> IntoIterator for &'a ChannelSet {
    type Item = &'a Channel;
    type IntoIter = std::collections::btree_map::Values<'a, String, Channel>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: &str) -> DeviceEntry {
        DeviceEntry {
            index: index.into(),
            keyring: None,
        }
    }

    #[test]
    fn test_self_alias_and_empty_alias_are_dropped() {
        let c = Channel::new("stable".into(), Some("stable".into()), false, BTreeMap::new());
        assert_eq!(c.alias(), None);
        let c = Channel::new("stable".into(), Some(String::new()), false, BTreeMap::new());
        assert_eq!(c.alias(), None);
    }

    #[test]
    fn test_duplicates_are_unique() {
        let mut c = Channel::new("stable".into(), None, false, BTreeMap::new());
        c.add_duplicate("rc");
        c.add_duplicate("rc");
        c.add_duplicate("trusty");
        assert_eq!(c.duplicates(), ["rc".to_string(), "trusty".to_string()]);
    }

    #[test]
    fn test_device_lookup() {
        let mut devices = BTreeMap::new();
        devices.insert("flo".to_string(), entry("/flo/index.json"));
        devices.insert("mako".to_string(), entry("/mako/index.json"));
        let c = Channel::new("ubuntu-touch/devel".into(), None, true, devices);

        assert!(c.has_device("flo"));
        assert!(!c.has_device("deb"));
        assert!(c.is_hidden());
        assert_eq!(c.display_name(), "devel");
        assert_eq!(c.device_names().collect::<Vec<_>>(), vec!["flo", "mako"]);
        assert_eq!(c.device_entry("mako").unwrap().index, "/mako/index.json");
        assert!(c.latest_image().is_none());
    }
}
