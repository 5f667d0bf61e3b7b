use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::channel::Channel;
use crate::error::{ChannelError, Result};

#[derive(Deserialize)]
struct ChannelRecord {
    #[serde(default)]
    alias: Option<String>,
    devices: BTreeMap<String, DeviceEntry>,
}

/// Where a channel publishes the image index of one device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyring: Option<Keyring>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyring {
    pub path: String,
    #[serde(default)]
    pub signature: String,
}

/// Booleans and the strings "true"/"false" in any case; other values are not hidden.
fn hidden_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Channel name without its leading distribution segment.
pub fn display_name_for(raw_name: &str) -> &str {
    match raw_name.split_once('/') {
        Some((_, rest)) if !rest.is_empty() => rest,
        _ => raw_name,
    }
}

/// Decodes the channel index into channels keyed by name.
///
/// Hidden channels are skipped before their record is decoded unless
/// `show_hidden` is set. Any channel that fails to decode fails the whole
/// index.
pub fn parse_manifest(body: &[u8], show_hidden: bool) -> Result<BTreeMap<String, Channel>> {
    let value: Value = serde_json::from_slice(body).map_err(|err| {
        warn!("Channel index is not valid JSON: {err}");
        ChannelError::malformed(format!("invalid JSON: {err}"))
    })?;

    let Value::Object(entries) = value else {
        warn!("Malformed manifest format: top-level value is not an object");
        return Err(ChannelError::malformed("top-level value is not an object"));
    };

    let mut channels = BTreeMap::new();
    for (name, raw) in entries {
        if !raw.is_object() {
            warn!("Channel {name} is not an object");
            return Err(ChannelError::malformed(format!(
                "channel {name} is not an object"
            )));
        }

        let hidden = raw.get("hidden").map(hidden_flag).unwrap_or(false);
        if hidden && !show_hidden {
            debug!("Skipping hidden channel {name}");
            continue;
        }

        let record: ChannelRecord = serde_json::from_value(raw).map_err(|err| {
            warn!("Failed to decode channel {name}: {err}");
            ChannelError::malformed(format!("channel {name}: {err}"))
        })?;
        let channel = Channel::new(name.clone(), record.alias, hidden, record.devices);
        channels.insert(name, channel);
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;

    const MANIFEST: &str = r#"{
        "ubuntu-touch/stable": {
            "devices": {
                "flo": {
                    "index": "/ubuntu-touch/stable/flo/index.json",
                    "keyring": {"path": "/gpg/device-flo.tar.xz", "signature": "/gpg/device-flo.tar.xz.asc"}
                }
            }
        },
        "ubuntu-touch/devel-proposed": {
            "hidden": true,
            "devices": {"flo": {"index": "/ubuntu-touch/devel-proposed/flo/index.json"}}
        },
        "ubuntu-touch/trusty": {
            "hidden": false,
            "alias": "ubuntu-touch/stable",
            "redirect": "ignored",
            "devices": {"flo": {"index": "/ubuntu-touch/trusty/flo/index.json"}}
        }
    }"#;

    #[test]
    fn test_parse_skips_hidden_by_default() {
        let channels = parse_manifest(MANIFEST.as_bytes(), false).unwrap();
        let names: Vec<_> = channels.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["ubuntu-touch/stable", "ubuntu-touch/trusty"]);

        let stable = &channels["ubuntu-touch/stable"];
        let keyring = stable.device_entry("flo").unwrap().keyring.as_ref().unwrap();
        assert_eq!(keyring.path, "/gpg/device-flo.tar.xz");
        assert_eq!(channels["ubuntu-touch/trusty"].alias(), Some("ubuntu-touch/stable"));
    }

    #[test]
    fn test_parse_keeps_hidden_when_asked() {
        let channels = parse_manifest(MANIFEST.as_bytes(), true).unwrap();
        assert_eq!(channels.len(), 3);
        assert!(channels["ubuntu-touch/devel-proposed"].is_hidden());
    }

    #[test]
    fn test_top_level_array_is_malformed() {
        let err = parse_manifest(br#"[{"stable": {}}]"#, false).unwrap_err();
        assert_eq!(err.kind(), Some(FailureKind::MalformedManifest));
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = parse_manifest(b"{\"stable\": ", false).unwrap_err();
        assert_eq!(err.kind(), Some(FailureKind::MalformedManifest));
    }

    #[test]
    fn test_non_object_channel_is_malformed() {
        let err = parse_manifest(br#"{"stable": "flo"}"#, true).unwrap_err();
        assert!(err.to_string().contains("stable"));
    }

    #[test]
    fn test_missing_devices_fails_whole_index() {
        let body = br#"{
            "a": {"devices": {"flo": {"index": "/a/flo/index.json"}}},
            "b": {"alias": "a"}
        }"#;
        let err = parse_manifest(body, false).unwrap_err();
        assert_eq!(err.kind(), Some(FailureKind::MalformedManifest));
    }

    #[test]
    fn test_hidden_channel_is_not_decoded_when_skipped() {
        let body = br#"{
            "a": {"devices": {"flo": {"index": "/a/flo/index.json"}}},
            "b": {"hidden": true}
        }"#;
        let channels = parse_manifest(body, false).unwrap();
        assert_eq!(channels.len(), 1);
        assert!(parse_manifest(body, true).is_err());
    }

    #[test]
    fn test_hidden_accepts_string_flags() {
        let body = br#"{
            "a": {"hidden": "true", "devices": {"flo": {"index": "/a/flo/index.json"}}},
            "b": {"hidden": "TRUE", "devices": {"flo": {"index": "/b/flo/index.json"}}},
            "c": {"hidden": "false", "devices": {"flo": {"index": "/c/flo/index.json"}}},
            "d": {"hidden": 1, "devices": {"flo": {"index": "/d/flo/index.json"}}}
        }"#;
        let channels = parse_manifest(body, false).unwrap();
        let names: Vec<_> = channels.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["c", "d"]);
        assert!(!channels["d"].is_hidden());

        let channels = parse_manifest(body, true).unwrap();
        assert_eq!(channels.len(), 4);
        assert!(channels["a"].is_hidden());
        assert!(channels["b"].is_hidden());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name_for("ubuntu-touch/stable"), "stable");
        assert_eq!(display_name_for("ubuntu-touch/ubuntu-pd/devel"), "ubuntu-pd/devel");
        assert_eq!(display_name_for("stable"), "stable");
        assert_eq!(display_name_for("trailing/"), "trailing/");
    }
}
