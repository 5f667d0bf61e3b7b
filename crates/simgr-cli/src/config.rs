use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};
use simgr_channels::{BASE_URL, CHANNELS_URL};
use simgr_util::{env_flag, env_override, parse_flag, settings_path, write_json_atomic};
use tracing::warn;

const CHANNELS_URL_ENV: &str = "SIMGR_CHANNELS_URL";
const BASE_URL_ENV: &str = "SIMGR_BASE_URL";
const SHOW_HIDDEN_ENV: &str = "SIMGR_SHOW_HIDDEN";
const ADB_SERIAL_ENV: &str = "SIMGR_ADB_SERIAL";

pub(crate) const KEYS: &[&str] = &["channels_url", "base_url", "show_hidden", "adb_serial"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) channels_url: String,
    pub(crate) base_url: String,
    pub(crate) show_hidden: bool,
    pub(crate) adb_serial: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            channels_url: CHANNELS_URL.into(),
            base_url: BASE_URL.into(),
            show_hidden: false,
            adb_serial: String::new(),
        }
    }
}

impl Settings {
    /// Settings file values, with environment variables taking precedence.
    pub(crate) fn load() -> Self {
        let mut cfg = Self::load_file(&settings_path());
        if let Some(url) = env_override(CHANNELS_URL_ENV) {
            cfg.channels_url = url;
        }
        if let Some(url) = env_override(BASE_URL_ENV) {
            cfg.base_url = url;
        }
        if let Some(show_hidden) = env_flag(SHOW_HIDDEN_ENV) {
            cfg.show_hidden = show_hidden;
        }
        if let Some(serial) = env_override(ADB_SERIAL_ENV) {
            cfg.adb_serial = serial;
        }
        cfg
    }

    /// Reads only the file. Missing or unreadable files give the defaults.
    pub(crate) fn load_file(path: &Path) -> Self {
        let mut cfg = Settings::default();
        match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<Settings>(&data) {
                Ok(file_cfg) => {
                    if !file_cfg.channels_url.is_empty() {
                        cfg.channels_url = file_cfg.channels_url;
                    }
                    if !file_cfg.base_url.is_empty() {
                        cfg.base_url = file_cfg.base_url;
                    }
                    cfg.show_hidden = file_cfg.show_hidden;
                    cfg.adb_serial = file_cfg.adb_serial;
                }
                Err(err) => warn!("Failed to parse {}: {err}", path.display()),
            },
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}", path.display());
                }
            }
        }
        cfg
    }

    pub(crate) fn save_to(&self, path: &Path) -> io::Result<()> {
        write_json_atomic(path, self)
    }

    pub(crate) fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "channels_url" => self.channels_url = non_empty(key, value)?,
            "base_url" => self.base_url = non_empty(key, value)?,
            "show_hidden" => {
                self.show_hidden = parse_flag(value)
                    .ok_or_else(|| format!("show_hidden expects true or false, got '{value}'"))?
            }
            "adb_serial" => self.adb_serial = value.trim().to_string(),
            _ => {
                return Err(format!(
                    "unknown setting '{key}' (expected one of: {})",
                    KEYS.join(", ")
                ))
            }
        }
        Ok(())
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{key} must not be empty"));
    }
    Ok(value.to_string())
}
