use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Serialize;

pub const SETTINGS_FILE: &str = "settings.json";

pub fn env_override(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Interprets the usual spellings of a boolean switch; anything else is `None`.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn env_flag(key: &str) -> Option<bool> {
    env_override(key).and_then(|value| parse_flag(&value))
}

pub fn data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/simgr")
    } else {
        PathBuf::from("/tmp/simgr")
    }
}

pub fn settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE)
}

pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let rest = path.strip_prefix("~/").unwrap_or("");
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Installs the stderr subscriber. `RUST_LOG` directives refine the `info` default.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Sample {
        name: String,
        enabled: bool,
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("ON"), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_flag(""), None);
    }

    #[test]
    fn test_write_json_atomic_creates_parents() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested/dir/sample.json");
        let value = Sample {
            name: "stable".into(),
            enabled: true,
        };

        write_json_atomic(&path, &value).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let back: Sample = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, value);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_write_json_atomic_replaces_existing() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("sample.json");
        fs::write(&path, "garbage").unwrap();

        let value = Sample {
            name: "devel".into(),
            enabled: false,
        };
        write_json_atomic(&path, &value).unwrap();

        let back: Sample = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.name, "devel");
    }

    #[test]
    fn test_expand_user_leaves_plain_paths() {
        assert_eq!(expand_user("/opt/adb"), PathBuf::from("/opt/adb"));
        assert_eq!(expand_user("relative/adb"), PathBuf::from("relative/adb"));
    }
}
