use std::{io, path::PathBuf, process::Output, time::Duration};

use tokio::process::Command;

const PROP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub(crate) enum AdbFailure {
    NotFound,
    Io(String),
    Timeout,
    Exit {
        status: i32,
        stdout: String,
        stderr: String,
    },
    EmptyProp(String),
}

pub(crate) fn adb_path() -> PathBuf {
    if let Ok(path) = std::env::var("SIMGR_ADB_PATH") {
        return simgr_util::expand_user(&path);
    }
    if let Ok(path) = std::env::var("ADB_PATH") {
        return simgr_util::expand_user(&path);
    }
    if let Ok(sdk_root) =
        std::env::var("ANDROID_SDK_ROOT").or_else(|_| std::env::var("ANDROID_HOME"))
    {
        let candidate = PathBuf::from(&sdk_root).join("platform-tools").join("adb");
        if candidate.exists() {
            return candidate;
        }
        let candidate = PathBuf::from(&sdk_root)
            .join("platform-tools")
            .join("adb.exe");
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from("adb")
}

fn adb_args<'a>(serial: Option<&'a str>, args: &[&'a str]) -> Vec<&'a str> {
    let mut full = Vec::with_capacity(args.len() + 2);
    if let Some(serial) = serial.filter(|s| !s.trim().is_empty()) {
        full.push("-s");
        full.push(serial);
    }
    full.extend_from_slice(args);
    full
}

pub(crate) async fn adb_output(serial: Option<&str>, args: &[&str]) -> Result<Output, AdbFailure> {
    let mut cmd = Command::new(adb_path());
    cmd.args(adb_args(serial, args))
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped());
    let output = cmd.output().await.map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            AdbFailure::NotFound
        } else {
            AdbFailure::Io(e.to_string())
        }
    })?;

    if output.status.success() {
        Ok(output)
    } else {
        Err(AdbFailure::Exit {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

pub(crate) fn format_adb_output(stdout: &str, stderr: &str) -> String {
    let stdout = stdout.trim();
    let stderr = stderr.trim();
    let mut out = String::new();

    if !stdout.is_empty() {
        out.push_str("stdout:\n");
        out.push_str(stdout);
        out.push('\n');
    }
    if !stderr.is_empty() {
        out.push_str("stderr:\n");
        out.push_str(stderr);
        out.push('\n');
    }

    out
}

pub(crate) fn adb_failure_message(err: &AdbFailure) -> String {
    match err {
        AdbFailure::NotFound => "adb not found (set SIMGR_ADB_PATH or ANDROID_SDK_ROOT)".into(),
        AdbFailure::Io(msg) => msg.clone(),
        AdbFailure::Timeout => "adb did not answer in time".into(),
        AdbFailure::Exit {
            status,
            stdout,
            stderr,
        } => {
            let detail = format_adb_output(stdout, stderr);
            if detail.trim().is_empty() {
                format!("adb command failed with exit {status}")
            } else {
                format!("adb command failed with exit {status}: {}", detail.trim())
            }
        }
        AdbFailure::EmptyProp(prop) => format!("device reported no value for {prop}"),
    }
}

impl std::fmt::Display for AdbFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&adb_failure_message(self))
    }
}

impl std::error::Error for AdbFailure {}

pub(crate) async fn adb_get_prop(serial: Option<&str>, prop: &str) -> Result<String, AdbFailure> {
    let args = ["shell", "getprop", prop];
    let output = match tokio::time::timeout(PROP_TIMEOUT, adb_output(serial, &args)).await {
        Ok(result) => result?,
        Err(_) => return Err(AdbFailure::Timeout),
    };
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        return Err(AdbFailure::EmptyProp(prop.to_string()));
    }
    Ok(value)
}

/// Product device name (`ro.product.device`) of the connected device.
pub(crate) async fn probe_device_name(serial: Option<&str>) -> Result<String, AdbFailure> {
    adb_get_prop(serial, "ro.product.device").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_with_serial() {
        assert_eq!(
            adb_args(Some("emulator-5554"), &["shell", "getprop", "ro.product.device"]),
            vec!["-s", "emulator-5554", "shell", "getprop", "ro.product.device"]
        );
    }

    #[test]
    fn test_args_without_serial() {
        assert_eq!(adb_args(None, &["devices"]), vec!["devices"]);
        assert_eq!(adb_args(Some("  "), &["devices"]), vec!["devices"]);
    }

    #[test]
    fn test_failure_messages() {
        let exit = AdbFailure::Exit {
            status: 1,
            stdout: String::new(),
            stderr: "error: no devices/emulators found\n".into(),
        };
        assert_eq!(
            adb_failure_message(&exit),
            "adb command failed with exit 1: stderr:\nerror: no devices/emulators found"
        );

        let bare = AdbFailure::Exit {
            status: 255,
            stdout: " ".into(),
            stderr: String::new(),
        };
        assert_eq!(adb_failure_message(&bare), "adb command failed with exit 255");
        assert!(AdbFailure::NotFound.to_string().contains("SIMGR_ADB_PATH"));
    }
}
