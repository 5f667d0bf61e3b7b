mod adb;
mod config;

use clap::{Parser, Subcommand};
use simgr_channels::{ChannelSet, Device, Resolver};
use tracing::warn;

use config::Settings;

#[derive(Parser)]
#[command(name = "simgr", version, about = "System-image channel resolver")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Channel commands
    Channels {
        #[command(subcommand)]
        cmd: ChannelsCmd,
    },
    /// Device commands
    Device {
        #[command(subcommand)]
        cmd: DeviceCmd,
    },
    /// Settings commands
    Config {
        #[command(subcommand)]
        cmd: ConfigCmd,
    },
}

#[derive(Subcommand)]
enum ChannelsCmd {
    /// List the channels available for a device
    List {
        /// Device name; probed over adb when omitted
        #[arg(long)]
        device: Option<String>,
        /// Device whose images the device can run when it is not listed itself
        #[arg(long, requires = "device")]
        base_variant: Option<String>,
        /// adb serial used when probing
        #[arg(long)]
        serial: Option<String>,
        /// Include hidden channels regardless of the saved setting
        #[arg(long)]
        show_hidden: bool,
        /// Channel index URL
        #[arg(long)]
        url: Option<String>,
        /// Base URL of the device image indexes
        #[arg(long)]
        base_url: Option<String>,
        /// Print the resolved channels as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum DeviceCmd {
    /// Read the device name of the connected device
    Probe {
        #[arg(long)]
        serial: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCmd {
    /// Print the effective settings
    Show,
    /// Print the settings file location
    Path,
    /// Change one setting
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    simgr_util::init_tracing()?;
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Channels { cmd } => match cmd {
            ChannelsCmd::List {
                device,
                base_variant,
                serial,
                show_hidden,
                url,
                base_url,
                json,
            } => {
                let settings = Settings::load();
                let device = match device {
                    Some(name) => match base_variant {
                        Some(base) => Device::with_base_variant(&name, &base)?,
                        None => Device::new(&name)?,
                    },
                    None => {
                        let serial = serial.unwrap_or_else(|| settings.adb_serial.clone());
                        let name = adb::probe_device_name(Some(serial.as_str())).await?;
                        Device::new(&name)?
                    }
                };
                let channels_url = url.unwrap_or_else(|| settings.channels_url.clone());
                let base_url = base_url.unwrap_or_else(|| settings.base_url.clone());
                let show_hidden = show_hidden || settings.show_hidden;

                let resolver = Resolver::http(&device, &channels_url, &base_url)?;
                match resolver.download_and_resolve(&device, show_hidden).await {
                    Ok(set) => print_channels(&set, json)?,
                    Err(err) => {
                        warn!("Unable to load channel list: {err}");
                        eprintln!("Unable to load channel list: {err}");
                        std::process::exit(err.exit_code());
                    }
                }
            }
        },

        Cmd::Device { cmd } => match cmd {
            DeviceCmd::Probe { serial } => {
                let serial = serial.unwrap_or_else(|| Settings::load().adb_serial);
                let name = adb::probe_device_name(Some(serial.as_str())).await?;
                let device = Device::new(&name)?;
                println!(
                    "device={}\tbase_variant={}",
                    device.name(),
                    device.base_variant().unwrap_or("-")
                );
            }
        },

        Cmd::Config { cmd } => match cmd {
            ConfigCmd::Show => {
                println!("{}", serde_json::to_string_pretty(&Settings::load())?);
            }
            ConfigCmd::Path => {
                println!("{}", simgr_util::settings_path().display());
            }
            ConfigCmd::Set { key, value } => {
                let path = simgr_util::settings_path();
                let mut settings = Settings::load_file(&path);
                settings.set(&key, &value)?;
                settings.save_to(&path)?;
                println!("{key} saved to {}", path.display());
            }
        },
    }

    Ok(())
}

fn print_channels(set: &ChannelSet, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(set)?);
        return Ok(());
    }
    for channel in set {
        let version = channel
            .latest_image()
            .map(|image| image.version.to_string())
            .unwrap_or_else(|| "-".into());
        let duplicates = if channel.duplicates().is_empty() {
            "-".to_string()
        } else {
            channel.duplicates().join(",")
        };
        println!(
            "{}\t{}\tdevice={}\tlatest={}\tduplicates={}",
            channel.raw_name(),
            channel.display_name(),
            channel.resolved_device().unwrap_or("-"),
            version,
            duplicates
        );
    }
    Ok(())
}
