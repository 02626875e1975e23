// Commandline argument parser using clap for cortexlink

#![allow(missing_docs)]

use crate::transport::{DEFAULT_IP, DEFAULT_PORT};

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct CliArgs {
    /// Which task to perform
    #[command(subcommand)]
    pub command: CommandTask,
}

#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Run one impedance sweep and report the resistance estimate
    #[command(about)]
    Scan(ScanArgs),

    /// Decode the brainwave headset stream from a serial port
    #[command(about)]
    Listen(ListenArgs),

    /// Edit the remembered wifi networks
    #[command(about)]
    Wifi(WifiArgs),
}

#[derive(Debug, Parser, Clone)]
#[command(version, about, name = "ad59_run")]
pub struct ScanArgs {
    /// Start frequency in Hz
    #[arg(short = 's', long = "start", default_value_t = 300_000)]
    pub start: u32,

    /// End frequency in Hz
    #[arg(short = 'e', long = "end", default_value_t = 310_000)]
    pub end: u32,

    /// Number of sweep points, at most 511
    #[arg(short = 'p', long = "point", default_value_t = 100)]
    pub points: u16,

    /// Subject weight, forwarded with the reading
    #[arg(short = 'w', long = "weight", default_value_t = 0.0)]
    pub weight: f64,

    /// Subject height, forwarded with the reading
    #[arg(short = 'l', long = "height", default_value_t = 0.0)]
    pub height: f64,

    /// Disable printing the per-point results to the console
    #[arg(short = 'd', long = "display")]
    pub no_display: bool,

    /// Disable writing the result to the HMI panel
    #[arg(short = 'c', long = "hmi")]
    pub no_hmi: bool,

    /// Serial device of the HMI panel
    #[arg(long = "hmi-port")]
    pub hmi_port: Option<String>,

    #[command(flatten)]
    pub relay: RelayArgs,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ListenArgs {
    /// Serial device the headset is attached to
    pub device: String,

    /// Baud rate of the headset link
    #[arg(short = 'b', long = "baud", default_value_t = 57_600)]
    pub baud: u32,

    /// Serial device of the HMI panel
    #[arg(long = "hmi-port")]
    pub hmi_port: Option<String>,

    #[command(flatten)]
    pub relay: RelayArgs,
}

#[derive(Debug, Args, Clone)]
pub struct RelayArgs {
    /// Relay readings to the raw socket endpoint
    #[arg(short = 'u', long = "upload")]
    pub upload: bool,

    /// Collection endpoint address for the socket relay
    #[arg(short = 'i', long = "ip", default_value = DEFAULT_IP)]
    pub ip: String,

    /// Collection endpoint TCP port
    #[arg(long = "port", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Publish through the cloud MQTT bridge instead of a raw socket
    #[arg(long = "mqtt")]
    pub mqtt: bool,
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct WifiArgs {
    #[command(subcommand)]
    pub action: WifiAction,

    /// Path of the credential file
    #[arg(short = 'f', long = "file", default_value = crate::wifi_store::CONFIG_NAME)]
    pub file: String,
}

#[derive(Debug, Subcommand, Clone)]
pub enum WifiAction {
    /// Remember a network
    Add {
        /// Network name
        ssid: String,
        /// Passphrase, omit for open networks
        key: Option<String>,
    },

    /// Forget a network
    Remove {
        /// Network name
        ssid: String,
        /// Passphrase the entry was stored with
        key: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_defaults_match_the_firmware() {
        let args = ScanArgs::parse_from(["ad59_run"]);
        assert_eq!(args.start, 300_000);
        assert_eq!(args.end, 310_000);
        assert_eq!(args.points, 100);
        assert!(!args.no_display);
        assert!(!args.relay.upload);
        assert_eq!(args.relay.ip, DEFAULT_IP);
        assert_eq!(args.relay.port, DEFAULT_PORT);
    }

    #[test]
    fn scan_args_parse_from_a_panel_command_line() {
        let line = "ad59_run -s 1000 -e 3000 -p 10";
        let args = ScanArgs::try_parse_from(line.split_whitespace()).unwrap();
        assert_eq!((args.start, args.end, args.points), (1_000, 3_000, 10));
    }
}
