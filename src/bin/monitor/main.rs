//! Bring-up tool for the brainwave headset link. Opens the serial port,
//! runs the byte stream through the frame parser, and logs every decoded
//! record so wiring and baud problems show up without the full pipeline.

use clap::Parser;
use cortexlink::tgam::{Framer, Record};
use log::info;
use serial2::SerialPort;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(version, about)]
struct MonitorArgs {
    /// Serial device the headset is attached to
    device: String,

    /// Baud rate of the headset link
    #[arg(short = 'b', long = "baud", default_value_t = 57_600)]
    baud: u32,
}

fn main() {
    env_logger::init();
    let args = MonitorArgs::parse();

    let mut port = SerialPort::open(&args.device, args.baud).expect("Failed to open serial port");
    port.set_read_timeout(Duration::MAX)
        .expect("Failed to set read timeout");

    let mut framer = Framer::new();
    let mut raw_seen: u32 = 0;
    let mut buffer = [0u8; 256];
    loop {
        let len = port
            .read(&mut buffer)
            .expect("Failed to read from serial port");
        for &byte in &buffer[..len] {
            match framer.push(byte) {
                Some(Record::Raw(sample)) => {
                    raw_seen += 1;
                    // raw samples arrive at ~512 Hz, logging each would swamp the terminal
                    if raw_seen % 512 == 0 {
                        info!("raw sample {:#06x} ({} so far)", sample, raw_seen);
                    }
                }
                Some(Record::Pack(pack)) => info!("pack: {:?}", pack),
                None => {}
            }
        }
    }
}
