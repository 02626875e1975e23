//! The cortexlink command surface: run an impedance sweep, listen to the
//! brainwave headset, or edit the remembered wifi networks. Sweeps run
//! against the simulated instrument; the real converter sits behind the
//! same `RegisterBus` seam on the board build.

use clap::Parser;
use cortexlink::{
    ad5933::{estimate_resistance, Ad5933},
    args::{CliArgs, CommandTask, ListenArgs, RelayArgs, ScanArgs, WifiAction, WifiArgs},
    dummy_instrument::DummyInstrument,
    events::EventFlags,
    hmi::{CommandFramer, Panel},
    reading::{tick_now, ImpedanceReading, Reading},
    relay,
    tgam::Collector,
    transport::{LoggingMqttClient, MqttTransport, SocketTransport},
    wifi_store::{WifiEntry, WifiStore},
};
use log::{debug, error, info, warn};
use serial2::SerialPort;
use std::{
    io::{self, Write},
    sync::{mpsc::SyncSender, Arc},
    thread::{self, JoinHandle},
    time::Duration,
};

/// How long the headset may stay silent before it is marked offline.
const OFFLINE_TIMEOUT: Duration = Duration::from_secs(2);

const HMI_BAUD: u32 = 9600;

fn main() {
    env_logger::init();

    let args = CliArgs::parse();
    match args.command {
        CommandTask::Scan(scan) => run_scan(scan),
        CommandTask::Listen(listen) => run_listen(listen),
        CommandTask::Wifi(wifi) => run_wifi(wifi),
    }
}

/// Starts the requested relay, if any. Returns the producer side of the
/// hand-off queue and the consumer thread.
fn start_relay(
    args: &RelayArgs,
    flags: &Arc<EventFlags>,
) -> Option<(SyncSender<Reading>, JoinHandle<()>)> {
    if !args.upload && !args.mqtt {
        return None;
    }
    if !flags.net_ok() {
        warn!("network not ready, uploads stay disabled");
        return None;
    }
    if flags.upload_ok() {
        warn!("upload relay has already been created.");
        return None;
    }

    let (tx, rx) = relay::channel();
    let handle = if args.mqtt {
        flags.swap_upload_ok(true);
        let flags = Arc::clone(flags);
        thread::spawn(move || relay::run(rx, MqttTransport::new(LoggingMqttClient), &flags))
    } else {
        info!("Connect INFO: IP: {} PORT: {}", args.ip, args.port);
        match SocketTransport::connect((args.ip.as_str(), args.port)) {
            Ok(transport) => {
                info!("Connect successful");
                flags.swap_upload_ok(true);
                let flags = Arc::clone(flags);
                thread::spawn(move || relay::run(rx, transport, &flags))
            }
            Err(error) => {
                warn!("Connect fail: {}", error);
                return None;
            }
        }
    };
    Some((tx, handle))
}

/// One sweep against the instrument, finished into a reading.
fn perform_sweep(args: &ScanArgs) -> Option<ImpedanceReading> {
    let mut dev = Ad5933::new(DummyInstrument::new());
    let tick = tick_now();
    let (real, image) = match dev.sweep(args.start, args.end, args.points) {
        Ok(samples) => samples,
        Err(error) => {
            error!("AD5933 start fail: {}", error);
            return None;
        }
    };
    let ave = estimate_resistance(&real, &image);
    Some(ImpedanceReading {
        tick,
        start: args.start,
        end: args.end,
        real,
        image,
        ave,
        weight: args.weight,
        height: args.height,
    })
}

fn run_scan(args: ScanArgs) {
    let flags = EventFlags::new();
    // no wifi manager on the host side, the network is simply up
    flags.set_net_ok(true);
    let handoff = start_relay(&args.relay, &flags);

    let Some(reading) = perform_sweep(&args) else {
        return;
    };

    if !args.no_display {
        for (i, (re, im)) in reading.real.iter().zip(&reading.image).enumerate() {
            println!("[{:3}]: Real: {:8}; Img: {:8}", i, re, im);
        }
        println!("Ave: {:.3}", reading.ave);
    }

    if !args.no_hmi {
        if let Some(device) = &args.hmi_port {
            match SerialPort::open(device, HMI_BAUD) {
                Ok(port) => {
                    let mut panel = Panel::new(PortWriter(&port));
                    if let Err(error) = panel.text("resistance", format!("{:.3}", reading.ave)) {
                        warn!("HMI write fail: {}", error);
                    }
                }
                Err(error) => warn!("HMI serial is not found: {}", error),
            }
        }
    }

    if let Some((tx, handle)) = handoff {
        relay::offer(&tx, &flags, reading.into());
        // closing the queue lets the relay drain and terminate
        drop(tx);
        let _ = handle.join();
    }
}

fn run_listen(args: ListenArgs) {
    let flags = EventFlags::new();
    flags.set_net_ok(true);
    let handoff = start_relay(&args.relay, &flags);
    let tx = handoff.as_ref().map(|(tx, _)| tx.clone());

    if let Some(device) = &args.hmi_port {
        match SerialPort::open(device, HMI_BAUD) {
            Ok(port) => {
                let flags = Arc::clone(&flags);
                let tx = tx.clone();
                thread::spawn(move || hmi_loop(port, flags, tx));
            }
            Err(error) => warn!("HMI serial is not found: {}", error),
        }
    }

    let mut port = match SerialPort::open(&args.device, args.baud) {
        Ok(port) => port,
        Err(error) => {
            error!("serial open fail: {}", error);
            return;
        }
    };
    if let Err(error) = port.set_read_timeout(OFFLINE_TIMEOUT) {
        error!("Failed to set read timeout: {}", error);
        return;
    }

    let mut collector = Collector::new();
    let mut buffer = [0u8; 256];
    loop {
        match port.read(&mut buffer) {
            Ok(0) => {
                if flags.mark_tgam(false) {
                    debug!("TGAM offline.");
                }
            }
            Ok(len) => {
                if flags.mark_tgam(true) {
                    debug!("TGAM online.");
                }
                for &byte in &buffer[..len] {
                    if let Some(reading) = collector.feed(byte, flags.upload_ok()) {
                        match &tx {
                            Some(tx) => {
                                relay::offer(tx, &flags, reading.into());
                            }
                            None => debug!("no relay configured, dropping reading"),
                        }
                    }
                }
            }
            Err(error)
                if error.kind() == io::ErrorKind::TimedOut
                    || error.kind() == io::ErrorKind::WouldBlock =>
            {
                if flags.mark_tgam(false) {
                    debug!("TGAM offline.");
                }
            }
            Err(error) => {
                error!("headset device lost: {}", error);
                break;
            }
        }
    }
}

fn run_wifi(args: WifiArgs) {
    let mut store = WifiStore::load(&args.file);
    match args.action {
        WifiAction::Add { ssid, key } => store.add(WifiEntry { ssid, key }),
        WifiAction::Remove { ssid, key } => {
            if !store.remove(&WifiEntry { ssid, key }) {
                warn!("no matching network to remove");
            }
        }
    }
    if let Err(error) = store.save(&args.file) {
        error!("{} save error: {}", args.file, error);
    }
}

/// Reads panel bytes, frames them into command lines, and answers the
/// small status vocabulary the panel firmware sends.
fn hmi_loop(port: SerialPort, flags: Arc<EventFlags>, tx: Option<SyncSender<Reading>>) {
    let mut panel = Panel::new(PortWriter(&port));
    let _ = panel.text("main.debug", "Online");

    let mut framer = CommandFramer::new();
    let mut byte = [0u8; 1];
    loop {
        match port.read(&mut byte) {
            Ok(0) => continue,
            Ok(_) => {
                if let Some(line) = framer.push(byte[0]) {
                    dispatch(&line, &mut panel, &flags, tx.as_ref());
                }
            }
            Err(error)
                if error.kind() == io::ErrorKind::TimedOut
                    || error.kind() == io::ErrorKind::WouldBlock =>
            {
                continue;
            }
            Err(error) => {
                warn!("HMI read error: {}", error);
                break;
            }
        }
    }
}

fn dispatch<W: Write>(
    line: &str,
    panel: &mut Panel<W>,
    flags: &EventFlags,
    tx: Option<&SyncSender<Reading>>,
) {
    let Some(command) = line.split_whitespace().next() else {
        return;
    };
    match command {
        "getWifiStatus" => {
            let _ = panel.value("wifi_state", i64::from(flags.net_ok()));
        }
        "onenetIsOnline" => {
            let _ = panel.value("onenet_state", i64::from(flags.upload_ok()));
        }
        "onenetList" => {
            let _ = panel.value("tgam_state", i64::from(flags.tgam_online()));
        }
        "ad59_run" => match ScanArgs::try_parse_from(line.split_whitespace()) {
            Ok(scan) => {
                if let Some(reading) = perform_sweep(&scan) {
                    let _ = panel.text("resistance", format!("{:.3}", reading.ave));
                    if let Some(tx) = tx {
                        relay::offer(tx, flags, reading.into());
                    }
                }
            }
            Err(error) => {
                warn!("Error Command: {}: {}", line, error);
                let _ = panel.text("main.debug", "bad command");
            }
        },
        _ => warn!("Error Command: {}.", line),
    }
}

/// `Write` adapter over the port's shared-reference API so the panel
/// writer and the byte reader can use one open device.
struct PortWriter<'a>(&'a SerialPort);

impl Write for PortWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}
