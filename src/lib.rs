//! Host-side software for a two-channel biosignal acquisition board: an
//! AD5933 impedance converter scanned over a register bus, and a TGAM
//! brainwave headset streaming frames over a UART. Each acquisition path
//! produces [`reading::Reading`]s that are handed through a bounded
//! queue to an upload relay, which serializes them to JSON and forwards
//! them to a collection endpoint over a raw socket or a cloud-MQTT
//! bridge. A small serial HMI panel rides along as a text-protocol
//! peripheral for status display and command entry.
//!
//! The `cortexlink` binary is the command surface (scan, listen, wifi);
//! the `monitor` binary dumps decoded headset records for bring-up.

#![warn(missing_docs)]
pub mod ad5933;
pub mod args;
pub mod dummy_instrument;
pub mod events;
pub mod hmi;
pub mod reading;
pub mod register_bus;
pub mod relay;
pub mod tgam;
pub mod transport;
pub mod wifi_store;
