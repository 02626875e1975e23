//! Network sinks for serialized readings: a raw TCP socket and a
//! cloud-MQTT bridge. The two differ in failure policy: a broken socket
//! kills the relay (the operator restarts it from the command surface),
//! a failed topic publish is logged and life goes on.

use std::fmt;
use std::io::{self, Write};
use std::net::{TcpStream, ToSocketAddrs};

/// Endpoint used when the operator gives no address.
pub const DEFAULT_IP: &str = "192.168.43.84";
/// Port used when the operator gives none.
pub const DEFAULT_PORT: u16 = 9999;

/// Failure to hand a payload to the network.
#[derive(Debug)]
pub enum TransportError {
    /// Socket-level failure.
    Io(io::Error),
    /// Nonzero status from the MQTT bridge.
    Mqtt(i32),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(error) => write!(f, "socket error: {}", error),
            TransportError::Mqtt(code) => write!(f, "mqtt bridge error: {}", code),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<io::Error> for TransportError {
    fn from(value: io::Error) -> Self {
        TransportError::Io(value)
    }
}

/// Where serialized readings go.
pub trait Transport {
    /// Sends one payload toward the given destination stream.
    fn send(&mut self, stream_name: &str, payload: &str) -> Result<(), TransportError>;

    /// Whether a send failure should terminate the relay loop.
    fn fatal_errors(&self) -> bool;
}

/// Raw TCP sink. The stream name is ignored, the payload goes down the
/// pipe as-is.
pub struct SocketTransport {
    stream: TcpStream,
}

impl SocketTransport {
    /// Connects to the collection endpoint.
    pub fn connect(addr: impl ToSocketAddrs) -> io::Result<Self> {
        Ok(Self {
            stream: TcpStream::connect(addr)?,
        })
    }
}

impl Transport for SocketTransport {
    fn send(&mut self, _stream_name: &str, payload: &str) -> Result<(), TransportError> {
        self.stream.write_all(payload.as_bytes())?;
        Ok(())
    }

    fn fatal_errors(&self) -> bool {
        true
    }
}

/// The seam to the external cloud-MQTT client. The real client lives
/// outside this crate; anything that can publish a string to a named
/// stream fits.
pub trait MqttClient {
    /// Publishes `payload` to the topic backing `stream_name`. A nonzero
    /// status becomes [`TransportError::Mqtt`].
    fn upload_string(&mut self, stream_name: &str, payload: &str) -> Result<(), TransportError>;
}

/// MQTT-bridge sink; publish failures are non-fatal.
pub struct MqttTransport<C> {
    client: C,
}

impl<C: MqttClient> MqttTransport<C> {
    /// Wraps a connected client.
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: MqttClient> Transport for MqttTransport<C> {
    fn send(&mut self, stream_name: &str, payload: &str) -> Result<(), TransportError> {
        self.client.upload_string(stream_name, payload)
    }

    fn fatal_errors(&self) -> bool {
        false
    }
}

/// A stand-in bridge that logs instead of publishing, for running
/// without cloud credentials.
#[derive(Debug, Default)]
pub struct LoggingMqttClient;

impl MqttClient for LoggingMqttClient {
    fn upload_string(&mut self, stream_name: &str, payload: &str) -> Result<(), TransportError> {
        log::info!("[{}] {}", stream_name, payload);
        Ok(())
    }
}
