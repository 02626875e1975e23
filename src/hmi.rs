//! Framing for the HMI serial panel. Inbound, the panel sends
//! shell-style command lines wrapped in a `0xFE` start byte and a `0xFF`
//! terminator; a small set of punctuation is normalized to spaces before
//! dispatch so panel widgets can use `/`, `,` or `=` as separators.
//! Outbound messages take the panel's `name.attribute=value` form,
//! closed with the three-byte `0xFF 0xFF 0xFF` terminator.

use log::{debug, warn};
use std::io::{self, Write};

/// Largest accepted command line, matching the shell's buffer.
pub const CMD_BUFFER_SIZE: usize = 80;

/// Separator characters normalized to spaces before dispatch.
pub const SPLIT_CHARS: &str = "/,=";

const START_BYTE: u8 = 0xFE;
const END_BYTE: u8 = 0xFF;
const FRAME_END: &[u8] = &[0xFF, 0xFF, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Wait,
    Receive,
}

/// Byte-at-a-time parser for inbound panel commands.
#[derive(Debug)]
pub struct CommandFramer {
    state: State,
    buf: Vec<u8>,
}

impl Default for CommandFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFramer {
    /// A framer waiting for a start byte.
    pub fn new() -> Self {
        Self {
            state: State::Wait,
            buf: Vec::with_capacity(CMD_BUFFER_SIZE),
        }
    }

    /// Consumes one byte, returning a normalized command line when a
    /// frame completes. An overlong command aborts back to idle without
    /// dispatching; stray terminators while empty are ignored.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match self.state {
            State::Wait => {
                if byte == START_BYTE {
                    self.state = State::Receive;
                    self.buf.clear();
                }
                None
            }
            State::Receive => {
                if self.buf.len() >= CMD_BUFFER_SIZE {
                    self.state = State::Wait;
                    warn!("HMI command too long.");
                    return None;
                }
                if byte == END_BYTE {
                    if self.buf.is_empty() {
                        return None;
                    }
                    self.state = State::Wait;
                    let command = normalize(&self.buf);
                    debug!("Rec Command: {}.", command);
                    return Some(command);
                }
                self.buf.push(byte);
                None
            }
        }
    }
}

fn normalize(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .chars()
        .map(|c| if SPLIT_CHARS.contains(c) { ' ' } else { c })
        .collect()
}

/// Outbound half of the panel link.
pub struct Panel<W> {
    port: W,
}

impl<W: Write> Panel<W> {
    /// Wraps the panel's write half.
    pub fn new(port: W) -> Self {
        Self { port }
    }

    /// Sends `name.attribute=value` followed by the frame terminator.
    pub fn send(
        &mut self,
        name: &str,
        attribute: &str,
        value: impl std::fmt::Display,
    ) -> io::Result<()> {
        write!(self.port, "{}.{}={}", name, attribute, value)?;
        self.port.write_all(FRAME_END)?;
        self.port.flush()
    }

    /// Sets a text widget; the panel wants string values quoted.
    pub fn text(&mut self, name: &str, value: impl std::fmt::Display) -> io::Result<()> {
        self.send(name, "txt", format_args!("\"{}\"", value))
    }

    /// Sets a numeric widget.
    pub fn value(&mut self, name: &str, value: i64) -> io::Result<()> {
        self.send(name, "val", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(framer: &mut CommandFramer, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|&b| framer.push(b)).collect()
    }

    #[test]
    fn framed_command_dispatches() {
        let mut framer = CommandFramer::new();
        let mut bytes = vec![0xFE];
        bytes.extend_from_slice(b"cmd");
        bytes.push(0xFF);
        assert_eq!(feed(&mut framer, &bytes), vec!["cmd".to_owned()]);
    }

    #[test]
    fn separators_become_spaces() {
        let mut framer = CommandFramer::new();
        let mut bytes = vec![0xFE];
        bytes.extend_from_slice(b"wifi_config/add,net=key");
        bytes.push(0xFF);
        assert_eq!(
            feed(&mut framer, &bytes),
            vec!["wifi_config add net key".to_owned()]
        );
    }

    #[test]
    fn bytes_outside_a_frame_are_ignored() {
        let mut framer = CommandFramer::new();
        assert!(feed(&mut framer, b"noise without a start byte").is_empty());
    }

    #[test]
    fn overflow_aborts_without_dispatch() {
        let mut framer = CommandFramer::new();
        let mut bytes = vec![0xFE];
        bytes.extend(std::iter::repeat(b'x').take(CMD_BUFFER_SIZE + 1));
        bytes.push(0xFF);
        assert!(feed(&mut framer, &bytes).is_empty());

        // the framer is idle again and accepts the next frame
        let mut bytes = vec![0xFE];
        bytes.extend_from_slice(b"ok");
        bytes.push(0xFF);
        assert_eq!(feed(&mut framer, &bytes), vec!["ok".to_owned()]);
    }

    #[test]
    fn empty_terminator_is_skipped() {
        let mut framer = CommandFramer::new();
        let mut bytes = vec![0xFE, 0xFF, 0xFF];
        bytes.extend_from_slice(b"cmd");
        bytes.push(0xFF);
        assert_eq!(feed(&mut framer, &bytes), vec!["cmd".to_owned()]);
    }

    #[test]
    fn panel_message_layout() {
        let mut out = Vec::new();
        Panel::new(&mut out).text("resistance", "198.500").unwrap();
        assert_eq!(out, b"resistance.txt=\"198.500\"\xFF\xFF\xFF");

        let mut out = Vec::new();
        Panel::new(&mut out).value("wifi_state", 1).unwrap();
        assert_eq!(out, b"wifi_state.val=1\xFF\xFF\xFF");
    }
}
