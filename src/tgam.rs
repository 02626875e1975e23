//! Byte-stream framer for the TGAM brainwave headset UART.
//!
//! The wire format is a two-byte `0xAA 0xAA` magic, a selector byte, and
//! a fixed-length body. Selector `0x04` carries a single raw EEG sample
//! (five bytes counting the selector), selector `0x20` carries the
//! once-per-second aggregate pack (thirty-three bytes counting the
//! selector). The trailing checksum byte the headset appends is not
//! validated. Any unexpected byte drops the framer back to hunting for
//! the magic, so the parser resynchronizes on garbage input.

use crate::reading::BrainwaveReading;

use log::warn;
use serde::Serialize;
use std::mem;

const MAGIC: u8 = 0xAA;
const SELECT_RAW: u8 = 0x04;
const SELECT_PACK: u8 = 0x20;

const RAW_BODY_LEN: usize = 4;
const PACK_BODY_LEN: usize = 32;

const TAG_RAW_SAMPLE: u8 = 0x80;
const TAG_PACK: u8 = 0x02;

/// Most raw samples held for a single reading. Records past this are
/// dropped, not an error.
pub const RAW_CAPACITY: usize = 2048;

/// The once-per-second aggregate record: signal quality, eight band
/// powers, and the attention/relaxation scores.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct Pack {
    pub sign: u8,
    pub detal: u32,
    pub theta: u32,
    pub low_alpha: u32,
    pub high_alpha: u32,
    pub low_beta: u32,
    pub high_beta: u32,
    pub low_gamma: u32,
    pub middle_gamma: u32,
    pub attention: u8,
    pub relex: u8,
}

/// One decoded record off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// A single 16-bit raw EEG sample.
    Raw(u16),
    /// The aggregate pack.
    Pack(Pack),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    SawFirstMagic,
    SawSecondMagic,
    CollectingRaw,
    CollectingPack,
}

/// The byte-at-a-time frame parser.
#[derive(Debug)]
pub struct Framer {
    state: State,
    body: Vec<u8>,
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framer {
    /// A framer hunting for the magic sequence.
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            body: Vec::with_capacity(PACK_BODY_LEN),
        }
    }

    /// True when the framer is between frames.
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    /// Consumes one byte, returning a record when it completes a frame.
    pub fn push(&mut self, byte: u8) -> Option<Record> {
        match self.state {
            State::Idle | State::SawFirstMagic => {
                if byte == MAGIC {
                    self.state = if self.state == State::Idle {
                        State::SawFirstMagic
                    } else {
                        State::SawSecondMagic
                    };
                } else {
                    self.state = State::Idle;
                }
                None
            }
            State::SawSecondMagic => {
                match byte {
                    SELECT_RAW => self.state = State::CollectingRaw,
                    SELECT_PACK => self.state = State::CollectingPack,
                    _ => self.state = State::Idle,
                }
                self.body.clear();
                None
            }
            State::CollectingRaw => {
                self.body.push(byte);
                if self.body.len() == RAW_BODY_LEN {
                    self.state = State::Idle;
                    decode_record(&self.body)
                } else {
                    None
                }
            }
            State::CollectingPack => {
                self.body.push(byte);
                if self.body.len() == PACK_BODY_LEN {
                    self.state = State::Idle;
                    decode_record(&self.body)
                } else {
                    None
                }
            }
        }
    }
}

/// Decodes a complete frame body. The leading byte tags the record;
/// unrecognized tags, and tags that do not fit the body length they
/// arrived in, are discarded without effect. A raw-length body can
/// carry a pack tag on a noisy line, so the tag alone is not trusted.
fn decode_record(body: &[u8]) -> Option<Record> {
    match body[0] {
        TAG_RAW_SAMPLE if body.len() == RAW_BODY_LEN => {
            Some(Record::Raw(u16::from_be_bytes([body[2], body[3]])))
        }
        TAG_PACK if body.len() == PACK_BODY_LEN => {
            let band = |i: usize| -> u32 {
                let at = 4 + i * 3;
                u32::from(body[at]) << 16 | u32::from(body[at + 1]) << 8 | u32::from(body[at + 2])
            };
            Some(Record::Pack(Pack {
                sign: body[1],
                detal: band(0),
                theta: band(1),
                low_alpha: band(2),
                high_alpha: band(3),
                low_beta: band(4),
                high_beta: band(5),
                low_gamma: band(6),
                middle_gamma: band(7),
                attention: body[29],
                relex: body[31],
            }))
        }
        _ => None,
    }
}

/// Accumulates raw samples between packs and closes out a
/// [`BrainwaveReading`] whenever a pack arrives.
#[derive(Debug, Default)]
pub struct Collector {
    framer: Framer,
    raw: Vec<u16>,
}

impl Collector {
    /// An empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte. `upload_ready` mirrors the relay's readiness flag:
    /// while it is down, completed frames are discarded wholesale so the
    /// framer keeps pace with the wire without piling up samples nobody
    /// will consume. A returned reading carries all raw samples collected
    /// since the previous pack; the internal buffer starts over fresh.
    pub fn feed(&mut self, byte: u8, upload_ready: bool) -> Option<BrainwaveReading> {
        let record = self.framer.push(byte)?;
        if !upload_ready {
            return None;
        }
        match record {
            Record::Raw(sample) => {
                if self.raw.len() >= RAW_CAPACITY {
                    warn!("raw sample buffer full, dropping record");
                } else {
                    self.raw.push(sample);
                }
                None
            }
            Record::Pack(pack) => Some(BrainwaveReading::new(mem::take(&mut self.raw), pack)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(framer: &mut Framer, bytes: &[u8]) -> Vec<Record> {
        bytes.iter().filter_map(|&b| framer.push(b)).collect()
    }

    /// A complete pack frame: magic, selector, then a 32-byte body with
    /// sign 0x37 and the sub-header the headset always sends.
    fn pack_frame() -> Vec<u8> {
        let mut frame = vec![0xAA, 0xAA, 0x20, 0x02, 0x37, 0x83, 0x18];
        // eight 3-byte band powers, values 1..=8
        for i in 1..=8u8 {
            frame.extend_from_slice(&[0x00, 0x00, i]);
        }
        // attention 0x04 tag/value, relaxation 0x05 tag/value
        frame.extend_from_slice(&[0x04, 0x2A, 0x05, 0x51]);
        frame
    }

    #[test]
    fn raw_frame_decodes_to_one_sample() {
        let mut framer = Framer::new();
        let records = feed_all(&mut framer, &[0xAA, 0xAA, 0x04, 0x80, 0x02, 0x07, 0xFF]);
        assert_eq!(records, vec![Record::Raw(0x07FF)]);
        assert!(framer.is_idle());
    }

    #[test]
    fn pack_frame_decodes_fields() {
        let mut framer = Framer::new();
        let records = feed_all(&mut framer, &pack_frame());
        assert_eq!(records.len(), 1);
        let Record::Pack(pack) = records[0] else {
            panic!("expected a pack record");
        };
        assert_eq!(pack.sign, 0x37);
        assert_eq!(pack.detal, 1);
        assert_eq!(pack.theta, 2);
        assert_eq!(pack.middle_gamma, 8);
        assert_eq!(pack.attention, 0x2A);
        assert_eq!(pack.relex, 0x51);
        assert!(framer.is_idle());
    }

    #[test]
    fn truncated_pack_emits_nothing() {
        let mut frame = pack_frame();
        frame.truncate(frame.len() - 1);
        let mut framer = Framer::new();
        assert!(feed_all(&mut framer, &frame).is_empty());
        assert!(!framer.is_idle());
    }

    #[test]
    fn resynchronizes_after_garbage() {
        let mut bytes = vec![0x13, 0xAA, 0x55, 0xAA, 0xAA, 0xAA];
        bytes.extend_from_slice(&[0xAA, 0xAA, 0x04, 0x80, 0x02, 0x12, 0x34]);
        let mut framer = Framer::new();
        assert_eq!(feed_all(&mut framer, &bytes), vec![Record::Raw(0x1234)]);
    }

    #[test]
    fn unknown_selector_resets() {
        let mut framer = Framer::new();
        assert!(feed_all(&mut framer, &[0xAA, 0xAA, 0x99]).is_empty());
        assert!(framer.is_idle());
    }

    #[test]
    fn pack_tag_in_a_raw_length_body_is_discarded() {
        // line noise can put the pack tag at the head of a raw-selector
        // frame; there is no pack payload behind it to index into
        let mut framer = Framer::new();
        let records = feed_all(&mut framer, &[0xAA, 0xAA, 0x04, 0x02, 0x00, 0x00, 0x00]);
        assert!(records.is_empty());
        assert!(framer.is_idle());
    }

    #[test]
    fn raw_tag_in_a_pack_length_body_is_discarded() {
        let mut frame = pack_frame();
        frame[3] = 0x80;
        let mut framer = Framer::new();
        assert!(feed_all(&mut framer, &frame).is_empty());
        assert!(framer.is_idle());
    }

    #[test]
    fn unknown_record_tag_is_discarded() {
        let mut framer = Framer::new();
        let records = feed_all(&mut framer, &[0xAA, 0xAA, 0x04, 0x55, 0x02, 0x07, 0xFF]);
        assert!(records.is_empty());
        assert!(framer.is_idle());
    }

    #[test]
    fn collector_hands_off_raw_samples_on_pack() {
        let mut collector = Collector::new();
        let mut bytes = vec![0xAA, 0xAA, 0x04, 0x80, 0x02, 0x00, 0x01];
        bytes.extend_from_slice(&[0xAA, 0xAA, 0x04, 0x80, 0x02, 0x00, 0x02]);
        bytes.extend_from_slice(&pack_frame());

        let mut readings = Vec::new();
        for byte in bytes {
            readings.extend(collector.feed(byte, true));
        }
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].raw, vec![1, 2]);
        assert_eq!(readings[0].pack.sign, 0x37);

        // the next pack starts from an empty buffer
        let mut readings = Vec::new();
        for byte in pack_frame() {
            readings.extend(collector.feed(byte, true));
        }
        assert_eq!(readings.len(), 1);
        assert!(readings[0].raw.is_empty());
    }

    #[test]
    fn collector_discards_frames_while_upload_not_ready() {
        let mut collector = Collector::new();
        for byte in [0xAA, 0xAA, 0x04, 0x80, 0x02, 0x00, 0x01] {
            assert!(collector.feed(byte, false).is_none());
        }
        for byte in pack_frame() {
            assert!(collector.feed(byte, false).is_none());
        }
        // nothing was buffered while the gate was down
        let mut readings = Vec::new();
        for byte in pack_frame() {
            readings.extend(collector.feed(byte, true));
        }
        assert!(readings[0].raw.is_empty());
    }

    #[test]
    fn collector_truncates_at_capacity() {
        let mut collector = Collector::new();
        let raw_frame = [0xAA, 0xAA, 0x04, 0x80, 0x02, 0x00, 0x07];
        for _ in 0..RAW_CAPACITY + 5 {
            for byte in raw_frame {
                collector.feed(byte, true);
            }
        }
        let mut readings = Vec::new();
        for byte in pack_frame() {
            readings.extend(collector.feed(byte, true));
        }
        assert_eq!(readings[0].raw.len(), RAW_CAPACITY);
    }
}
