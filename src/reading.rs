//! The records that travel from the acquisition paths to the upload
//! relay. A [`Reading`] is a tagged sum of the two acquisition sources;
//! serialization is one `match` instead of the function-pointer dispatch
//! the old firmware used. Destruction is plain ownership: whoever ends
//! up holding the reading drops it, exactly once, whether that is the
//! relay after a send or the producer after a rejected enqueue.

use crate::tgam::Pack;

use serde_json::json;
use std::sync::OnceLock;
use std::time::Instant;

/// Upload stream fed by the impedance scanner.
pub const AD5933_STREAM: &str = "ad59_pack";
/// Upload stream fed by the brainwave headset.
pub const TGAM_STREAM: &str = "tgam_pack";

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Milliseconds since the process started, the timestamp stamped onto
/// every reading.
pub fn tick_now() -> u64 {
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// A finished impedance sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpedanceReading {
    /// Timestamp from [`tick_now`].
    pub tick: u64,
    /// Sweep start frequency in Hz.
    pub start: u32,
    /// Sweep end frequency in Hz.
    pub end: u32,
    /// Real components, one per collected point.
    pub real: Vec<i16>,
    /// Imaginary components, one per collected point.
    pub image: Vec<i16>,
    /// Derived resistance estimate in ohms.
    pub ave: f64,
    /// Operator-entered subject weight.
    pub weight: f64,
    /// Operator-entered subject height.
    pub height: f64,
}

/// One headset reading: the raw samples collected since the previous
/// aggregate pack, plus that pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrainwaveReading {
    /// Timestamp from [`tick_now`].
    pub tick: u64,
    /// Raw EEG samples, at most [`crate::tgam::RAW_CAPACITY`] of them.
    pub raw: Vec<u16>,
    /// The aggregate pack that closed this reading out.
    pub pack: Pack,
}

impl BrainwaveReading {
    /// Stamps a new reading with the current tick.
    pub fn new(raw: Vec<u16>, pack: Pack) -> Self {
        Self {
            tick: tick_now(),
            raw,
            pack,
        }
    }
}

/// Anything the relay can upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    /// A finished impedance sweep.
    Impedance(ImpedanceReading),
    /// A headset raw/pack pair.
    Brainwave(BrainwaveReading),
}

impl Reading {
    /// The destination stream for this reading.
    pub fn stream_name(&self) -> &'static str {
        match self {
            Reading::Impedance(_) => AD5933_STREAM,
            Reading::Brainwave(_) => TGAM_STREAM,
        }
    }

    /// Serializes the reading into its upload payload.
    pub fn to_json(&self) -> String {
        match self {
            Reading::Impedance(r) => json!({
                "tick": r.tick,
                "type": "AD5933",
                "start": r.start,
                "end": r.end,
                "len": r.real.len(),
                "real": r.real,
                "image": r.image,
                "ave": r.ave,
                "weight": r.weight,
                "height": r.height,
            }),
            Reading::Brainwave(r) => json!({
                "tick": r.tick,
                "type": "TGAM",
                "raw_data": {
                    "len": r.raw.len(),
                    "raw": r.raw,
                },
                "pack_data": r.pack,
            }),
        }
        .to_string()
    }
}

impl From<ImpedanceReading> for Reading {
    fn from(value: ImpedanceReading) -> Self {
        Reading::Impedance(value)
    }
}

impl From<BrainwaveReading> for Reading {
    fn from(value: BrainwaveReading) -> Self {
        Reading::Brainwave(value)
    }
}
