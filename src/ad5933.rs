//! Driver and sweep loop for the AD5933 impedance converter, plus the
//! resistance estimator applied to a finished sweep.
//!
//! The estimator is deliberately odd: it sorts the point magnitudes,
//! seeds an estimate from the smallest one, then repeatedly halves the
//! estimate toward candidates drawn from the middle half of the sorted
//! list. The result depends on fold order, so it is not a true trimmed
//! mean. Deployed receivers expect these exact numbers, keep it as is.

use crate::register_bus::{
    BusError, RegisterBus, EXTERNAL_CLOCK, REG_BEGIN_FREQ, REG_CONTROL, REG_FREQ_STEP,
    REG_IMG_DATA, REG_POINT_COUNT, REG_REAL_DATA, REG_SETTLE_CYCLES, REG_STATUS,
    STATUS_DATA_READY, STATUS_SCAN_DONE,
};

use log::{debug, warn};
use std::fmt;
use std::time::Duration;

/// System gain factor from the board calibration against a 200 kΩ
/// reference resistor.
pub const GAIN_FACTOR: f64 = 5.15819e-10;

/// Highest programmable sweep frequency in Hz.
pub const MAX_FREQ: u32 = 500_000;

/// Most sweep points the part can step through.
pub const MAX_POINTS: u16 = 511;

const POLL_DELAY: Duration = Duration::from_millis(1);
const SETTLE_DELAY: Duration = Duration::from_millis(200);

/// Why a sweep could not run (or aborted early).
#[derive(Debug)]
pub enum ScanError {
    /// The requested sweep parameters are outside the part's range.
    InvalidRange {
        /// Requested start frequency in Hz.
        begin: u32,
        /// Requested end frequency in Hz.
        end: u32,
        /// Requested point count.
        points: u16,
    },
    /// A register transaction failed mid-sweep.
    Bus(BusError),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::InvalidRange { begin, end, points } => write!(
                f,
                "invalid sweep range: begin {} end {} points {}",
                begin, end, points
            ),
            ScanError::Bus(error) => write!(f, "scan aborted: {}", error),
        }
    }
}

impl std::error::Error for ScanError {}

impl From<BusError> for ScanError {
    fn from(value: BusError) -> Self {
        ScanError::Bus(value)
    }
}

/// The AD5933 behind a [`RegisterBus`].
pub struct Ad5933<B> {
    bus: B,
}

impl<B: RegisterBus> Ad5933<B> {
    /// Wraps a bus. No traffic happens until a command is issued.
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// The fixed-point frequency code for a target frequency in Hz.
    fn freq_code(freq: u32) -> u32 {
        freq * 4 * (1 << (27 / EXTERNAL_CLOCK))
    }

    /// Puts the part through a reset cycle.
    pub fn reset(&mut self) -> Result<(), BusError> {
        self.bus.write_reg(REG_CONTROL, &[0x00, 0x10])
    }

    fn set_sweep_range(&mut self, begin: u32, end: u32, points: u16) -> Result<(), ScanError> {
        if begin > end || points == 0 || points > MAX_POINTS || end > MAX_FREQ {
            return Err(ScanError::InvalidRange { begin, end, points });
        }

        let code = Self::freq_code(begin);
        self.bus.write_reg(
            REG_BEGIN_FREQ,
            &[(code >> 16) as u8, (code >> 8) as u8, code as u8],
        )?;

        let code = Self::freq_code((end - begin) / u32::from(points));
        self.bus.write_reg(
            REG_FREQ_STEP,
            &[(code >> 16) as u8, (code >> 8) as u8, code as u8],
        )?;

        let increments = points - 1;
        self.bus
            .write_reg(REG_POINT_COUNT, &[(increments >> 8) as u8, increments as u8])?;

        // two settling cycles per point
        self.bus.write_reg(REG_SETTLE_CYCLES, &[0x00, 0x02])?;

        Ok(())
    }

    /// Programs the sweep and arms the instrument: range registers,
    /// standby, initialize with the start frequency, a settling pause,
    /// then start the sweep.
    pub fn start(&mut self, begin: u32, end: u32, points: u16) -> Result<(), ScanError> {
        self.set_sweep_range(begin, end, points)?;
        self.bus.write_reg(REG_CONTROL, &[0xB1, 0x00])?;
        self.bus.write_reg(REG_CONTROL, &[0x11, 0x00])?;
        spin_sleep::sleep(SETTLE_DELAY);
        self.bus.write_reg(REG_CONTROL, &[0x21, 0x00])?;
        Ok(())
    }

    /// Reads the status register.
    pub fn status(&mut self) -> Result<u8, BusError> {
        self.bus.read_byte(REG_STATUS.addr)
    }

    /// Reads the (real, imaginary) pair for the current point.
    pub fn read_sample(&mut self) -> Result<(i16, i16), BusError> {
        let mut buf = [0u8; 2];
        self.bus.read_reg(REG_REAL_DATA, &mut buf)?;
        let real = i16::from_be_bytes(buf);
        self.bus.read_reg(REG_IMG_DATA, &mut buf)?;
        let image = i16::from_be_bytes(buf);
        Ok((real, image))
    }

    /// Tells the instrument to move to the next frequency point.
    pub fn advance(&mut self) -> Result<(), BusError> {
        self.bus.write_reg(REG_CONTROL, &[0x31, 0x00])
    }

    /// Runs a whole sweep and collects the sample pairs. The poll loop is
    /// capped at `points + 10` iterations; if the instrument never raises
    /// the done bit, whatever was collected is returned anyway. Partial
    /// results beat no results.
    pub fn sweep(
        &mut self,
        begin: u32,
        end: u32,
        points: u16,
    ) -> Result<(Vec<i16>, Vec<i16>), ScanError> {
        self.start(begin, end, points)?;

        let wanted = points as usize;
        let mut real = Vec::with_capacity(wanted);
        let mut image = Vec::with_capacity(wanted);
        let mut done = false;

        for _ in 0..wanted + 10 {
            let status = self.status()?;
            if status & STATUS_DATA_READY != 0 {
                let (re, im) = self.read_sample()?;
                if real.len() < wanted {
                    real.push(re);
                    image.push(im);
                    if real.len() % 50 == 0 {
                        debug!("sweep at point {}", real.len());
                    }
                }
                self.advance()?;
                if status & STATUS_SCAN_DONE != 0 {
                    if real.len() != wanted {
                        warn!("sweep finished with {} of {} points", real.len(), wanted);
                    }
                    done = true;
                    break;
                }
            }
            spin_sleep::sleep(POLL_DELAY);
        }

        if !done {
            warn!(
                "instrument never signalled completion, keeping {} points",
                real.len()
            );
        }

        Ok((real, image))
    }
}

/// Folds a finished sweep down to one resistance figure in ohms.
///
/// Magnitude per point is `sqrt(real² + image²)`. The magnitudes are
/// sorted ascending; the smallest seeds the estimate `1 / (gain * m)`,
/// and candidates from the middle half of the sorted list are each
/// averaged into the running value in turn.
pub fn estimate_resistance(real: &[i16], image: &[i16]) -> f64 {
    let mut magnitudes: Vec<f64> = real
        .iter()
        .zip(image)
        .map(|(&re, &im)| (f64::from(re).powi(2) + f64::from(im).powi(2)).sqrt())
        .collect();

    if magnitudes.is_empty() {
        warn!("no points collected, resistance defaults to 0");
        return 0.0;
    }

    magnitudes.sort_by(f64::total_cmp);

    let n = magnitudes.len();
    let mut ave = 1.0 / GAIN_FACTOR / magnitudes[0];
    for m in &magnitudes[n / 2 - n / 4..n / 2 + n / 4] {
        ave = (ave + 1.0 / GAIN_FACTOR / m) / 2.0;
    }

    ave
}
