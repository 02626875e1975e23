//! A simulated AD5933 register file, so the whole scan path can run on a
//! desk with no converter attached. Samples are drawn with a little
//! noise around the magnitude a nominal reference resistance would
//! produce, and the status register walks through a sweep the way the
//! real part does.

use crate::ad5933::GAIN_FACTOR;
use crate::register_bus::{
    BusError, RegisterBus, REG_CONTROL, REG_IMG_DATA, REG_POINT_COUNT, REG_REAL_DATA, REG_STATUS,
    STATUS_DATA_READY, STATUS_SCAN_DONE,
};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::FRAC_PI_2;

/// Reference resistance the board was calibrated against.
pub const STANDARD_R: f64 = 200_000.0;

const CTRL_START_SWEEP: u8 = 0x21;
const CTRL_NEXT_POINT: u8 = 0x31;

/// The simulated instrument.
pub struct DummyInstrument {
    regs: [u8; 0x100],
    remaining: u16,
    sample: (i16, i16),
    target: f64,
    rng: StdRng,
}

impl Default for DummyInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyInstrument {
    /// An instrument simulating the reference resistor.
    pub fn new() -> Self {
        Self::with_resistance(STANDARD_R)
    }

    /// An instrument simulating a specific resistance in ohms.
    pub fn with_resistance(ohms: f64) -> Self {
        Self {
            regs: [0; 0x100],
            remaining: 0,
            sample: (0, 0),
            target: ohms,
            rng: StdRng::from_entropy(),
        }
    }

    fn next_sample(&mut self) -> (i16, i16) {
        let magnitude = 1.0 / (GAIN_FACTOR * self.target) * self.rng.gen_range(0.98..1.02);
        let angle = self.rng.gen_range(0.0..FRAC_PI_2);
        (
            (magnitude * angle.cos()) as i16,
            (magnitude * angle.sin()) as i16,
        )
    }

    fn programmed_points(&self) -> u16 {
        let increments = u16::from_be_bytes([
            self.regs[REG_POINT_COUNT.addr as usize],
            self.regs[REG_POINT_COUNT.addr as usize + 1],
        ]);
        increments + 1
    }
}

impl RegisterBus for DummyInstrument {
    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), BusError> {
        self.regs[addr as usize] = value;
        if addr == REG_CONTROL.addr {
            match value {
                CTRL_START_SWEEP => {
                    self.remaining = self.programmed_points();
                    self.sample = self.next_sample();
                }
                CTRL_NEXT_POINT => {
                    self.remaining = self.remaining.saturating_sub(1);
                    self.sample = self.next_sample();
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8, BusError> {
        let value = match addr {
            _ if addr == REG_STATUS.addr => match self.remaining {
                0 => 0,
                1 => STATUS_DATA_READY | STATUS_SCAN_DONE,
                _ => STATUS_DATA_READY,
            },
            _ if addr == REG_REAL_DATA.addr => (self.sample.0 >> 8) as u8,
            _ if addr == REG_REAL_DATA.addr + 1 => self.sample.0 as u8,
            _ if addr == REG_IMG_DATA.addr => (self.sample.1 >> 8) as u8,
            _ if addr == REG_IMG_DATA.addr + 1 => self.sample.1 as u8,
            _ => self.regs[addr as usize],
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad5933::{estimate_resistance, Ad5933};

    #[test]
    fn simulated_sweep_collects_every_point() {
        let mut dev = Ad5933::new(DummyInstrument::new());
        let (real, image) = dev.sweep(1_000, 3_000, 10).unwrap();
        assert_eq!(real.len(), 10);
        assert_eq!(image.len(), 10);
    }

    #[test]
    fn estimate_lands_near_the_simulated_resistance() {
        let mut dev = Ad5933::new(DummyInstrument::new());
        let (real, image) = dev.sweep(300_000, 310_000, 20).unwrap();
        let ohms = estimate_resistance(&real, &image);
        // 2% sample noise plus i16 truncation, give it a wide berth
        assert!(
            (150_000.0..250_000.0).contains(&ohms),
            "estimate was {ohms}"
        );
    }
}
