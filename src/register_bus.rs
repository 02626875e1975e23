//! Register-level access to the impedance converter. The physical bus
//! carries one byte per transaction: a write is an address pointer byte
//! followed by a data byte, a read sets the address pointer and clocks a
//! single byte back. Multi-byte registers are walked one address at a
//! time. The trait here is the seam between the scan controller and
//! whatever actually drives the wire (real bus driver or simulator).

use std::fmt;
use std::io;

/// External clock feeding the converter, 16 MHz on this board.
pub const EXTERNAL_CLOCK: u32 = 16_000_000;

/// A named register block: a start address and a byte length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    /// Address of the first byte of the block.
    pub addr: u8,
    /// Number of bytes in the block.
    pub len: u8,
}

/// Control register, two bytes.
pub const REG_CONTROL: Register = Register { addr: 0x80, len: 2 };
/// Sweep start frequency code, three bytes.
pub const REG_BEGIN_FREQ: Register = Register { addr: 0x82, len: 3 };
/// Per-point frequency increment code, three bytes.
pub const REG_FREQ_STEP: Register = Register { addr: 0x85, len: 3 };
/// Number of increments in the sweep, two bytes.
pub const REG_POINT_COUNT: Register = Register { addr: 0x88, len: 2 };
/// Settling-time cycles before each measurement, two bytes.
pub const REG_SETTLE_CYCLES: Register = Register { addr: 0x8A, len: 2 };
/// Status register, one byte.
pub const REG_STATUS: Register = Register { addr: 0x8F, len: 1 };
/// Real component of the last DFT result, two bytes.
pub const REG_REAL_DATA: Register = Register { addr: 0x94, len: 2 };
/// Imaginary component of the last DFT result, two bytes.
pub const REG_IMG_DATA: Register = Register { addr: 0x96, len: 2 };

/// Status bit: a real/imaginary sample pair is ready to read.
pub const STATUS_DATA_READY: u8 = 1 << 1;
/// Status bit: the frequency sweep is complete.
pub const STATUS_SCAN_DONE: u8 = 1 << 2;

/// Failure of a single register transaction.
#[derive(Debug)]
pub enum BusError {
    /// The underlying transport failed.
    Io(io::Error),
    /// The device did not acknowledge the transaction.
    Nack {
        /// Register address the transaction targeted.
        addr: u8,
    },
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Io(error) => write!(f, "bus io error: {}", error),
            BusError::Nack { addr } => write!(f, "no ack from device at reg {:#04x}", addr),
        }
    }
}

impl std::error::Error for BusError {}

impl From<io::Error> for BusError {
    fn from(value: io::Error) -> Self {
        BusError::Io(value)
    }
}

/// Byte-at-a-time transactions against the converter's register file.
pub trait RegisterBus {
    /// Writes one byte to the given register address.
    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), BusError>;

    /// Reads one byte from the given register address.
    fn read_byte(&mut self, addr: u8) -> Result<u8, BusError>;

    /// Writes a whole register block, most significant byte first.
    fn write_reg(&mut self, reg: Register, data: &[u8]) -> Result<(), BusError> {
        for (i, byte) in data.iter().enumerate().take(reg.len as usize) {
            self.write_byte(reg.addr + i as u8, *byte)?;
        }
        Ok(())
    }

    /// Reads a whole register block into `data`, most significant byte first.
    fn read_reg(&mut self, reg: Register, data: &mut [u8]) -> Result<(), BusError> {
        for (i, slot) in data.iter_mut().enumerate().take(reg.len as usize) {
            *slot = self.read_byte(reg.addr + i as u8)?;
        }
        Ok(())
    }
}
