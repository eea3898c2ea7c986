//! Implementations for different SWD hardware adapters live here.  Hardware adapters should
//! implement the `Cable` trait, which provides the six bit-transfer primitives the dispatcher
//! drives: byte and word transfers in each direction, and the turnaround cycles between them.
#[cfg(feature = "std")]
use alloc::boxed::Box;

use crate::error::{Error, Result};

pub mod gpio;
#[cfg(feature = "std")]
pub mod jlink;
#[cfg(feature = "std")]
pub mod mpsse;

/// Order in which payload bits are placed on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOrder {
    /// Bit 0 of the payload goes first
    LsbFirst,
    /// Bit `bits - 1` of the payload goes first
    MsbFirst,
}

impl BitOrder {
    /// Convert between a payload value and its wire image, where bit 0 of the wire image is the
    /// first bit clocked.  The conversion is its own inverse.
    pub fn to_wire(self, value: u32, bits: u8) -> u32 {
        let bits = bits.min(32);
        let value = mask(value, bits);
        match self {
            BitOrder::LsbFirst => value,
            BitOrder::MsbFirst if bits == 0 => 0,
            BitOrder::MsbFirst => value.reverse_bits() >> (32 - bits as u32),
        }
    }

    pub fn from_wire(self, wire: u32, bits: u8) -> u32 {
        self.to_wire(wire, bits)
    }
}

fn mask(value: u32, bits: u8) -> u32 {
    if bits >= 32 {
        value
    } else {
        value & ((1 << bits) - 1)
    }
}

/// Refuse transfers a primitive cannot shift in one go
pub(crate) fn check(bits: u8, max: u8) -> Result<()> {
    if bits == 0 || bits > max {
        return Err(Error::InvalidBitCount(bits));
    }
    Ok(())
}

/// Every method returns the number of transfers performed (normally 1), or an error.  A read
/// that fails part way may still leave what it sampled in `data`.
pub trait Cable {
    /// Clock out up to 8 bits of `data`, `order` first.
    fn mosi_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize>;
    /// Clock out up to 32 bits of `data`.
    fn mosi_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize>;
    /// Clock in up to 8 bits into `data`.
    fn miso_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize>;
    /// Clock in up to 32 bits into `data`.
    fn miso_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize>;
    /// Turn the bus around so the host drives SWDIO afterwards.
    fn mosi_trn(&mut self, bits: u8) -> Result<usize>;
    /// Turn the bus around so the target drives SWDIO afterwards.
    fn miso_trn(&mut self, bits: u8) -> Result<usize>;
}

/// Open a cable by name.  `clock` is the SWCLK frequency in hertz.
#[cfg(feature = "std")]
pub fn new_from_string(name: &str, clock: u32) -> Result<Box<dyn Cable>> {
    match name {
        "jlink" => Ok(Box::new(jlink::JLink::new(clock)?)),
        "ft2232" | "jtagkey" => Ok(Box::new(mpsse::Ft2232Swd::new(clock, true)?)),
        "ft2232-b" => Ok(Box::new(mpsse::Ft2232Swd::new(clock, false)?)),
        _ => Err(Error::UnknownCable(name.into())),
    }
}
