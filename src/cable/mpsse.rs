//! Implement the `Cable` trait for FT2232H adapters in MPSSE mode, like the Bus Blaster or other
//! "jtagkey" designs.  SWDIO is wired to TDI through a resistor and read back on TDO, and SWCLK is
//! TCK.  During turnaround TDI is switched to an input so the target can drive the line.
use std::fmt::Debug;
use std::time::Duration;

use ftdi_mpsse::{ClockBitsIn, ClockBitsOut, ClockDataIn, ClockDataOut};
use libftd2xx::{Ft2232h, Ftdi, FtdiCommon, FtdiMpsse, MpsseCmdBuilder, MpsseCmdExecutor};

use crate::cable::{check, BitOrder, Cable};
use crate::error::{adapter_error, Result};

// Lower pins
const PIN_SWCLK: u8 = 1;
const PIN_SWDIO_OUT: u8 = 1 << 1;
//const PIN_SWDIO_IN: u8 = 1 << 2;
const PIN_N_OE: u8 = 1 << 4;
const LOWER_OUTPUT_PINS: u8 = PIN_SWCLK | PIN_SWDIO_OUT | PIN_N_OE;

// Upper pins
const PIN_N_TRST: u8 = 1;
const PIN_N_SRST: u8 = 1 << 1;
const PIN_N_TRST_OE: u8 = 1 << 2;
const PIN_N_SRST_OE: u8 = 1 << 3;
const UPPER_OUTPUT_PINS: u8 = PIN_N_TRST | PIN_N_SRST | PIN_N_TRST_OE | PIN_N_SRST_OE;

/// Assemble the wire image from an MPSSE read reply: whole bytes first, then the partial byte
/// which the adapter shifts in from the top.
fn wire_from_reply(mut buf: [u8; 5], bits: u8) -> u32 {
    let bytes = (bits / 8) as usize;
    let rest = bits % 8;
    if rest > 0 {
        buf[bytes] >>= 8 - rest;
    }
    u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]])
}

pub struct Mpsse<T> {
    ft: T,
}

impl<T: FtdiMpsse + MpsseCmdExecutor> Mpsse<T>
    where <T as MpsseCmdExecutor>::Error: Debug
{
    pub fn new(mut ft: T, clock: u32) -> Result<Self>
    {
        ft.initialize_mpsse_default().map_err(adapter_error)?;
        ft.set_clock(clock).map_err(adapter_error)?;

        let mut mpsse = Self {
            ft,
        };
        let builder = MpsseCmdBuilder::new()
            .disable_3phase_data_clocking()
            .disable_adaptive_data_clocking();
        mpsse.send(builder)?;
        mpsse.drive(true)?;
        Ok(mpsse)
    }

    fn send(&mut self, builder: MpsseCmdBuilder) -> Result<()> {
        self.ft.send(builder.as_slice()).map_err(adapter_error)
    }

    fn xfer(&mut self, builder: MpsseCmdBuilder, buf: &mut [u8]) -> Result<()> {
        let builder = builder.send_immediate();
        self.ft.xfer(builder.as_slice(), buf).map_err(adapter_error)
    }

    /// Take SWDIO (`drive` true) or leave it to the target.  nOE stays low so the buffers are on.
    fn drive(&mut self, drive: bool) -> Result<()> {
        let direction = if drive {
            LOWER_OUTPUT_PINS
        } else {
            LOWER_OUTPUT_PINS & !PIN_SWDIO_OUT
        };
        let builder = MpsseCmdBuilder::new()
            .set_gpio_lower(0, direction);
        self.send(builder)
    }

    fn write_bits(&mut self, wire: u32, bits: u8) -> Result<()> {
        let bytes = (bits / 8) as usize;
        let rest = bits % 8;
        let le = wire.to_le_bytes();

        // Target samples on the rising edge, so change SWDIO on the falling one
        let mut builder = MpsseCmdBuilder::new();
        if bytes > 0 {
            builder = builder.clock_data_out(ClockDataOut::LsbNeg, &le[..bytes]);
        }
        if rest > 0 {
            builder = builder.clock_bits_out(ClockBitsOut::LsbNeg, le[bytes], rest);
        }
        self.send(builder)
    }

    fn read_bits(&mut self, bits: u8) -> Result<u32> {
        let bytes = (bits / 8) as usize;
        let rest = bits % 8;

        let mut builder = MpsseCmdBuilder::new();
        if bytes > 0 {
            builder = builder.clock_data_in(ClockDataIn::LsbPos, bytes);
        }
        if rest > 0 {
            builder = builder.clock_bits_in(ClockBitsIn::LsbPos, rest);
        }

        let mut buf = [0; 5];
        let len = bytes + (rest > 0) as usize;
        self.xfer(builder, &mut buf[..len])?;
        Ok(wire_from_reply(buf, bits))
    }

    fn clocks(&mut self, bits: u8) -> Result<()> {
        let builder = MpsseCmdBuilder::new()
            .clock_bits_out(ClockBitsOut::LsbNeg, 0, bits);
        self.send(builder)
    }
}

impl<T: FtdiMpsse + MpsseCmdExecutor> Cable for Mpsse<T>
    where <T as MpsseCmdExecutor>::Error: Debug
{
    fn mosi_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 8)?;
        self.write_bits(order.to_wire(*data as u32, bits), bits)?;
        Ok(1)
    }

    fn mosi_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 32)?;
        self.write_bits(order.to_wire(*data, bits), bits)?;
        Ok(1)
    }

    fn miso_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 8)?;
        let wire = self.read_bits(bits)?;
        *data = order.from_wire(wire, bits) as u8;
        Ok(1)
    }

    fn miso_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 32)?;
        let wire = self.read_bits(bits)?;
        *data = order.from_wire(wire, bits);
        Ok(1)
    }

    fn mosi_trn(&mut self, bits: u8) -> Result<usize> {
        check(bits, 8)?;
        self.clocks(bits)?;
        self.drive(true)?;
        Ok(1)
    }

    fn miso_trn(&mut self, bits: u8) -> Result<usize> {
        check(bits, 8)?;
        self.drive(false)?;
        self.clocks(bits)?;
        Ok(1)
    }
}

pub struct Ft2232Swd {
    ft: Mpsse<Ft2232h>,
}

impl Ft2232Swd {
    /// Open an FT2232H adapter.  FT2232-based adapters have both an "A" interface and a "B"
    /// interface.  `primary` controls which to use. `clock` controls the speed of SWCLK in hertz.
    pub fn new(clock: u32, primary: bool) -> Result<Self> {
        let description = if primary {
            "Dual RS232-HS A"
        } else {
            "Dual RS232-HS B"
        };
        let ft = Ftdi::with_description(description).map_err(adapter_error)?;
        let ft = Ft2232h::try_from(ft).map_err(adapter_error)?;
        let mut ft = Mpsse::new(ft, clock)?;
        ft.ft.set_latency_timer(Duration::from_millis(0)).map_err(adapter_error)?;
        ft.ft.set_gpio_upper(PIN_N_TRST | PIN_N_SRST, UPPER_OUTPUT_PINS).map_err(adapter_error)?;
        log::debug!("opened {} at {} Hz", description, clock);

        Ok(Ft2232Swd {
            ft,
        })
    }

    /// Put the target in reset using the SRST signal.
    pub fn assert_srst(&mut self) -> Result<()> {
        self.ft.ft.set_gpio_upper(PIN_N_TRST, UPPER_OUTPUT_PINS).map_err(adapter_error)
    }

    /// Take the target out of reset.
    pub fn deassert_srst(&mut self) -> Result<()> {
        self.ft.ft.set_gpio_upper(PIN_N_TRST | PIN_N_SRST, UPPER_OUTPUT_PINS).map_err(adapter_error)
    }
}

impl Cable for Ft2232Swd {
    fn mosi_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize> {
        self.ft.mosi_8(data, bits, order)
    }

    fn mosi_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        self.ft.mosi_32(data, bits, order)
    }

    fn miso_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize> {
        self.ft.miso_8(data, bits, order)
    }

    fn miso_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        self.ft.miso_32(data, bits, order)
    }

    fn mosi_trn(&mut self, bits: u8) -> Result<usize> {
        self.ft.mosi_trn(bits)
    }

    fn miso_trn(&mut self, bits: u8) -> Result<usize> {
        self.ft.miso_trn(bits)
    }
}
