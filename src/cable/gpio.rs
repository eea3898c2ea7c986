//! Bit-bang SWD over plain GPIO pins.  SWDIO is split into an output pin, an input pin and an
//! output-enable, the way level-shifted adapters wire it: when `oe` is low the host stops driving
//! SWDIO and the target may drive it.
use embedded_hal::{delay::DelayNs, digital::{InputPin, OutputPin, PinState}};

use crate::cable::{check, BitOrder, Cable};
use crate::error::{pin_error, Result};

pub struct Gpio<Clk, Dio, Din, Oe, Delay> where Clk: OutputPin, Dio: OutputPin, Din: InputPin, Oe: OutputPin, Delay: DelayNs {
    half_period: u32,
    delay: Delay,
    clock: Clk,
    swdio_out: Dio,
    swdio_in: Din,
    oe: Oe,
}

impl<Clk, Dio, Din, Oe, Delay> Gpio<Clk, Dio, Din, Oe, Delay> where Clk: OutputPin, Dio: OutputPin, Din: InputPin, Oe: OutputPin, Delay: DelayNs {
    /// Take over the pins.  SWCLK idles high and the host starts out driving SWDIO.
    pub fn new(freq_khz: u32, clock: Clk, swdio_out: Dio, swdio_in: Din, oe: Oe, delay: Delay) -> Result<Self> {
        let period_ns = 1_000_000 / freq_khz.max(1);
        let half_period = period_ns / 2;
        let mut gpio = Gpio { half_period, clock, swdio_out, swdio_in, oe, delay };
        gpio.clock.set_high().map_err(pin_error)?;
        gpio.oe.set_high().map_err(pin_error)?;
        Ok(gpio)
    }

    /// Give the pins back
    pub fn release(self) -> (Clk, Dio, Din, Oe, Delay) {
        (self.clock, self.swdio_out, self.swdio_in, self.oe, self.delay)
    }

    fn cycle(&mut self) -> Result<()> {
        self.clock.set_low().map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        self.clock.set_high().map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        Ok(())
    }

    fn write_bits(&mut self, wire: u32, bits: u8) -> Result<()> {
        for b in 0..bits {
            // The target samples on the rising edge
            let state = PinState::from((wire >> b) & 1 == 1);
            self.swdio_out.set_state(state).map_err(pin_error)?;
            self.cycle()?;
        }
        Ok(())
    }

    /// Shift in `bits` bits.  On failure, whatever was sampled so far is still in `wire`.
    fn read_bits(&mut self, wire: &mut u32, bits: u8) -> Result<()> {
        *wire = 0;
        for b in 0..bits {
            self.clock.set_low().map_err(pin_error)?;
            self.delay.delay_ns(self.half_period);

            // Sample while the clock is low, the target changes SWDIO on the rising edge
            let bit = self.swdio_in.is_high().map_err(pin_error)? as u32;
            *wire |= bit << b;

            self.clock.set_high().map_err(pin_error)?;
            self.delay.delay_ns(self.half_period);
        }
        Ok(())
    }

    fn clocks(&mut self, bits: u8) -> Result<()> {
        for _ in 0..bits {
            self.cycle()?;
        }
        Ok(())
    }
}

impl<Clk, Dio, Din, Oe, Delay> Cable for Gpio<Clk, Dio, Din, Oe, Delay> where Clk: OutputPin, Dio: OutputPin, Din: InputPin, Oe: OutputPin, Delay: DelayNs {
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
        let mut wire = 0;
        let res = self.read_bits(&mut wire, bits);
        *data = order.from_wire(wire, bits) as u8;
        res.map(|_| 1)
    }

    fn miso_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 32)?;
        let mut wire = 0;
        let res = self.read_bits(&mut wire, bits);
        *data = order.from_wire(wire, bits);
        res.map(|_| 1)
    }

    fn mosi_trn(&mut self, bits: u8) -> Result<usize> {
        // Let the target release the line, then take it back
        self.clocks(bits)?;
        self.oe.set_high().map_err(pin_error)?;
        Ok(1)
    }

    fn miso_trn(&mut self, bits: u8) -> Result<usize> {
        self.oe.set_low().map_err(pin_error)?;
        self.clocks(bits)?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    #[derive(Default)]
    struct Bus {
        clock: bool,
        oe: bool,
        /// Levels the host put on SWDIO, one per bit
        written: Vec<bool>,
        /// Bits the target presents, consumed on each sample
        to_read: Vec<bool>,
        rising_edges: usize,
    }

    type Shared = Rc<RefCell<Bus>>;

    struct Clock(Shared);
    struct In(Shared);
    struct Enable(Shared);
    struct NoDelay;

    impl ErrorType for Clock { type Error = Infallible; }
    impl ErrorType for In { type Error = Infallible; }
    impl ErrorType for Enable { type Error = Infallible; }

    impl OutputPin for Clock {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.0.borrow_mut().clock = false;
            Ok(())
        }
        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            let mut bus = self.0.borrow_mut();
            if !bus.clock {
                bus.rising_edges += 1;
            }
            bus.clock = true;
            Ok(())
        }
    }

    impl InputPin for In {
        fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
            let mut bus = self.0.borrow_mut();
            Ok(if bus.to_read.is_empty() { false } else { bus.to_read.remove(0) })
        }
        fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
            self.is_high().map(|b| !b)
        }
    }

    impl OutputPin for Enable {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.0.borrow_mut().oe = false;
            Ok(())
        }
        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.0.borrow_mut().oe = true;
            Ok(())
        }
    }

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// SWDIO output that records every level it is set to
    struct Recorder(Shared);

    impl ErrorType for Recorder { type Error = Infallible; }

    impl OutputPin for Recorder {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.0.borrow_mut().written.push(false);
            Ok(())
        }
        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.0.borrow_mut().written.push(true);
            Ok(())
        }
    }

    fn cable(bus: &Shared) -> Gpio<Clock, Recorder, In, Enable, NoDelay> {
        let gpio = Gpio::new(1000, Clock(bus.clone()), Recorder(bus.clone()), In(bus.clone()), Enable(bus.clone()), NoDelay).unwrap();
        bus.borrow_mut().rising_edges = 0;
        gpio
    }

    #[test]
    fn request_is_sent_msb_first() {
        let bus = Shared::default();
        let mut gpio = cable(&bus);
        let mut request = 0b1000_0001u8 | 0b0010_0000;
        gpio.mosi_8(&mut request, 8, BitOrder::MsbFirst).unwrap();

        let bus = bus.borrow();
        assert_eq!(bus.written, [true, false, true, false, false, false, false, true]);
        assert_eq!(bus.rising_edges, 8);
    }

    #[test]
    fn ack_is_read_lsb_first() {
        let bus = Shared::default();
        bus.borrow_mut().to_read = alloc::vec![true, false, false];
        let mut gpio = cable(&bus);
        let mut ack = 0;
        assert_eq!(gpio.miso_8(&mut ack, 3, BitOrder::LsbFirst).unwrap(), 1);
        assert_eq!(ack, 0b001);
    }

    #[test]
    fn turnaround_hands_the_line_over() {
        let bus = Shared::default();
        let mut gpio = cable(&bus);
        assert!(bus.borrow().oe);

        gpio.miso_trn(1).unwrap();
        assert!(!bus.borrow().oe);
        gpio.mosi_trn(1).unwrap();
        assert!(bus.borrow().oe);
        assert_eq!(bus.borrow().rising_edges, 2);
    }

    #[test]
    fn oversized_transfers_are_refused() {
        let bus = Shared::default();
        let mut gpio = cable(&bus);
        let mut byte = 0;
        assert!(matches!(gpio.mosi_8(&mut byte, 9, BitOrder::LsbFirst), Err(Error::InvalidBitCount(9))));
        assert_eq!(bus.borrow().rising_edges, 0);
    }
}
