//! This crate is the host side of a Serial Wire Debug transport.  At the lowest level it talks to
//! an SWD adapter through the `Cable` trait, which clocks bits out to and in from the target and
//! turns the bus around between directions.  Drivers are provided for J-Link probes, FT2232H
//! adapters in MPSSE mode, and any set of embedded-hal GPIO pins.
//!
//! Above the cable sits the dispatcher.  A transfer on the SWD bus is a sequence of phases
//! (request, turnaround, ACK, data, parity) and each phase is one `Command`.  A `Session` takes
//! one command at a time, checks its width against the phase it claims to be, makes exactly one
//! call into the cable, and records the value in its `TransferLog`.  Building and ordering
//! commands is left to the caller.
//!
//! # Example
//! ```no_run
//! use swd_transport::cable;
//! use swd_transport::command::Command;
//! use swd_transport::session::Session;
//!
//! # fn main() -> swd_transport::error::Result<()> {
//! let cable = cable::new_from_string("jlink", 4_000_000)?;
//! let mut session = Session::new(cable);
//!
//! // Read DP IDCODE
//! let mut phases = [
//!     Command::request(0xa5),
//!     Command::turnaround_in(1),
//!     Command::ack(),
//!     Command::data_in(),
//!     Command::parity_in(),
//!     Command::turnaround_out(1),
//! ];
//! for cmd in phases.iter_mut() {
//!     session.dispatch(cmd)?;
//! }
//! println!("ack {:03b} idcode {:08x}", session.log.read.ack, session.log.read.data);
//! # Ok(())
//! # }
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod cable;
pub mod command;
pub mod drv;
pub mod error;
pub mod session;
