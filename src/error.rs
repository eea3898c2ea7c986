//! Errors reported by the dispatcher and the cable drivers.  Every error has a negative numeric
//! status (see `Error::code`) so that queue owners speaking integers can pass results through
//! unchanged.
#[cfg(feature = "std")]
use alloc::string::String;

use crate::command::CmdType;

pub const ERROR_NULLPOINTER: i32 = -2;
pub const ERROR_NULLCONTEXT: i32 = -10;
pub const ERROR_BADCMDTYPE: i32 = -30;
pub const ERROR_BADCMDDATA: i32 = -31;
pub const ERROR_DRIVER: i32 = -40;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no session context")]
    MissingContext,

    #[error("no command")]
    MissingCommand,

    #[error("unknown command type {0}")]
    BadCommandType(i8),

    #[error("{cmdtype} command cannot carry {bits} bits")]
    BadCommandData { cmdtype: CmdType, bits: u8 },

    /// A failure status reported by a transfer primitive.  Negative codes are passed through
    /// verbatim; anything else reports as `ERROR_DRIVER`.
    #[error("driver returned status {0}")]
    Driver(i32),

    #[error("cable cannot shift {0} bits in one transfer")]
    InvalidBitCount(u8),

    #[error("pin error: {0:?}")]
    Pin(embedded_hal::digital::ErrorKind),

    #[cfg(feature = "std")]
    #[error("usb: {0}")]
    Usb(#[from] rusb::Error),

    #[cfg(feature = "std")]
    #[error("adapter: {0}")]
    Adapter(String),

    #[cfg(feature = "std")]
    #[error("adapter reported status {0:#04x}")]
    AdapterStatus(u8),

    #[cfg(feature = "std")]
    #[error("unknown cable {0:?}")]
    UnknownCable(String),
}

impl Error {
    /// Wrap a raw primitive status.  Non-negative values are not failures, so they collapse to
    /// the generic driver code.
    pub fn from_status(status: i32) -> Self {
        if status < 0 {
            Error::Driver(status)
        } else {
            Error::Driver(ERROR_DRIVER)
        }
    }

    /// The negative status code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::MissingContext => ERROR_NULLCONTEXT,
            Error::MissingCommand => ERROR_NULLPOINTER,
            Error::BadCommandType(_) => ERROR_BADCMDTYPE,
            Error::BadCommandData { .. } | Error::InvalidBitCount(_) => ERROR_BADCMDDATA,
            Error::Driver(code) if *code < 0 => *code,
            _ => ERROR_DRIVER,
        }
    }
}

pub(crate) fn pin_error<E: embedded_hal::digital::Error>(e: E) -> Error {
    Error::Pin(e.kind())
}

#[cfg(feature = "std")]
pub(crate) fn adapter_error<E: core::fmt::Debug>(e: E) -> Error {
    Error::Adapter(alloc::format!("{:?}", e))
}
