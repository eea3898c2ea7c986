//! A `Command` is one phase of an SWD transfer: a request byte, a turnaround, an ACK, a data word,
//! a parity bit, or a raw bit-banged bit.  The phase is a `CmdType`, and every phase has a fixed
//! width, bit order and log destination given by the methods on `CmdType`.
use core::fmt;

use crate::cable::BitOrder;
use crate::error::{Error, Result};
use crate::session::LogField;

/// Length of the request phase in clock cycles.
pub const REQUEST_BITLEN: u8 = 8;
/// Length of the ACK phase in clock cycles.
pub const ACK_BITLEN: u8 = 3;
/// Length of a data phase in clock cycles, not counting parity.
pub const DATA_BITLEN: u8 = 32;
/// Shortest legal turnaround, in clock cycles.
pub const TURNAROUND_MIN: u8 = 1;
/// Longest legal turnaround, in clock cycles.
pub const TURNAROUND_MAX: u8 = 4;

/// Phase of an SWD transfer.  MOSI (host to target) phases have negative tags and MISO (target to
/// host) phases positive ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum CmdType {
    MosiData = -7,
    MosiRequest = -6,
    MosiTrn = -5,
    MosiParity = -4,
    MosiBitbang = -3,
    MosiControl = -2,
    /// Marks a group of MOSI phases; carries no payload
    Mosi = -1,
    Undefined = 0,
    /// Marks a group of MISO phases; carries no payload
    Miso = 1,
    MisoAck = 2,
    MisoBitbang = 3,
    MisoParity = 4,
    MisoTrn = 5,
    MisoData = 6,
}

/// Legal values of `Command::bits` for a phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    /// Anything goes, nothing is shifted
    None,
    Fixed(u8),
    /// Inclusive range of turnaround cycles
    Range(u8, u8),
}

impl CmdType {
    pub fn width(self) -> Width {
        match self {
            CmdType::Undefined | CmdType::Mosi | CmdType::Miso => Width::None,
            CmdType::MosiControl => Width::Fixed(8),
            CmdType::MosiBitbang | CmdType::MosiParity => Width::Fixed(1),
            CmdType::MisoBitbang | CmdType::MisoParity => Width::Fixed(1),
            CmdType::MosiRequest => Width::Fixed(REQUEST_BITLEN),
            CmdType::MisoAck => Width::Fixed(ACK_BITLEN),
            CmdType::MosiData | CmdType::MisoData => Width::Fixed(DATA_BITLEN),
            CmdType::MosiTrn | CmdType::MisoTrn => Width::Range(TURNAROUND_MIN, TURNAROUND_MAX),
        }
    }

    /// Order in which payload bits go on the wire, or `None` for phases without payload.
    pub fn bit_order(self) -> Option<BitOrder> {
        match self {
            CmdType::MosiControl | CmdType::MosiRequest => Some(BitOrder::MsbFirst),
            CmdType::MosiBitbang
            | CmdType::MosiParity
            | CmdType::MosiData
            | CmdType::MisoAck
            | CmdType::MisoBitbang
            | CmdType::MisoParity
            | CmdType::MisoData => Some(BitOrder::LsbFirst),
            CmdType::Undefined
            | CmdType::Mosi
            | CmdType::Miso
            | CmdType::MosiTrn
            | CmdType::MisoTrn => None,
        }
    }

    /// The session log field a successful transfer of this phase records into.
    pub fn log_field(self) -> Option<LogField> {
        match self {
            CmdType::MosiControl | CmdType::MosiBitbang => Some(LogField::WriteControl),
            CmdType::MosiParity => Some(LogField::WriteParity),
            CmdType::MosiRequest => Some(LogField::WriteRequest),
            CmdType::MosiData => Some(LogField::WriteData),
            CmdType::MisoAck => Some(LogField::ReadAck),
            CmdType::MisoBitbang => Some(LogField::ReadControl),
            CmdType::MisoParity => Some(LogField::ReadParity),
            CmdType::MisoData => Some(LogField::ReadData),
            CmdType::Undefined
            | CmdType::Mosi
            | CmdType::Miso
            | CmdType::MosiTrn
            | CmdType::MisoTrn => None,
        }
    }

    pub fn is_mosi(self) -> bool {
        (self as i8) < 0
    }

    pub fn is_miso(self) -> bool {
        (self as i8) > 0
    }

    /// Check `bits` against the width of this phase.
    pub fn check_bits(self, bits: u8) -> Result<()> {
        let ok = match self.width() {
            Width::None => true,
            Width::Fixed(n) => bits == n,
            Width::Range(min, max) => (min..=max).contains(&bits),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::BadCommandData { cmdtype: self, bits })
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CmdType::MosiData => "MOSI_DATA",
            CmdType::MosiRequest => "MOSI_REQUEST",
            CmdType::MosiTrn => "MOSI_TRN",
            CmdType::MosiParity => "MOSI_PARITY",
            CmdType::MosiBitbang => "MOSI_BITBANG",
            CmdType::MosiControl => "MOSI_CONTROL",
            CmdType::Mosi => "MOSI",
            CmdType::Undefined => "UNDEFINED",
            CmdType::Miso => "MISO",
            CmdType::MisoAck => "MISO_ACK",
            CmdType::MisoBitbang => "MISO_BITBANG",
            CmdType::MisoParity => "MISO_PARITY",
            CmdType::MisoTrn => "MISO_TRN",
            CmdType::MisoData => "MISO_DATA",
        }
    }
}

impl fmt::Display for CmdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl TryFrom<i8> for CmdType {
    type Error = Error;

    fn try_from(tag: i8) -> Result<Self> {
        Ok(match tag {
            -7 => CmdType::MosiData,
            -6 => CmdType::MosiRequest,
            -5 => CmdType::MosiTrn,
            -4 => CmdType::MosiParity,
            -3 => CmdType::MosiBitbang,
            -2 => CmdType::MosiControl,
            -1 => CmdType::Mosi,
            0 => CmdType::Undefined,
            1 => CmdType::Miso,
            2 => CmdType::MisoAck,
            3 => CmdType::MisoBitbang,
            4 => CmdType::MisoParity,
            5 => CmdType::MisoTrn,
            6 => CmdType::MisoData,
            _ => return Err(Error::BadCommandType(tag)),
        })
    }
}

/// Value carried by a command.  Bit-wide phases use `Bit`, byte-wide phases (control, request,
/// ACK) use `Byte`, and data phases use `Word`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Payload {
    #[default]
    None,
    Bit(u8),
    Byte(u8),
    Word(u32),
}

impl Payload {
    /// The empty slot a phase expects.
    pub fn slot_for(cmdtype: CmdType) -> Self {
        match cmdtype {
            CmdType::MosiBitbang | CmdType::MosiParity => Payload::Bit(0),
            CmdType::MisoBitbang | CmdType::MisoParity => Payload::Bit(0),
            CmdType::MosiControl | CmdType::MosiRequest | CmdType::MisoAck => Payload::Byte(0),
            CmdType::MosiData | CmdType::MisoData => Payload::Word(0),
            CmdType::Undefined
            | CmdType::Mosi
            | CmdType::Miso
            | CmdType::MosiTrn
            | CmdType::MisoTrn => Payload::None,
        }
    }

    /// Payload seen as a byte.  Words are truncated.
    pub fn data8(&self) -> u8 {
        self.data32() as u8
    }

    pub fn data32(&self) -> u32 {
        match *self {
            Payload::None => 0,
            Payload::Bit(b) | Payload::Byte(b) => b as u32,
            Payload::Word(w) => w,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command {
    pub cmdtype: CmdType,
    /// Number of clock cycles this command occupies on the wire
    pub bits: u8,
    pub payload: Payload,
    /// Set by the dispatcher once the transfer has completed
    pub done: bool,
}

impl Command {
    /// Create a command for `cmdtype` with an empty payload slot of the right shape.  Turnarounds
    /// get the shortest legal length.
    pub fn new(cmdtype: CmdType) -> Self {
        let bits = match cmdtype.width() {
            Width::None => 0,
            Width::Fixed(n) => n,
            Width::Range(min, _) => min,
        };
        Self {
            cmdtype,
            bits,
            payload: Payload::slot_for(cmdtype),
            done: false,
        }
    }

    /// Build a command from a raw tag as stored by integer-based queues.  `value` is placed in the
    /// slot the phase expects; `bits` is taken as given and checked at dispatch time.
    pub fn from_raw(tag: i8, bits: u8, value: u32) -> Result<Self> {
        let cmdtype = CmdType::try_from(tag)?;
        let payload = match Payload::slot_for(cmdtype) {
            Payload::None => Payload::None,
            Payload::Bit(_) => Payload::Bit((value & 1) as u8),
            Payload::Byte(_) => Payload::Byte(value as u8),
            Payload::Word(_) => Payload::Word(value),
        };
        Ok(Self {
            cmdtype,
            bits,
            payload,
            done: false,
        })
    }

    fn with_payload(cmdtype: CmdType, payload: Payload) -> Self {
        Self {
            payload,
            ..Self::new(cmdtype)
        }
    }

    pub fn control(byte: u8) -> Self {
        Self::with_payload(CmdType::MosiControl, Payload::Byte(byte))
    }

    pub fn bitbang_out(bit: bool) -> Self {
        Self::with_payload(CmdType::MosiBitbang, Payload::Bit(bit as u8))
    }

    pub fn parity_out(bit: bool) -> Self {
        Self::with_payload(CmdType::MosiParity, Payload::Bit(bit as u8))
    }

    pub fn turnaround_out(cycles: u8) -> Self {
        Self {
            bits: cycles,
            ..Self::new(CmdType::MosiTrn)
        }
    }

    pub fn request(request: u8) -> Self {
        Self::with_payload(CmdType::MosiRequest, Payload::Byte(request))
    }

    pub fn data_out(data: u32) -> Self {
        Self::with_payload(CmdType::MosiData, Payload::Word(data))
    }

    pub fn ack() -> Self {
        Self::new(CmdType::MisoAck)
    }

    pub fn bitbang_in() -> Self {
        Self::new(CmdType::MisoBitbang)
    }

    pub fn parity_in() -> Self {
        Self::new(CmdType::MisoParity)
    }

    pub fn turnaround_in(cycles: u8) -> Self {
        Self {
            bits: cycles,
            ..Self::new(CmdType::MisoTrn)
        }
    }

    pub fn data_in() -> Self {
        Self::new(CmdType::MisoData)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CmdType; 14] = [
        CmdType::MosiData,
        CmdType::MosiRequest,
        CmdType::MosiTrn,
        CmdType::MosiParity,
        CmdType::MosiBitbang,
        CmdType::MosiControl,
        CmdType::Mosi,
        CmdType::Undefined,
        CmdType::Miso,
        CmdType::MisoAck,
        CmdType::MisoBitbang,
        CmdType::MisoParity,
        CmdType::MisoTrn,
        CmdType::MisoData,
    ];

    #[test]
    fn tags_round_trip() {
        for t in ALL {
            assert_eq!(CmdType::try_from(t as i8).unwrap(), t);
        }
        assert!(matches!(CmdType::try_from(7), Err(Error::BadCommandType(7))));
        assert!(matches!(CmdType::try_from(-8), Err(Error::BadCommandType(-8))));
    }

    #[test]
    fn direction_follows_sign() {
        assert!(CmdType::MosiRequest.is_mosi());
        assert!(CmdType::MisoAck.is_miso());
        assert!(!CmdType::Undefined.is_mosi() && !CmdType::Undefined.is_miso());
    }

    #[test]
    fn new_commands_are_well_formed() {
        for t in ALL {
            let cmd = Command::new(t);
            assert!(t.check_bits(cmd.bits).is_ok(), "{}", t);
            assert!(!cmd.done);
        }
    }

    #[test]
    fn turnaround_accepts_range_only() {
        for t in [CmdType::MosiTrn, CmdType::MisoTrn] {
            assert!(t.check_bits(TURNAROUND_MIN - 1).is_err());
            for bits in TURNAROUND_MIN..=TURNAROUND_MAX {
                assert!(t.check_bits(bits).is_ok());
            }
            assert!(t.check_bits(TURNAROUND_MAX + 1).is_err());
        }
    }

    #[test]
    fn raw_commands_fill_the_right_slot() {
        let cmd = Command::from_raw(CmdType::MosiRequest as i8, 8, 0x1a5).unwrap();
        assert_eq!(cmd.payload, Payload::Byte(0xa5));
        let cmd = Command::from_raw(CmdType::MisoParity as i8, 1, 3).unwrap();
        assert_eq!(cmd.payload, Payload::Bit(1));
        let cmd = Command::from_raw(CmdType::MosiTrn as i8, 2, 0xffff).unwrap();
        assert_eq!(cmd.payload, Payload::None);
        assert!(Command::from_raw(42, 8, 0).is_err());
    }

    #[test]
    fn payload_views() {
        let p = Payload::Word(0x1234_5678);
        assert_eq!(p.data8(), 0x78);
        assert_eq!(p.data32(), 0x1234_5678);
        assert_eq!(Payload::Bit(1).data32(), 1);
        assert_eq!(Payload::None.data8(), 0);
    }
}
