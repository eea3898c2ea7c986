//! A `Session` is one debug session on one cable.  It owns the cable (or a mutable reference to
//! it) and a `TransferLog` holding the last value moved in each phase, which the dispatcher
//! updates on every transfer.  Sessions share nothing with each other, so independent SWD buses
//! each get their own `Session`.
use crate::cable::Cable;

/// Last values shifted out to the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MosiLog {
    pub control: u8,
    pub request: u8,
    pub parity: u8,
    pub data: u32,
}

/// Last values shifted in from the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MisoLog {
    pub control: u8,
    pub ack: u8,
    pub parity: u8,
    pub data: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransferLog {
    pub write: MosiLog,
    pub read: MisoLog,
}

/// Names one field of a `TransferLog`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogField {
    WriteControl,
    WriteRequest,
    WriteParity,
    WriteData,
    ReadControl,
    ReadAck,
    ReadParity,
    ReadData,
}

impl LogField {
    pub const ALL: [LogField; 8] = [
        LogField::WriteControl,
        LogField::WriteRequest,
        LogField::WriteParity,
        LogField::WriteData,
        LogField::ReadControl,
        LogField::ReadAck,
        LogField::ReadParity,
        LogField::ReadData,
    ];
}

impl TransferLog {
    pub fn get(&self, field: LogField) -> u32 {
        match field {
            LogField::WriteControl => self.write.control as u32,
            LogField::WriteRequest => self.write.request as u32,
            LogField::WriteParity => self.write.parity as u32,
            LogField::WriteData => self.write.data,
            LogField::ReadControl => self.read.control as u32,
            LogField::ReadAck => self.read.ack as u32,
            LogField::ReadParity => self.read.parity as u32,
            LogField::ReadData => self.read.data,
        }
    }

    /// Record `value` into `field`.  Byte-wide fields keep the low byte.
    pub fn set(&mut self, field: LogField, value: u32) {
        match field {
            LogField::WriteControl => self.write.control = value as u8,
            LogField::WriteRequest => self.write.request = value as u8,
            LogField::WriteParity => self.write.parity = value as u8,
            LogField::WriteData => self.write.data = value,
            LogField::ReadControl => self.read.control = value as u8,
            LogField::ReadAck => self.read.ack = value as u8,
            LogField::ReadParity => self.read.parity = value as u8,
            LogField::ReadData => self.read.data = value,
        }
    }
}

pub struct Session<T> {
    pub cable: T,
    pub log: TransferLog,
}

impl<T, U> Session<T>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    /// Start a session on an existing `Cable`
    pub fn new(cable: T) -> Self {
        Self {
            cable,
            log: TransferLog::default(),
        }
    }

    /// Clear the transfer log.  The dispatcher never does this on its own.
    pub fn reset_log(&mut self) {
        self.log = TransferLog::default();
    }

    /// End the session and hand back the cable
    pub fn into_cable(self) -> T {
        self.cable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_independent() {
        for field in LogField::ALL {
            let mut log = TransferLog::default();
            log.set(field, 0xdead_beef);
            for other in LogField::ALL {
                if other == field {
                    assert_ne!(log.get(other), 0);
                } else {
                    assert_eq!(log.get(other), 0, "{:?} leaked into {:?}", field, other);
                }
            }
        }
    }

    #[test]
    fn byte_fields_truncate() {
        let mut log = TransferLog::default();
        log.set(LogField::ReadAck, 0x1_04);
        assert_eq!(log.read.ack, 0x04);
        log.set(LogField::WriteData, 0x1234_5678);
        assert_eq!(log.write.data, 0x1234_5678);
    }
}
