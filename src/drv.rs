//! The command dispatcher.  Every bit that goes to or comes from the SWD bus passes through
//! `Session::dispatch`: it checks a command's width against its phase, makes exactly one call into
//! the `Cable`, records the value moved in the session log and marks the command done.
//!
//! Commands must be dispatched one at a time and in queue order; the dispatcher keeps no state of
//! its own apart from the session log.
use core::mem::discriminant;

use crate::cable::Cable;
use crate::command::{CmdType, Command, Payload};
use crate::error::{Error, Result};
use crate::session::Session;

impl<T, U> Session<T>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    /// Transmit `cmd` over the cable.  Returns the number of transfers the cable performed.
    ///
    /// Marker-only (`Mosi`, `Miso`) and `Undefined` commands return `Ok(0)` without touching the
    /// cable, and are not marked done.  A failed transfer is returned unchanged and leaves `done`
    /// clear, although the session log still records whatever the cable left in the payload.
    pub fn dispatch(&mut self, cmd: &mut Command) -> Result<usize> {
        let res = self.execute(cmd);
        trace(cmd, &res);

        match res? {
            Some(count) => {
                cmd.done = true;
                Ok(count)
            }
            None => Ok(0),
        }
    }

    /// Validate and run one command.  `None` means nothing was executed.
    fn execute(&mut self, cmd: &mut Command) -> Result<Option<usize>> {
        let cmdtype = cmd.cmdtype;
        let bits = cmd.bits;
        cmdtype.check_bits(bits)?;

        match cmdtype {
            CmdType::Undefined => return Ok(None),
            CmdType::Mosi | CmdType::Miso => {
                log::info!("{} command does not contain payload", cmdtype);
                return Ok(None);
            }
            _ => (),
        }

        let bad = Error::BadCommandData { cmdtype, bits };
        if discriminant(&cmd.payload) != discriminant(&Payload::slot_for(cmdtype)) {
            return Err(bad);
        }

        let cable = &mut *self.cable;
        let res = match (cmdtype.bit_order(), &mut cmd.payload) {
            (None, _) if cmdtype.is_mosi() => cable.mosi_trn(bits),
            (None, _) => cable.miso_trn(bits),
            (Some(order), Payload::Bit(v) | Payload::Byte(v)) if cmdtype.is_mosi() => {
                cable.mosi_8(v, bits, order)
            }
            (Some(order), Payload::Bit(v) | Payload::Byte(v)) => cable.miso_8(v, bits, order),
            (Some(order), Payload::Word(v)) if cmdtype.is_mosi() => cable.mosi_32(v, bits, order),
            (Some(order), Payload::Word(v)) => cable.miso_32(v, bits, order),
            (Some(_), Payload::None) => return Err(bad),
        };

        // Recorded even on failure, so a partial read stays visible
        if let Some(field) = cmdtype.log_field() {
            self.log.set(field, cmd.payload.data32());
        }

        res.map(Some)
    }
}

fn trace(cmd: &Command, res: &Result<Option<usize>>) {
    let status = match res {
        Ok(count) => count.unwrap_or(0) as i32,
        Err(e) => e.code(),
    };
    let payload = &cmd.payload;
    log::debug!(
        "dispatch bits={:<2} cmdtype={:<12} returns={:<3} payload=0x{:08x} data8={:08b} data32={:032b}",
        cmd.bits,
        cmd.cmdtype,
        status,
        payload.data32(),
        payload.data8(),
        payload.data32()
    );
}

/// Dispatch for queue owners that keep sessions and commands in optional slots.
pub fn dispatch<T, U>(session: Option<&mut Session<T>>, cmd: Option<&mut Command>) -> Result<usize>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    let session = session.ok_or(Error::MissingContext)?;
    let cmd = cmd.ok_or(Error::MissingCommand)?;
    session.dispatch(cmd)
}

/// Like `dispatch`, but speaks integer status: a negative error code, or the non-negative number
/// of transfers performed.
pub fn dispatch_status<T, U>(session: Option<&mut Session<T>>, cmd: Option<&mut Command>) -> i32
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    match dispatch(session, cmd) {
        Ok(count) => i32::try_from(count).unwrap_or(i32::MAX),
        Err(e) => e.code(),
    }
}
