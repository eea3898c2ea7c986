//! Implement the `Cable` trait for SEGGER J-Link adapters.  Every primitive becomes one SWD I/O
//! command: a direction bitmap saying which cycles the host drives SWDIO, the bits to drive, and a
//! reply holding what was sampled on every cycle plus a status byte.
use alloc::vec::Vec;
use alloc::vec;
use alloc::format;
use std::time::Duration;

use rusb::{DeviceHandle, Direction, GlobalContext};
use rusb::constants::*;

use crate::cable::{check, BitOrder, Cable};
use crate::error::{Error, Result};

const TIMEOUT: Duration = Duration::from_millis(100);

const CMD_SET_SPEED: u8 = 0x05;
const CMD_GET_STATUS: u8 = 0x07;
const CMD_SELECT_IF: u8 = 0xc7;
const CMD_SWD_IO: u8 = 0xcf;
const CMD_ASSERT_SRST: u8 = 0xdc;
const CMD_DEASSERT_SRST: u8 = 0xdd;

const IF_SWD: u8 = 1;

/// Lowest target voltage, in millivolts, we treat as a powered target
const MIN_VREF_MV: u16 = 1500;

pub struct JLink {
    device: DeviceHandle<GlobalContext>,
    // queued bytes to send
    buffer: Vec<u8>,
    read_endpoint: u8,
    write_endpoint: u8,
}

/// Build an SWD I/O command for `bits` cycles.  Bit `n` of `dir` set means the host drives SWDIO
/// with bit `n` of `out` on cycle `n`.
fn swd_io_command(dir: u32, out: u32, bits: u8) -> Vec<u8> {
    let bytes = (bits as usize + 7) / 8;
    let mut cmdbuf = vec![0x00, bits, 0x00];
    cmdbuf.extend_from_slice(&dir.to_le_bytes()[..bytes]);
    cmdbuf.extend_from_slice(&out.to_le_bytes()[..bytes]);
    cmdbuf
}

/// Split a reply into the sampled bits and check the trailing status byte.
fn swd_io_reply(reply: &[u8], bits: u8) -> Result<u32> {
    let bytes = (bits as usize + 7) / 8;
    let mut sampled = [0; 4];
    sampled[..bytes].copy_from_slice(&reply[..bytes]);
    let wire = u32::from_le_bytes(sampled);

    match reply[bytes] {
        0 => Ok(wire),
        status => Err(Error::AdapterStatus(status)),
    }
}

fn all_ones(bits: u8) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1 << bits) - 1
    }
}

impl JLink {
    /// Open the first J-Link on the bus and switch it to SWD.  `clock` is in hertz.
    pub fn new(clock: u32) -> Result<Self> {
        let mut device = rusb::open_device_with_vid_pid(0x1366, 0x0105)
            .ok_or(Error::Usb(rusb::Error::NoDevice))?;
        let descriptor = device.device().active_config_descriptor()?;
        for i in descriptor.interfaces() {
            for d in i.descriptors() {
                if d.class_code() != LIBUSB_CLASS_VENDOR_SPEC ||
                    d.sub_class_code() != LIBUSB_CLASS_VENDOR_SPEC ||
                        d.num_endpoints() < 2 {
                            continue;
                }

                let mut read_endpoint = None;
                let mut write_endpoint = None;
                for e in d.endpoint_descriptors() {
                    match e.direction() {
                        Direction::In => read_endpoint = Some(e.address()),
                        Direction::Out => write_endpoint = Some(e.address()),
                    }
                }

                let (Some(read_endpoint), Some(write_endpoint)) = (read_endpoint, write_endpoint) else {
                    continue;
                };

                device.claim_interface(d.interface_number())?;

                // Drain anything left over from a previous session
                let mut buf = [0; 2];
                let _ = device.read_bulk(read_endpoint, &mut buf, Duration::from_millis(10));

                let mut jlink = Self {
                    device,
                    buffer: vec![],
                    read_endpoint,
                    write_endpoint,
                };

                jlink.get_status()?;
                jlink.set_clock(clock);
                jlink.set_interface(IF_SWD)?;
                jlink.deassert_srst();
                log::debug!("jlink ready, SWD at {} Hz", clock);

                return Ok(jlink);
            }
        }
        Err(Error::Usb(rusb::Error::NotFound))
    }

    fn send_command(&mut self, cmd: u8, mut data: Vec<u8>) {
        data.insert(0, cmd);
        self.buffer.append(&mut data);
    }

    fn read_data(&mut self, len: usize) -> Result<Vec<u8>> {
        // Submit any pending writes
        let wr = self.device.write_bulk(self.write_endpoint, &self.buffer, TIMEOUT)?;
        if wr != self.buffer.len() {
            return Err(Error::Usb(rusb::Error::Io));
        }
        self.buffer.clear();

        let mut recv_bytes = len;
        let mut data = vec![];

        while recv_bytes > 0 {
            let mut buffer = vec![0; recv_bytes];
            let len = self.device.read_bulk(self.read_endpoint, &mut buffer, TIMEOUT)?;
            if len == 0 {
                return Err(Error::Usb(rusb::Error::Timeout));
            }
            buffer.resize(len, 0);
            data.append(&mut buffer);
            recv_bytes -= len;
        }
        Ok(data)
    }

    /// Read the adapter status block.  Fails if the target appears unpowered.
    pub fn get_status(&mut self) -> Result<Vec<u8>> {
        self.send_command(CMD_GET_STATUS, vec![]);
        let data = self.read_data(8)?;

        let vref = u16::from_le_bytes([data[0], data[1]]);
        if vref < MIN_VREF_MV {
            log::warn!("target voltage {} mV, possibly unpowered or disconnected", vref);
            return Err(Error::Adapter(format!("vref too low: {} mV", vref)));
        }
        Ok(data)
    }

    pub fn set_clock(&mut self, mut clock: u32) {
        clock /= 1000;
        let buf = vec![(clock & 0xff) as u8, ((clock >> 8) & 0xff) as u8];
        self.send_command(CMD_SET_SPEED, buf);
    }

    pub fn set_interface(&mut self, intf: u8) -> Result<()> {
        let buf = vec![intf];
        self.send_command(CMD_SELECT_IF, buf);
        let _ = self.read_data(4)?;
        Ok(())
    }

    pub fn assert_srst(&mut self) {
        self.send_command(CMD_ASSERT_SRST, vec![]);
    }

    pub fn deassert_srst(&mut self) {
        self.send_command(CMD_DEASSERT_SRST, vec![]);
    }

    /// Run one SWD I/O sequence and return the wire image sampled on SWDIO.
    fn swd_io(&mut self, dir: u32, out: u32, bits: u8) -> Result<u32> {
        let bytes = (bits as usize + 7) / 8;
        self.send_command(CMD_SWD_IO, swd_io_command(dir, out, bits));
        let reply = self.read_data(bytes + 1)?;
        swd_io_reply(&reply, bits)
    }
}

impl Cable for JLink {
    fn mosi_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 8)?;
        self.swd_io(all_ones(bits), order.to_wire(*data as u32, bits), bits)?;
        Ok(1)
    }

    fn mosi_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 32)?;
        self.swd_io(all_ones(bits), order.to_wire(*data, bits), bits)?;
        Ok(1)
    }

    fn miso_8(&mut self, data: &mut u8, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 8)?;
        let wire = self.swd_io(0, 0, bits)?;
        *data = order.from_wire(wire, bits) as u8;
        Ok(1)
    }

    fn miso_32(&mut self, data: &mut u32, bits: u8, order: BitOrder) -> Result<usize> {
        check(bits, 32)?;
        let wire = self.swd_io(0, 0, bits)?;
        *data = order.from_wire(wire, bits);
        Ok(1)
    }

    // Nobody drives SWDIO during a turnaround, whichever way it goes
    fn mosi_trn(&mut self, bits: u8) -> Result<usize> {
        check(bits, 32)?;
        self.swd_io(0, 0, bits)?;
        Ok(1)
    }

    fn miso_trn(&mut self, bits: u8) -> Result<usize> {
        check(bits, 32)?;
        self.swd_io(0, 0, bits)?;
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_command_layout() {
        let cmd = swd_io_command(all_ones(8), 0xa5, 8);
        assert_eq!(cmd, [0x00, 8, 0x00, 0xff, 0xa5]);
    }

    #[test]
    fn data_command_layout() {
        let cmd = swd_io_command(0, 0, 32);
        assert_eq!(cmd.len(), 3 + 4 + 4);
        let cmd = swd_io_command(all_ones(3), 0b101, 3);
        assert_eq!(cmd, [0x00, 3, 0x00, 0x07, 0x05]);
    }

    #[test]
    fn reply_status_is_checked() {
        assert_eq!(swd_io_reply(&[0x01, 0x00], 3).unwrap(), 1);
        assert_eq!(swd_io_reply(&[0x78, 0x56, 0x34, 0x12, 0x00], 32).unwrap(), 0x1234_5678);
        assert!(matches!(swd_io_reply(&[0x01, 0x06], 3), Err(Error::AdapterStatus(0x06))));
    }
}
