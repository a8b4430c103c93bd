use std::{
    fs::{File, OpenOptions},
    io,
    os::unix::io::AsRawFd,
};

use crate::{transport::BusTransport, BusAddress};

/// Argument of the `iicbus` ioctls (`struct iiccmd`).
#[repr(C)]
#[derive(Debug)]
struct IicCmd {
    slave: libc::c_uchar,
    count: libc::c_int,
    last: libc::c_int,
    buf: *mut libc::c_char,
}

impl IicCmd {
    fn new(slave: u8) -> Self {
        Self {
            slave,
            count: 0,
            last: 0,
            buf: core::ptr::null_mut(),
        }
    }
}

const IOCPARM_MASK: u32 = 0x1fff;
const IOC_VOID: u32 = 0x2000_0000;
const IOC_IN: u32 = 0x8000_0000;

const fn io(group: u8, num: u8) -> u32 {
    IOC_VOID | ((group as u32) << 8) | num as u32
}

const fn iow(group: u8, num: u8, len: usize) -> u32 {
    IOC_IN | (((len as u32) & IOCPARM_MASK) << 16) | ((group as u32) << 8) | num as u32
}

pub const I2CSTART: u32 = iow(b'i', 1, core::mem::size_of::<IicCmd>());
pub const I2CSTOP: u32 = io(b'i', 2);
pub const I2CRSTCARD: u32 = iow(b'i', 3, core::mem::size_of::<IicCmd>());
pub const I2CWRITE: u32 = iow(b'i', 4, core::mem::size_of::<IicCmd>());

/// BSD `iicbus` device, e.g. `/dev/iic0`, driven as an explicit start/write/stop session.
#[derive(Debug)]
pub struct IicSessionBus {
    file: Option<File>,
    slave: u8,
}

impl IicSessionBus {
    pub fn new() -> Self {
        Self {
            file: None,
            slave: BusAddress::default().session_slave(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn command(&self, request: u32, cmd: Option<&mut IicCmd>) -> io::Result<()> {
        let fd = self
            .file
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "iic device is not open"))?
            .as_raw_fd();
        let arg = match cmd {
            Some(cmd) => cmd as *mut IicCmd,
            None => core::ptr::null_mut(),
        };
        // SAFETY: `fd` belongs to the open file held by `self` and `arg` is either null (for
        // I2CSTOP) or points at a live `IicCmd` whose buffer outlives the call.
        let rc = unsafe { libc::ioctl(fd, request as _, arg) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Default for IicSessionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for IicSessionBus {
    type Error = io::Error;

    fn open(&mut self, path: &str) -> Result<(), Self::Error> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        self.file = Some(file);
        Ok(())
    }

    fn reset_session(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        let mut cmd = IicCmd::new(address.session_slave());
        self.command(I2CRSTCARD, Some(&mut cmd))
    }

    fn configure_address(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        self.slave = address.session_slave();
        let mut cmd = IicCmd::new(self.slave);
        self.command(I2CSTART, Some(&mut cmd))
    }

    fn write(&mut self, bytes: &[u8; 2]) -> Result<usize, Self::Error> {
        let mut buf = *bytes;
        let mut cmd = IicCmd::new(self.slave);
        cmd.last = 1;
        cmd.count = buf.len() as libc::c_int;
        cmd.buf = buf.as_mut_ptr() as *mut libc::c_char;
        self.command(I2CWRITE, Some(&mut cmd))?;
        Ok(buf.len())
    }

    fn stop_session(&mut self) -> Result<(), Self::Error> {
        self.command(I2CSTOP, None)
    }

    fn close(&mut self) {
        self.file = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_ioctl_request_numbers() {
        assert_eq!(core::mem::size_of::<IicCmd>(), 24);
        assert_eq!(I2CSTART, 0x8018_6901);
        assert_eq!(I2CRSTCARD, 0x8018_6903);
        assert_eq!(I2CWRITE, 0x8018_6904);
    }

    #[test]
    fn test_stop_request_number() {
        assert_eq!(I2CSTOP, 0x2000_6902);
    }

    #[test]
    fn test_default_targets_default_address() {
        let bus = IicSessionBus::default();
        assert!(!bus.is_open());
        assert_eq!(bus.slave, BusAddress::default().session_slave());
    }

    #[test]
    fn test_commands_without_open_fail() {
        let mut bus = IicSessionBus::new();
        assert!(!bus.is_open());
        let err = bus.reset_session(BusAddress::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        let err = bus.write(&[0x80, 0x01]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
        let err = bus.stop_session().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_open_missing_device_fails() {
        let mut bus = IicSessionBus::new();
        let err = bus.open("/dev/this-iic-bus-does-not-exist").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
