use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    os::unix::io::AsRawFd,
};

use crate::{transport::BusTransport, BusAddress};

/// `ioctl` request that sets the target address of an `i2c-dev` file descriptor.
pub const I2C_SLAVE: libc::c_ulong = 0x0703;

/// Linux `i2c-dev` character device, e.g. `/dev/i2c-0`.
#[derive(Debug)]
pub struct I2cDevBus {
    file: Option<File>,
}

impl I2cDevBus {
    pub fn new() -> Self {
        Self { file: None }
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "i2c device is not open"))
    }
}

impl Default for I2cDevBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusTransport for I2cDevBus {
    type Error = io::Error;

    fn open(&mut self, path: &str) -> Result<(), Self::Error> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        self.file = Some(file);
        Ok(())
    }

    fn configure_address(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        let fd = self.file()?.as_raw_fd();
        // SAFETY: `fd` belongs to the open file held by `self`, and I2C_SLAVE takes the address
        // by value.
        let rc = unsafe {
            libc::ioctl(
                fd,
                I2C_SLAVE as _,
                libc::c_ulong::from(address.address()),
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8; 2]) -> Result<usize, Self::Error> {
        self.file()?.write(bytes)
    }

    fn close(&mut self) {
        // dropping the file closes the descriptor
        self.file = None;
    }
}
