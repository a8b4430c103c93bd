pub mod embedded_hal_bus;
#[cfg(all(feature = "std", unix))]
pub mod i2c_dev;
#[cfg(all(feature = "std", unix))]
pub mod iic_session;

use crate::BusAddress;

pub use embedded_hal_bus::EmbeddedHalBus;
#[cfg(all(feature = "std", unix))]
pub use i2c_dev::I2cDevBus;
#[cfg(all(feature = "std", unix))]
pub use iic_session::IicSessionBus;

/// Platform bus primitive used by the driver. One implementation exists per way the platform
/// exposes the bus: a plain file descriptor with an address ioctl, a stateful session, or an
/// `embedded-hal` bus that has already been acquired.
///
/// Every call blocks until the platform call returns. Implementations do no buffering.
pub trait BusTransport {
    type Error: core::fmt::Debug;

    /// Acquire the bus handle for `path`.
    fn open(&mut self, path: &str) -> Result<(), Self::Error>;

    /// Reset the bus session. Only session based buses do anything here.
    fn reset_session(&mut self, _address: BusAddress) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Direct all following writes at `address`.
    fn configure_address(&mut self, address: BusAddress) -> Result<(), Self::Error>;

    /// Write both bytes in one bus transaction, returning how many bytes were transferred.
    fn write(&mut self, bytes: &[u8; 2]) -> Result<usize, Self::Error>;

    /// End the bus session. Only session based buses do anything here.
    fn stop_session(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Release the bus handle.
    fn close(&mut self);
}

impl<T> BusTransport for &mut T
where
    T: BusTransport + ?Sized,
{
    type Error = T::Error;

    fn open(&mut self, path: &str) -> Result<(), Self::Error> {
        (**self).open(path)
    }

    fn reset_session(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        (**self).reset_session(address)
    }

    fn configure_address(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        (**self).configure_address(address)
    }

    fn write(&mut self, bytes: &[u8; 2]) -> Result<usize, Self::Error> {
        (**self).write(bytes)
    }

    fn stop_session(&mut self) -> Result<(), Self::Error> {
        (**self).stop_session()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
/// How a device file exposes the bus.
pub enum TransportKind {
    /// Linux `i2c-dev`: target address set once with an ioctl, then plain writes.
    #[default]
    I2cDev,
    /// BSD `iicbus`: explicit reset, start, write and stop commands.
    IicSession,
}

/// A device file transport whose flavour is chosen at run time.
#[cfg(all(feature = "std", unix))]
#[derive(Debug)]
pub enum DeviceTransport {
    I2cDev(I2cDevBus),
    IicSession(IicSessionBus),
}

#[cfg(all(feature = "std", unix))]
impl DeviceTransport {
    pub fn new(kind: TransportKind) -> Self {
        match kind {
            TransportKind::I2cDev => DeviceTransport::I2cDev(I2cDevBus::new()),
            TransportKind::IicSession => DeviceTransport::IicSession(IicSessionBus::new()),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            DeviceTransport::I2cDev(_) => TransportKind::I2cDev,
            DeviceTransport::IicSession(_) => TransportKind::IicSession,
        }
    }
}

#[cfg(all(feature = "std", unix))]
impl BusTransport for DeviceTransport {
    type Error = std::io::Error;

    fn open(&mut self, path: &str) -> Result<(), Self::Error> {
        match self {
            DeviceTransport::I2cDev(bus) => bus.open(path),
            DeviceTransport::IicSession(bus) => bus.open(path),
        }
    }

    fn reset_session(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        match self {
            DeviceTransport::I2cDev(bus) => bus.reset_session(address),
            DeviceTransport::IicSession(bus) => bus.reset_session(address),
        }
    }

    fn configure_address(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        match self {
            DeviceTransport::I2cDev(bus) => bus.configure_address(address),
            DeviceTransport::IicSession(bus) => bus.configure_address(address),
        }
    }

    fn write(&mut self, bytes: &[u8; 2]) -> Result<usize, Self::Error> {
        match self {
            DeviceTransport::I2cDev(bus) => bus.write(bytes),
            DeviceTransport::IicSession(bus) => bus.write(bytes),
        }
    }

    fn stop_session(&mut self) -> Result<(), Self::Error> {
        match self {
            DeviceTransport::I2cDev(bus) => bus.stop_session(),
            DeviceTransport::IicSession(bus) => bus.stop_session(),
        }
    }

    fn close(&mut self) {
        match self {
            DeviceTransport::I2cDev(bus) => bus.close(),
            DeviceTransport::IicSession(bus) => bus.close(),
        }
    }
}
