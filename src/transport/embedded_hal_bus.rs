use embedded_hal::i2c;

use crate::{transport::BusTransport, BusAddress};

/// Transport over an `embedded-hal` I2C bus that the caller has already acquired.
///
/// There is no device file to open, so `open` and `close` only track whether the driver holds
/// the bus. The target address is remembered by `configure_address` and passed with every write.
pub struct EmbeddedHalBus<I2C>
where
    I2C: i2c::I2c,
{
    i2c: I2C,
    address: u8,
    open: bool,
}

impl<I2C> EmbeddedHalBus<I2C>
where
    I2C: i2c::I2c,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: BusAddress::default().address(),
            open: false,
        }
    }

    /// returns a reference to the I2C peripheral. mostly needed for testing
    pub fn i2c_mut(&mut self) -> &mut I2C {
        &mut self.i2c
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Give the wrapped bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> BusTransport for EmbeddedHalBus<I2C>
where
    I2C: i2c::I2c,
{
    type Error = I2C::Error;

    fn open(&mut self, _path: &str) -> Result<(), Self::Error> {
        self.open = true;
        Ok(())
    }

    fn configure_address(&mut self, address: BusAddress) -> Result<(), Self::Error> {
        self.address = address.address();
        Ok(())
    }

    fn write(&mut self, bytes: &[u8; 2]) -> Result<usize, Self::Error> {
        self.i2c.write(self.address, bytes)?;
        Ok(bytes.len())
    }

    fn close(&mut self) {
        self.open = false;
    }
}
