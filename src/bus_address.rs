use core::fmt::Display;

/// Mask applied to every configured address before it reaches the bus.
pub const I2C_ADDR_MASK: u8 = 0x7f;
/// Bit of the packed port byte that selects a PCA9554 style expander.
pub const I2C_PCAX_MASK: u8 = 0x80;

/// Default 7-bit address of the controller with SA0 tied low.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3c;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
/// The GPIO expander family sitting between the bus and the display controller.
pub enum ExpanderKind {
    /// Simple output latch, such as the PCF8574 or PCF8574A.
    #[default]
    Pcf8574,
    /// Register addressed expander, such as the PCA9554 or PCA9554A.
    Pca9554,
}

impl ExpanderKind {
    /// Name used in diagnostics.
    pub const fn name(&self) -> &'static str {
        match self {
            ExpanderKind::Pcf8574 => "PCF8574(A)",
            ExpanderKind::Pca9554 => "PCA9554(A)",
        }
    }
}

impl From<&ExpanderKind> for &'static str {
    fn from(kind: &ExpanderKind) -> Self {
        kind.name()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ExpanderKind {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl ufmt::uDisplay for ExpanderKind {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl Display for ExpanderKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// Target of every bus transaction: a 7-bit address plus the expander family.
///
/// The expander family is only used to describe the hardware in diagnostics. It never changes
/// the address placed on the bus, nor the shape of the bytes written to it.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct BusAddress {
    address: u8,
    kind: ExpanderKind,
}

impl BusAddress {
    /// Create an address, discarding anything above the low 7 bits.
    pub const fn new(address: u8, kind: ExpanderKind) -> Self {
        Self {
            address: address & I2C_ADDR_MASK,
            kind,
        }
    }

    /// Decode a packed port byte: bits 0-6 hold the address and bit 7 selects a PCA9554.
    pub const fn from_port(port: u8) -> Self {
        let kind = if port & I2C_PCAX_MASK != 0 {
            ExpanderKind::Pca9554
        } else {
            ExpanderKind::Pcf8574
        };
        Self::new(port, kind)
    }

    /// The 7-bit address written on the bus.
    pub const fn address(&self) -> u8 {
        self.address
    }

    pub const fn kind(&self) -> ExpanderKind {
        self.kind
    }

    /// Address in the left-aligned form session based buses expect (R/W bit clear).
    pub const fn session_slave(&self) -> u8 {
        self.address << 1
    }
}

impl Default for BusAddress {
    fn default() -> Self {
        Self::new(DEFAULT_I2C_ADDRESS, ExpanderKind::Pcf8574)
    }
}
