//! Bit layout of the expander data port and the control bytes built from it.
//!
//! The encoder only needs [`ControlByte::instruction`] and [`ControlByte::data`]. The per-line
//! accessors and the `RS`/`RW`/`EN`/`BACKLIGHT_BIT` masks are there for layers that drive the
//! expander lines directly, such as a 4-bit nibble clocking layer on a plain HD44780.

use bitfield::bitfield;

/// Expander data port bit driving the register select line.
pub const RS: u8 = 0x10;
/// Expander data port bit driving the read/write line.
pub const RW: u8 = 0x20;
/// Expander data port bit driving the enable strobe.
pub const EN: u8 = 0x40;
/// Expander data port bit driving the backlight.
pub const BACKLIGHT_BIT: u8 = 0x80;

// Layout of the expander data port. The controller's serial interface reads the same byte as
// its control byte, where bit 7 marks an instruction and bit 6 marks display data.
bitfield! {
    pub struct ControlByte(u8);
    impl Debug;
    impl BitAnd;
    pub nibble, set_nibble: 3, 0;
    pub rs, set_rs: 4, 4;
    pub rw, set_rw: 5, 5;
    pub enable, set_enable: 6, 6;
    pub backlight, set_backlight: 7, 7;
}

impl Clone for ControlByte {
    fn clone(&self) -> Self {
        Self(self.0)
    }
}

impl Copy for ControlByte {}

impl PartialEq for ControlByte {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for ControlByte {}

impl ControlByte {
    /// Control byte preceding every instruction byte (`0x80`).
    pub const fn instruction() -> Self {
        Self(BACKLIGHT_BIT)
    }

    /// Control byte preceding every display data byte (`0x40`).
    pub const fn data() -> Self {
        Self(EN)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Which controller register a payload byte is destined for.
pub enum RegisterSelect {
    Instruction,
    Data,
}

impl RegisterSelect {
    pub const fn control_byte(&self) -> ControlByte {
        match self {
            RegisterSelect::Instruction => ControlByte::instruction(),
            RegisterSelect::Data => ControlByte::data(),
        }
    }
}
