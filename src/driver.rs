pub mod encoder;
pub mod sequencer;

use crate::bit_configurations::{ControlByte, RegisterSelect};

/// One atomic bus write: a control byte followed by its payload byte.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Transaction {
    pub control: ControlByte,
    pub payload: u8,
}

impl Transaction {
    pub const fn new(register: RegisterSelect, payload: u8) -> Self {
        Self {
            control: register.control_byte(),
            payload,
        }
    }

    pub const fn instruction(payload: u8) -> Self {
        Self::new(RegisterSelect::Instruction, payload)
    }

    pub const fn data(payload: u8) -> Self {
        Self::new(RegisterSelect::Data, payload)
    }

    /// The two bytes as they appear on the bus.
    pub const fn bytes(&self) -> [u8; 2] {
        [self.control.bits(), self.payload]
    }
}

/// The logical operations a higher display layer may request.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Operation {
    SendInstruction(u8),
    SendData(u8),
    SetBacklight(bool),
}
