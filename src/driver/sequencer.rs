// Controller bring-up for the OLED variant of the HD44780 instruction set.
//
// The controller powers up in its fundamental instruction set. Most of its configuration
// registers (clock, segment wiring, VCOM, the internal VSL/GPIO regulator enable and contrast)
// are only reachable after enabling the extended set with "RE"=1 (0x2A) and the OLED
// characterization set with "SD"=1 (0x79). The table below walks those modes in the order the
// module vendor documents. Entries repeat on purpose: the controller needs the duplicated mode
// writes to latch, so the table must never be deduplicated or reordered.

use crate::{
    driver::{encoder::BusEncoder, Transaction},
    report::{ReportSink, Severity},
    transport::BusTransport,
    BusAddress, DriverConfig, InitError, OledDisplay,
};

/// Contrast level written when the backlight is switched on.
pub const CONTRAST_ON: u8 = 240;
/// Contrast level written when the backlight is switched off.
pub const CONTRAST_OFF: u8 = 50;

const fn i(payload: u8) -> Transaction {
    Transaction::instruction(payload)
}

/// Number of transactions in [`INIT_PROGRAM`].
pub const INIT_PROGRAM_LEN: usize = 33;

/// Bring-up transcript, issued once after the bus is addressed.
pub const INIT_PROGRAM: [Transaction; INIT_PROGRAM_LEN] = [
    i(0x00), // leading instruction-mode write, wakes the serial interface
    i(0x2a), // function set: "RE"=1, extended instruction set
    i(0x71), // function selection A
    i(0x5c), //   enable internal Vdd regulator (5V I/O)
    i(0x28), // function set: "RE"=0
    i(0x08), // display off, sleep mode on
    i(0x2a), // "RE"=1
    i(0x79), // "SD"=1, OLED characterization
    i(0xd5), // set display clock divide ratio / oscillator frequency
    i(0x70), //   divide ratio 1, oscillator frequency 0x7
    i(0x78), // "SD"=0
    i(0x08), // extended function set: 5-dot font, 1 or 2 line
    i(0x06), // COM31 -> COM0, SEG0 -> SEG99
    i(0x2a), // "RE"=1
    i(0x79), // "SD"=1
    i(0x72), // function selection B
    i(0x00), //   ROM A, 8 CGRAM characters
    i(0xda), // set SEG pins hardware configuration
    i(0x10), //   alternative SEG pin configuration
    i(0xdb), // set VCOMH deselect level
    i(0x30), //   0.83 x Vcc
    i(0xdc), // function selection C, GPIO
    i(0x03), //   GPIO output high, enables the 15V generator
    i(0x78), // "SD"=0, leave OLED characterization
    i(0x28), // "RE"=0
    i(0x2a), // "RE"=1
    i(0x06), // entry mode: increment, no shift
    i(0x08), // display off
    i(0x28), // "IS"=0, "RE"=0
    i(0x28), // repeated: "IS"=0, "RE"=0
    i(0x01), // clear display
    i(0x80), // DDRAM address 0x00, start of line 1
    i(0x0c), // display on, cursor off, blink off
];

/// Program that rewrites the contrast register. This hardware has no backlight line, so
/// brightness is the OLED contrast reached through the extended command set.
pub const fn contrast_program(level: u8) -> [Transaction; 6] {
    [
        i(0x2a),  // "RE"=1
        i(0x79),  // "SD"=1
        i(0x81),  // set contrast control
        i(level), //   contrast level
        i(0x78),  // "SD"=0
        i(0x28),  // "RE"=0
    ]
}

/// Contrast program used for a backlight on/off request.
pub const fn backlight_program(on: bool) -> [Transaction; 6] {
    contrast_program(if on { CONTRAST_ON } else { CONTRAST_OFF })
}

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
/// Lifecycle of a driver instance. States are only ever entered in declaration order, except
/// that a failure while opening or addressing goes straight to `Closed`.
pub enum DriverState {
    Unopened,
    Opening,
    Addressed,
    Initializing,
    Ready,
    Closed,
}

impl DriverState {
    /// The state that follows this one on the success path.
    pub const fn next(&self) -> Option<DriverState> {
        match self {
            DriverState::Unopened => Some(DriverState::Opening),
            DriverState::Opening => Some(DriverState::Addressed),
            DriverState::Addressed => Some(DriverState::Initializing),
            DriverState::Initializing => Some(DriverState::Ready),
            DriverState::Ready => Some(DriverState::Closed),
            DriverState::Closed => None,
        }
    }

    /// Whether moving from this state to `to` is allowed.
    pub fn can_enter(&self, to: DriverState) -> bool {
        match (self, to) {
            (DriverState::Opening | DriverState::Addressed, DriverState::Closed) => true,
            _ => self.next() == Some(to),
        }
    }
}

fn advance(state: &mut DriverState, to: DriverState) {
    debug_assert!(state.can_enter(to), "invalid transition {:?} -> {:?}", state, to);
    *state = to;
}

/// Open and address the bus, then run [`INIT_PROGRAM`].
///
/// Only the open and addressing steps can fail. A write lost while the program runs is reported
/// through the sink and counted, but the driver still comes up: the controller usually reaches a
/// usable state anyway and the remaining writes must still be issued in order.
pub fn initialize<T, R>(
    config: &DriverConfig<'_>,
    mut transport: T,
    mut sink: R,
) -> Result<OledDisplay<T, R>, InitError<T::Error>>
where
    T: BusTransport,
    R: ReportSink,
{
    let address: BusAddress = config.address;
    let mut state = DriverState::Unopened;

    sink.report(
        Severity::Info,
        format_args!(
            "HD44780: I2C: Using device '{}' and address 0x{:02X} for a {}",
            config.device,
            address.address(),
            address.kind()
        ),
    );

    advance(&mut state, DriverState::Opening);
    if let Err(err) = transport.open(config.device) {
        sink.report(
            Severity::Error,
            format_args!(
                "HD44780: I2C: open i2c device '{}' failed: {:?}",
                config.device, err
            ),
        );
        advance(&mut state, DriverState::Closed);
        return Err(InitError::DeviceOpenFailed(err));
    }

    if let Err(err) = transport.reset_session(address) {
        sink.report(
            Severity::Error,
            format_args!("HD44780: I2C: reset bus failed: {:?}", err),
        );
        transport.close();
        advance(&mut state, DriverState::Closed);
        return Err(InitError::AddressingFailed(err));
    }
    if let Err(err) = transport.configure_address(address) {
        sink.report(
            Severity::Error,
            format_args!(
                "HD44780: I2C: set address to 0x{:02X}: {:?}",
                address.address(),
                err
            ),
        );
        transport.close();
        advance(&mut state, DriverState::Closed);
        return Err(InitError::AddressingFailed(err));
    }
    advance(&mut state, DriverState::Addressed);

    advance(&mut state, DriverState::Initializing);
    let mut encoder = BusEncoder::new_open(transport, address, sink);
    let init_failures = match encoder.run(&INIT_PROGRAM) {
        Ok(()) => 0,
        Err(err) => err.failed_steps,
    };
    if init_failures > 0 {
        encoder.report(
            Severity::Info,
            format_args!(
                "HD44780: I2C: {} of {} initialization writes failed",
                init_failures, INIT_PROGRAM_LEN
            ),
        );
    }

    advance(&mut state, DriverState::Ready);
    Ok(OledDisplay::from_parts(encoder, state, init_failures))
}
