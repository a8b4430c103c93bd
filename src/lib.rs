//! This Rust `embedded-hal`-based library is the bus transport layer for an HD44780-family
//! character display controller running in its extended OLED command mode (US2066 / SSD1311 style
//! modules), reached through an 8 bit GPIO expander on an I2C bus.
//!
//! It does three things and nothing else:
//! - encodes the three logical operations a display layer needs (send an instruction byte, send a
//!   data byte, set the backlight) into control byte / payload pairs and writes each pair as one
//!   atomic bus transaction,
//! - brings the controller from power-on into a display-on state by replaying a fixed
//!   initialization transcript,
//! - owns the bus handle for the lifetime of the driver and releases it exactly once.
//!
//! What to draw, cursor handling and keypad input belong to the layer above.
//!
//! Supported bus transports:
//! - **Any `embedded-hal` 1.0 I2C bus** via [`EmbeddedHalBus`]. Works in `no_std` environments.
//! - **Linux `i2c-dev`** via [`I2cDevBus`] (feature `std`). The target address is set once with
//!   the `I2C_SLAVE` ioctl and every transaction is a plain two byte `write`.
//! - **BSD `iicbus`** via [`IicSessionBus`] (feature `std`). The bus is a session that is reset,
//!   started, written and finally stopped.
//!
//! [`DeviceTransport`] picks one of the two device file flavours at run time.
//!
//! ## Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! i2c-oled-transport = { version = "0.1", features = ["std"] }
//! ```
//! Optional features are `defmt`, which adds `defmt::Format` implementations and a
//! [`report::DefmtReporter`], and `ufmt`, which adds `ufmt::uDisplay` implementations.
//!
//! Bring the display up:
//! ```rust
//! use i2c_oled_transport::{DriverConfig, LogReporter, OledDisplay, TransportKind, DeviceTransport};
//!
//! let config = DriverConfig::default().with_device("/dev/i2c-1").with_port(0x3c);
//! let transport = DeviceTransport::new(TransportKind::I2cDev);
//! let mut display = OledDisplay::initialize(&config, transport, LogReporter)?;
//! ```
//! Then drive it through the three primitives. Each returns a `Result` that wraps the display
//! in `Ok()`, allowing for easy chaining:
//! ```rust
//! display.send_instruction(0x01)?.send_data(b'H')?.send_data(b'i')?;
//! display.set_backlight(true)?;
//! display.shutdown();
//! ```
//!
//! ### Failure handling
//! Failing to open the device or to address the controller aborts [`OledDisplay::initialize`].
//! Once the bus is addressed, a write that fails is reported through the [`ReportSink`] and
//! returned to the caller, but the driver stays usable. The first failure on an instance is
//! reported at [`Severity::Error`], every later one at [`Severity::Debug`]. Nothing is retried.
#![no_std]

#[cfg(feature = "std")]
extern crate std;

use core::fmt::Display;

mod bit_configurations;
mod bus_address;
mod driver;
pub mod report;
pub mod transport;

pub use bit_configurations::{ControlByte, RegisterSelect, BACKLIGHT_BIT, EN, RS, RW};
pub use bus_address::{
    BusAddress, ExpanderKind, DEFAULT_I2C_ADDRESS, I2C_ADDR_MASK, I2C_PCAX_MASK,
};
pub use driver::{
    encoder::BusEncoder,
    sequencer::{
        backlight_program, contrast_program, DriverState, CONTRAST_OFF, CONTRAST_ON,
        INIT_PROGRAM, INIT_PROGRAM_LEN,
    },
    Operation, Transaction,
};
pub use report::{LogReporter, NullReporter, ReportSink, Severity};
#[cfg(all(feature = "std", unix))]
pub use transport::{DeviceTransport, I2cDevBus, IicSessionBus};
pub use transport::{BusTransport, EmbeddedHalBus, TransportKind};

/// Device file used when the configuration does not name one.
pub const DEFAULT_DEVICE: &str = "/dev/i2c-0";

#[derive(Debug, PartialEq, Copy, Clone)]
/// Failure of a single bus transaction.
pub enum TransportError<E> {
    /// Error returned from the underlying bus
    Bus(E),
    /// The bus accepted fewer than the two bytes of the transaction
    ShortWrite(usize),
    /// The driver no longer holds the bus handle
    NotOpen,
}

impl<E> From<&TransportError<E>> for &'static str {
    fn from(err: &TransportError<E>) -> Self {
        match err {
            TransportError::Bus(_) => "Bus write failed",
            TransportError::ShortWrite(_) => "Short write",
            TransportError::NotOpen => "Bus not open",
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for TransportError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for TransportError<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<E> Display for TransportError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        match self {
            TransportError::Bus(err) => write!(f, "{}: {:?}", msg, err),
            TransportError::ShortWrite(written) => write!(f, "{}: {} of 2 bytes", msg, written),
            TransportError::NotOpen => write!(f, "{}", msg),
        }
    }
}

#[derive(Debug, PartialEq, Copy, Clone)]
/// Hard failures of [`OledDisplay::initialize`]. No display control is possible after either.
pub enum InitError<E> {
    /// The bus device could not be opened
    DeviceOpenFailed(E),
    /// The bus could not be reset or pointed at the target address
    AddressingFailed(E),
}

impl<E> From<&InitError<E>> for &'static str {
    fn from(err: &InitError<E>) -> Self {
        match err {
            InitError::DeviceOpenFailed(_) => "Device open failed",
            InitError::AddressingFailed(_) => "Addressing failed",
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for InitError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for InitError<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        let msg: &'static str = From::from(self);
        ufmt::uwrite!(w, "{}", msg)
    }
}

impl<E> Display for InitError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        match self {
            InitError::DeviceOpenFailed(err) | InitError::AddressingFailed(err) => {
                write!(f, "{}: {:?}", msg, err)
            }
        }
    }
}

#[derive(Debug, PartialEq, Copy, Clone)]
/// One or more steps of a multi-transaction program failed. Every step was still issued.
pub struct ProgramError<E> {
    /// How many steps failed
    pub failed_steps: usize,
    /// The last failure seen
    pub last: TransportError<E>,
}

/// Failure of a backlight change.
pub type BacklightError<E> = ProgramError<E>;

impl<E> From<TransportError<E>> for ProgramError<E> {
    fn from(last: TransportError<E>) -> Self {
        ProgramError {
            failed_steps: 1,
            last,
        }
    }
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for ProgramError<E> {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{} step(s) failed: {}", self.failed_steps, self.last);
    }
}

#[cfg(feature = "ufmt")]
impl<E> ufmt::uDisplay for ProgramError<E> {
    fn fmt<W>(&self, w: &mut ufmt::Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: ufmt::uWrite + ?Sized,
    {
        ufmt::uwrite!(w, "{} step(s) failed: ", self.failed_steps)?;
        ufmt::uDisplay::fmt(&self.last, w)
    }
}

impl<E> Display for ProgramError<E>
where
    E: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} step(s) failed, last: {}", self.failed_steps, self.last)
    }
}

/// Where the display is attached. Normally filled in from the host application's configuration.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct DriverConfig<'a> {
    /// Bus device file, e.g. `/dev/i2c-0`. Ignored by [`EmbeddedHalBus`].
    pub device: &'a str,
    pub address: BusAddress,
}

impl Default for DriverConfig<'static> {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE,
            address: BusAddress::default(),
        }
    }
}

impl<'a> DriverConfig<'a> {
    pub fn new(device: &'a str, address: BusAddress) -> Self {
        Self { device, address }
    }

    pub fn with_device<'b>(self, device: &'b str) -> DriverConfig<'b> {
        DriverConfig {
            device,
            address: self.address,
        }
    }

    pub fn with_address(mut self, address: BusAddress) -> Self {
        self.address = address;
        self
    }

    /// Set address and expander kind from a packed port byte, see [`BusAddress::from_port`].
    pub fn with_port(self, port: u8) -> Self {
        self.with_address(BusAddress::from_port(port))
    }
}

/// An initialized display controller, ready for instruction and data traffic.
///
/// Holds the bus exclusively. Every method takes `&mut self`, so at most one writer touches the
/// bus at a time; wrap the display in a mutex to share it between threads.
///
/// Dropping the display does not end the bus session. Call [`OledDisplay::shutdown`] first;
/// otherwise a session based transport such as [`IicSessionBus`] never sends its stop command.
pub struct OledDisplay<T, R>
where
    T: BusTransport,
    R: ReportSink,
{
    encoder: BusEncoder<T, R>,
    state: DriverState,
    init_failures: usize,
}

impl<T, R> OledDisplay<T, R>
where
    T: BusTransport,
    R: ReportSink,
{
    /// Open the bus, address the controller and run the initialization program.
    pub fn initialize(
        config: &DriverConfig<'_>,
        transport: T,
        sink: R,
    ) -> Result<Self, InitError<T::Error>> {
        driver::sequencer::initialize(config, transport, sink)
    }

    pub(crate) fn from_parts(
        encoder: BusEncoder<T, R>,
        state: DriverState,
        init_failures: usize,
    ) -> Self {
        Self {
            encoder,
            state,
            init_failures,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// How many initialization writes failed.
    pub fn init_failures(&self) -> usize {
        self.init_failures
    }

    pub fn bus_address(&self) -> BusAddress {
        self.encoder.address()
    }

    /// returns a reference to the transport. mostly needed for testing
    pub fn transport(&self) -> &T {
        self.encoder.transport()
    }

    /// returns a mutable reference to the transport. mostly needed for testing
    pub fn transport_mut(&mut self) -> &mut T {
        self.encoder.transport_mut()
    }

    /// The encoder, for callers that want to issue raw control byte / payload pairs.
    pub fn encoder(&mut self) -> &mut BusEncoder<T, R> {
        &mut self.encoder
    }

    /// Send an instruction byte to the controller.
    pub fn send_instruction(&mut self, value: u8) -> Result<&mut Self, TransportError<T::Error>> {
        self.encoder.send_instruction(value)?;
        Ok(self)
    }

    /// Send a display data byte to the controller.
    pub fn send_data(&mut self, value: u8) -> Result<&mut Self, TransportError<T::Error>> {
        self.encoder.send_data(value)?;
        Ok(self)
    }

    /// Turn the backlight on or off. On this hardware that is a contrast change, issued as a
    /// six step program; a failed step does not stop the rest.
    pub fn set_backlight(&mut self, on: bool) -> Result<&mut Self, BacklightError<T::Error>> {
        self.encoder.set_backlight(on)?;
        Ok(self)
    }

    /// Set the contrast register to `level`.
    pub fn set_contrast(&mut self, level: u8) -> Result<&mut Self, ProgramError<T::Error>> {
        self.encoder.set_contrast(level)?;
        Ok(self)
    }

    pub fn apply(&mut self, operation: Operation) -> Result<&mut Self, ProgramError<T::Error>> {
        self.encoder.apply(operation)?;
        Ok(self)
    }

    /// Stop the bus session where the platform has one, then release the bus handle.
    /// Calling it again is a no-op. Must be called before the display is dropped.
    pub fn shutdown(&mut self) {
        if self.state == DriverState::Closed {
            return;
        }
        self.encoder.close();
        self.state = DriverState::Closed;
    }
}

#[cfg(test)]
mod lib_tests {
    extern crate std;
    use super::*;
    use crate::report::recording::RecordingSink;
    use crate::transport::scripted::{Call, ScriptedBus};
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn test_oled_display_init_over_embedded_hal() {
        let i2c_address = 0x3c_u8;
        let mut expected_i2c_transactions: std::vec::Vec<I2cTransaction> = INIT_PROGRAM
            .iter()
            .map(|t| I2cTransaction::write(i2c_address, t.bytes().to_vec()))
            .collect();
        // then some regular traffic
        expected_i2c_transactions.push(I2cTransaction::write(i2c_address, std::vec![0x80, 0x01]));
        expected_i2c_transactions.push(I2cTransaction::write(i2c_address, std::vec![0x40, b'O']));
        expected_i2c_transactions.push(I2cTransaction::write(i2c_address, std::vec![0x40, b'K']));

        let i2c = I2cMock::new(&expected_i2c_transactions);
        let config = DriverConfig::default();
        let mut display =
            OledDisplay::initialize(&config, EmbeddedHalBus::new(i2c), NullReporter).unwrap();
        assert_eq!(display.state(), DriverState::Ready);

        let result = display
            .send_instruction(0x01)
            .and_then(|d| d.send_data(b'O'))
            .and_then(|d| d.send_data(b'K'));
        assert!(result.is_ok());

        display.shutdown();
        assert_eq!(display.state(), DriverState::Closed);
        assert!(!display.transport().is_open());

        // finish the i2c mock
        display.transport_mut().i2c_mut().done();
    }

    #[test]
    fn test_golden_init_sequence_literal() {
        let i2c_address = 0x27_u8;
        let expected_i2c_transactions = std::vec![
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x00]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x2a]), // "RE"=1
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x71]), // function selection A
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x5c]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x28]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x08]), // sleep mode on
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x2a]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x79]), // "SD"=1
            I2cTransaction::write(i2c_address, std::vec![0x80, 0xd5]), // clock divide ratio
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x70]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x78]), // "SD"=0
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x08]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x06]), // COM/SEG direction
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x2a]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x79]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x72]), // function selection B
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x00]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0xda]), // SEG pins hw config
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x10]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0xdb]), // VCOMH deselect level
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x30]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0xdc]), // GPIO, 15V generator
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x03]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x78]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x28]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x2a]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x06]), // entry mode
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x08]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x28]),
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x28]), // repeated on purpose
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x01]), // clear
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x80]), // DDRAM address 0
            I2cTransaction::write(i2c_address, std::vec![0x80, 0x0c]), // display on
        ];

        let i2c = I2cMock::new(&expected_i2c_transactions);
        let config = DriverConfig::default().with_port(0xa7);
        let mut display =
            OledDisplay::initialize(&config, EmbeddedHalBus::new(i2c), NullReporter).unwrap();
        assert_eq!(display.bus_address().address(), 0x27);
        assert_eq!(display.init_failures(), 0);

        display.transport_mut().i2c_mut().done();
    }

    #[test]
    fn test_init_tolerates_lost_write() {
        let i2c_address = 0x3c_u8;
        let expected_i2c_transactions: std::vec::Vec<I2cTransaction> = INIT_PROGRAM
            .iter()
            .enumerate()
            .map(|(index, t)| {
                let transaction = I2cTransaction::write(i2c_address, t.bytes().to_vec());
                if index == 19 {
                    transaction.with_error(ErrorKind::NoAcknowledge(
                        embedded_hal::i2c::NoAcknowledgeSource::Data,
                    ))
                } else {
                    transaction
                }
            })
            .collect();

        let mut sink = RecordingSink::default();
        let i2c = I2cMock::new(&expected_i2c_transactions);
        let mut display =
            OledDisplay::initialize(&DriverConfig::default(), EmbeddedHalBus::new(i2c), &mut sink)
                .unwrap();
        assert_eq!(display.state(), DriverState::Ready);
        assert_eq!(display.init_failures(), 1);
        assert!(display.encoder().is_suppressing());
        display.transport_mut().i2c_mut().done();
        drop(display);

        assert_eq!(sink.count(Severity::Error), 1);
        assert!(sink.reports[1]
            .1
            .starts_with("HD44780: I2C: i2c write data 0xDB to address 0x3C failed"));
    }

    #[test]
    fn test_shutdown_twice_closes_once() {
        let mut bus = ScriptedBus::default();
        let mut display =
            OledDisplay::initialize(&DriverConfig::default(), &mut bus, NullReporter).unwrap();
        display.shutdown();
        display.shutdown();
        assert_eq!(display.state(), DriverState::Closed);
        assert!(matches!(
            display.send_data(b'x'),
            Err(TransportError::NotOpen)
        ));
        drop(display);

        assert_eq!(bus.count(Call::StopSession), 1);
        assert_eq!(bus.count(Call::Close), 1);
        assert_eq!(bus.calls.last(), Some(&Call::Close));
    }

    #[test]
    fn test_drop_without_shutdown_leaves_session_open() {
        let mut bus = ScriptedBus::default();
        let display =
            OledDisplay::initialize(&DriverConfig::default(), &mut bus, NullReporter).unwrap();
        drop(display);

        assert_eq!(bus.count(Call::StopSession), 0);
        assert_eq!(bus.count(Call::Close), 0);
    }

    #[test]
    fn test_chained_backlight_and_contrast() {
        let mut bus = ScriptedBus::default();
        let mut display =
            OledDisplay::initialize(&DriverConfig::default(), &mut bus, NullReporter).unwrap();
        let result = display
            .set_backlight(true)
            .and_then(|d| d.set_contrast(0x20))
            .and_then(|d| d.apply(Operation::SetBacklight(false)));
        assert!(result.is_ok());
        drop(display);

        let writes = bus.writes();
        let tail = &writes[INIT_PROGRAM_LEN..];
        assert_eq!(tail.len(), 18);
        assert_eq!(tail[3], [0x80, CONTRAST_ON]);
        assert_eq!(tail[9], [0x80, 0x20]);
        assert_eq!(tail[15], [0x80, CONTRAST_OFF]);
    }

    #[test]
    fn test_config_builders() {
        let config = DriverConfig::default();
        assert_eq!(config.device, DEFAULT_DEVICE);
        assert_eq!(config.address.address(), DEFAULT_I2C_ADDRESS);

        let config = config.with_device("/dev/iic0").with_port(0x80 | 0x3d);
        assert_eq!(config.device, "/dev/iic0");
        assert_eq!(config.address.address(), 0x3d);
        assert_eq!(config.address.kind(), ExpanderKind::Pca9554);

        let config = DriverConfig::new("/dev/i2c-2", BusAddress::new(0x3c, ExpanderKind::Pcf8574));
        assert_eq!(config.with_address(BusAddress::from_port(0x27)).address.address(), 0x27);
    }

    #[test]
    fn test_error_messages() {
        let err: TransportError<ErrorKind> = TransportError::ShortWrite(1);
        assert_eq!(std::format!("{}", err), "Short write: 1 of 2 bytes");
        let err: InitError<ErrorKind> = InitError::DeviceOpenFailed(ErrorKind::Other);
        assert_eq!(std::format!("{}", err), "Device open failed: Other");
        let err: ProgramError<ErrorKind> = TransportError::NotOpen.into();
        assert_eq!(err.failed_steps, 1);
        assert_eq!(std::format!("{}", err), "1 step(s) failed, last: Bus not open");
    }
}
