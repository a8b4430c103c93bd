use core::fmt::Arguments;

use crate::{
    bit_configurations::{ControlByte, RegisterSelect},
    driver::{
        sequencer::{backlight_program, contrast_program},
        Operation, Transaction,
    },
    report::{ReportSink, Severity},
    transport::BusTransport,
    BusAddress, ProgramError, TransportError,
};

/// Turns logical operations into atomic two byte bus writes.
///
/// The encoder owns the bus handle exclusively, so `&mut self` on every method is what keeps a
/// control byte and its payload from being interleaved with another writer.
pub struct BusEncoder<T, R>
where
    T: BusTransport,
    R: ReportSink,
{
    transport: T,
    address: BusAddress,
    sink: R,
    /// Set by the first failed write. Later failures are reported at debug severity.
    suppress_errors: bool,
    open: bool,
}

impl<T, R> BusEncoder<T, R>
where
    T: BusTransport,
    R: ReportSink,
{
    /// Create an encoder over a transport that is already open and addressed.
    pub(crate) fn new_open(transport: T, address: BusAddress, sink: R) -> Self {
        Self {
            transport,
            address,
            sink,
            suppress_errors: false,
            open: true,
        }
    }

    pub fn address(&self) -> BusAddress {
        self.address
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Whether a write has failed on this instance yet.
    pub fn is_suppressing(&self) -> bool {
        self.suppress_errors
    }

    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn report(&mut self, severity: Severity, args: Arguments<'_>) {
        self.sink.report(severity, args);
    }

    /// Write `control` and `payload` to the bus as a single transaction.
    ///
    /// Anything other than both bytes being transferred is a failure. Failures are reported to
    /// the sink before being returned.
    pub fn transmit(
        &mut self,
        control: ControlByte,
        payload: u8,
    ) -> Result<(), TransportError<T::Error>> {
        if !self.open {
            // nothing reached the bus, so the latch stays as it is
            self.sink.report(
                Severity::Debug,
                format_args!(
                    "HD44780: I2C: write data 0x{:02X} dropped: {}",
                    payload,
                    TransportError::<T::Error>::NotOpen
                ),
            );
            return Err(TransportError::NotOpen);
        }
        let bytes = [control.bits(), payload];
        let result = match self.transport.write(&bytes) {
            Ok(written) if written == bytes.len() => Ok(()),
            Ok(written) => Err(TransportError::ShortWrite(written)),
            Err(err) => Err(TransportError::Bus(err)),
        };
        result.map_err(|err| self.failed(payload, err))
    }

    fn failed(
        &mut self,
        payload: u8,
        err: TransportError<T::Error>,
    ) -> TransportError<T::Error> {
        let severity = if self.suppress_errors {
            Severity::Debug
        } else {
            Severity::Error
        };
        self.sink.report(
            severity,
            format_args!(
                "HD44780: I2C: i2c write data 0x{:02X} to address 0x{:02X} failed: {}",
                payload,
                self.address.address(),
                err
            ),
        );
        self.suppress_errors = true;
        err
    }

    pub fn send(
        &mut self,
        register: RegisterSelect,
        value: u8,
    ) -> Result<(), TransportError<T::Error>> {
        self.transmit(register.control_byte(), value)
    }

    pub fn send_instruction(&mut self, value: u8) -> Result<(), TransportError<T::Error>> {
        self.send(RegisterSelect::Instruction, value)
    }

    pub fn send_data(&mut self, value: u8) -> Result<(), TransportError<T::Error>> {
        self.send(RegisterSelect::Data, value)
    }

    /// Issue every transaction of `program` in order. A failed step does not stop the steps
    /// after it; the returned error counts the failures and keeps the last one.
    pub fn run(&mut self, program: &[Transaction]) -> Result<(), ProgramError<T::Error>> {
        let mut failed_steps = 0;
        let mut last = None;
        for step in program {
            if let Err(err) = self.transmit(step.control, step.payload) {
                failed_steps += 1;
                last = Some(err);
            }
        }
        match last {
            None => Ok(()),
            Some(last) => Err(ProgramError { failed_steps, last }),
        }
    }

    /// Rewrite the contrast register, passing through the extended command set and back.
    pub fn set_contrast(&mut self, level: u8) -> Result<(), ProgramError<T::Error>> {
        self.run(&contrast_program(level))
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<(), ProgramError<T::Error>> {
        self.run(&backlight_program(on))
    }

    pub fn apply(&mut self, operation: Operation) -> Result<(), ProgramError<T::Error>> {
        let single = |result: Result<(), TransportError<T::Error>>| {
            result.map_err(|last| ProgramError {
                failed_steps: 1,
                last,
            })
        };
        match operation {
            Operation::SendInstruction(value) => single(self.send_instruction(value)),
            Operation::SendData(value) => single(self.send_data(value)),
            Operation::SetBacklight(on) => self.set_backlight(on),
        }
    }

    /// End the bus session and release the handle. Does nothing once closed.
    pub(crate) fn close(&mut self) {
        if !self.open {
            return;
        }
        if let Err(err) = self.transport.stop_session() {
            self.sink.report(
                Severity::Debug,
                format_args!("HD44780: I2C: stop session failed: {:?}", err),
            );
        }
        self.transport.close();
        self.open = false;
    }
}
