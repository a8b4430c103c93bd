//! Report sink used for diagnostics. The driver never prints on its own; every message is
//! handed to a [`ReportSink`] together with its severity.

use core::fmt::{Arguments, Display};

/// `log` target used by [`LogReporter`].
pub const LOG_TARGET: &str = "hd44780::i2c";

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone)]
/// Severity of a report, ordered from least to most severe.
pub enum Severity {
    Debug,
    Info,
    Error,
}

impl From<&Severity> for &'static str {
    fn from(severity: &Severity) -> Self {
        match severity {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Error => "error",
        }
    }
}

impl From<Severity> for log::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Error => log::Level::Error,
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Severity {
    fn format(&self, fmt: defmt::Formatter) {
        let msg: &'static str = From::from(self);
        defmt::write!(fmt, "{}", msg);
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg: &'static str = From::from(self);
        write!(f, "{}", msg)
    }
}

/// Accepts formatted diagnostic messages from the driver.
pub trait ReportSink {
    fn report(&mut self, severity: Severity, args: Arguments<'_>);
}

impl<R> ReportSink for &mut R
where
    R: ReportSink + ?Sized,
{
    fn report(&mut self, severity: Severity, args: Arguments<'_>) {
        (**self).report(severity, args)
    }
}

/// Forwards reports to the `log` facade.
#[derive(Debug, Default, Copy, Clone)]
pub struct LogReporter;

impl ReportSink for LogReporter {
    fn report(&mut self, severity: Severity, args: Arguments<'_>) {
        log::log!(target: LOG_TARGET, log::Level::from(severity), "{}", args);
    }
}

/// Forwards reports to `defmt`.
#[cfg(feature = "defmt")]
#[derive(Debug, Default, Copy, Clone)]
pub struct DefmtReporter;

#[cfg(feature = "defmt")]
impl ReportSink for DefmtReporter {
    fn report(&mut self, severity: Severity, args: Arguments<'_>) {
        let msg = defmt::Display2Format(&args);
        match severity {
            Severity::Debug => defmt::debug!("{}", msg),
            Severity::Info => defmt::info!("{}", msg),
            Severity::Error => defmt::error!("{}", msg),
        }
    }
}

/// Discards every report.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullReporter;

impl ReportSink for NullReporter {
    fn report(&mut self, _severity: Severity, _args: Arguments<'_>) {}
}


#[cfg(test)]
mod tests {
    use super::recording::RecordingSink;
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Error);
        assert_eq!(log::Level::from(Severity::Error), log::Level::Error);
        assert_eq!(log::Level::from(Severity::Debug), log::Level::Debug);
    }

    #[test]
    fn test_sink_by_mutable_reference() {
        fn emit<R: ReportSink>(mut sink: R) {
            sink.report(Severity::Info, format_args!("address 0x{:02X}", 0x3c));
        }

        let mut sink = RecordingSink::default();
        emit(&mut sink);
        assert_eq!(sink.reports.len(), 1);
        assert_eq!(sink.reports[0].0, Severity::Info);
        assert_eq!(sink.reports[0].1, "address 0x3C");
    }

    #[test]
    fn test_null_and_log_reporters_accept_reports() {
        NullReporter.report(Severity::Error, format_args!("dropped"));
        LogReporter.report(Severity::Debug, format_args!("no logger installed"));
    }
}
