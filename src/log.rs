use core::fmt::{self, Display, Write};

#[cfg(target_arch = "x86_64")]
use crate::io::{IoPorts, serial::SerialPortWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Receives one formatted log line at a time. Provided by whoever hosts the scan.
pub trait LogSink {
    fn write_line(&mut self, level: LogLevel, args: fmt::Arguments<'_>);
}

impl<L: LogSink + ?Sized> LogSink for &mut L {
    fn write_line(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        (**self).write_line(level, args)
    }
}

pub struct NullSink;

impl LogSink for NullSink {
    fn write_line(&mut self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

/// Renders `[LEVEL]: message` lines onto any text output.
pub struct Logger<W> {
    level: LogLevel,
    output: W,
}

impl<W: Write> Logger<W> {
    pub const fn new(level: LogLevel, output: W) -> Self {
        Logger { level, output }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}

impl<W: Write> LogSink for Logger<W> {
    fn write_line(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        if level < self.level {
            return;
        }
        let _ = write!(self.output, "[{}]: ", level);
        let _ = self.output.write_fmt(args);
        let _ = writeln!(self.output);
    }
}

#[cfg(target_arch = "x86_64")]
pub static SERIAL_LOGGER: spin::Mutex<Logger<SerialPortWriter<IoPorts>>> = spin::Mutex::new(
    Logger::new(LogLevel::Info, SerialPortWriter::com1(unsafe { IoPorts::new() })),
);

#[macro_export]
macro_rules! log {
    ($sink:expr, $level:expr, $($arg:tt)*) => {
        {
            use $crate::log::LogSink as _;
            $sink.write_line($level, format_args!($($arg)*))
        }
    };
}

#[macro_export]
macro_rules! info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::log!($sink, $crate::log::LogLevel::Info, $($arg)*)
    };
}

#[macro_export]
macro_rules! warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::log!($sink, $crate::log::LogLevel::Warning, $($arg)*)
    };
}

#[macro_export]
macro_rules! error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::log!($sink, $crate::log::LogLevel::Error, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_the_level_tag() {
        let mut logger = Logger::new(LogLevel::Info, String::new());
        crate::info!(logger, "found {:04x}", 0x1234);
        crate::warn!(logger, "odd header");

        assert_eq!(logger.output(), "[INFO]: found 1234\n[WARNING]: odd header\n");
    }

    #[test]
    fn lines_below_the_threshold_are_dropped() {
        let mut logger = Logger::new(LogLevel::Warning, String::new());
        crate::info!(logger, "quiet");
        crate::error!(logger, "loud");

        assert_eq!(logger.output(), "[ERROR]: loud\n");
    }
}
