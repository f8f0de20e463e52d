use core::fmt::Write;

use super::PortIo;

pub const COM1: u16 = 0x3F8;

const LINE_STATUS: u16 = 5;
const TRANSMIT_EMPTY: u8 = 0x20;

/// Polled 16550 transmitter. Used as the default text output for log lines.
pub struct SerialPortWriter<P> {
    ports: P,
    base: u16,
}

impl<P: PortIo> SerialPortWriter<P> {
    pub const fn new(ports: P, base: u16) -> Self {
        Self { ports, base }
    }

    pub const fn com1(ports: P) -> Self {
        Self::new(ports, COM1)
    }

    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    pub fn write_byte(&mut self, byte: u8) {
        while !self.is_transmit_empty() {}
        self.ports.write_u8(self.base, byte);
    }

    fn is_transmit_empty(&mut self) -> bool {
        self.ports.read_u8(self.base + LINE_STATUS) & TRANSMIT_EMPTY != 0
    }
}

impl<P: PortIo> Write for SerialPortWriter<P> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_string(s);
        Ok(())
    }
}
