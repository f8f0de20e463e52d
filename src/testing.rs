//! Simulated hardware for host tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::io::PortIo;
use crate::log::{LogLevel, LogSink};
use crate::pci::config::{DeviceAddress, decode_conf1_address};
use crate::pci::header::{HEADER_SIZE, RawHeader};
use crate::pci::mechanism::{
    AccessMechanism, CONF1_ENABLE, CONF2_ENABLE, CONF2_FORWARD, CONFIG_ADDRESS, CONFIG_DATA,
};

/// Chipset model answering either configuration protocol, or neither.
pub struct SimBus {
    mechanism: AccessMechanism,
    devices: BTreeMap<DeviceAddress, [u8; 256]>,
    config_address: u32,
    conf2_enable: u8,
    conf2_forward: u8,
    accesses: usize,
}

impl SimBus {
    pub fn new(mechanism: AccessMechanism) -> Self {
        SimBus {
            mechanism,
            devices: BTreeMap::new(),
            config_address: 0,
            conf2_enable: 0,
            conf2_forward: 0,
            accesses: 0,
        }
    }

    pub fn insert_device(&mut self, address: DeviceAddress, bytes: &[u8]) {
        let mut space = [0u8; 256];
        space[..bytes.len()].copy_from_slice(bytes);
        self.devices.insert(address, space);
    }

    pub fn insert_header(&mut self, address: DeviceAddress, header: RawHeader) {
        self.insert_device(address, &header);
    }

    pub fn set_config_address(&mut self, value: u32) {
        self.config_address = value;
    }

    pub fn config_address(&self) -> u32 {
        self.config_address
    }

    pub fn conf2_enable(&self) -> u8 {
        self.conf2_enable
    }

    pub fn accesses(&self) -> usize {
        self.accesses
    }

    fn config_byte(&self, address: DeviceAddress, register: usize) -> u8 {
        self.devices
            .get(&address)
            .map(|space| space[register & 0xFF])
            .unwrap_or(0xFF)
    }

    fn data_byte(&self, port: u16) -> u8 {
        match self.mechanism {
            AccessMechanism::Mechanism1 if (CONFIG_DATA..CONFIG_DATA + 4).contains(&port) => {
                if self.config_address & CONF1_ENABLE == 0 {
                    return 0xFF;
                }
                let (address, register) = decode_conf1_address(self.config_address);
                self.config_byte(address, register as usize + usize::from(port - CONFIG_DATA))
            }
            AccessMechanism::Mechanism2 if (0xC000..=0xCFFF).contains(&port) => {
                if self.conf2_enable & 0xF0 != 0xF0 {
                    return 0xFF;
                }
                let address = DeviceAddress::new(
                    self.conf2_forward,
                    ((port >> 8) & 0x0F) as u8,
                    (self.conf2_enable >> 1) & 0x07,
                );
                self.config_byte(address, usize::from(port & 0xFF))
            }
            _ => 0xFF,
        }
    }

    fn read_bytes(&mut self, port: u16, width: u16) -> u32 {
        self.accesses += 1;
        (0..width).fold(0, |value, i| {
            value | u32::from(self.data_byte(port.wrapping_add(i))) << (8 * i)
        })
    }
}

impl PortIo for SimBus {
    fn read_u8(&mut self, port: u16) -> u8 {
        if self.mechanism == AccessMechanism::Mechanism2 {
            match port {
                CONF2_ENABLE => return self.conf2_enable,
                CONF2_FORWARD => return self.conf2_forward,
                _ => {}
            }
        }
        self.read_bytes(port, 1) as u8
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        self.read_bytes(port, 2) as u16
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        if port == CONFIG_ADDRESS {
            self.accesses += 1;
            return match self.mechanism {
                AccessMechanism::Mechanism1 => self.config_address,
                _ => 0xFFFF_FFFF,
            };
        }
        self.read_bytes(port, 4)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        self.accesses += 1;
        if self.mechanism == AccessMechanism::Mechanism2 {
            match port {
                CONF2_ENABLE => self.conf2_enable = value,
                CONF2_FORWARD => self.conf2_forward = value,
                _ => {}
            }
        }
    }

    fn write_u16(&mut self, _port: u16, _value: u16) {
        self.accesses += 1;
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        self.accesses += 1;
        if self.mechanism == AccessMechanism::Mechanism1 && port == CONFIG_ADDRESS {
            self.config_address = value;
        }
    }
}

/// Fails the test on any port access.
pub struct PanickingPorts;

impl PortIo for PanickingPorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        panic!("unexpected inb {:#x}", port)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        panic!("unexpected inw {:#x}", port)
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        panic!("unexpected inl {:#x}", port)
    }

    fn write_u8(&mut self, port: u16, _value: u8) {
        panic!("unexpected outb {:#x}", port)
    }

    fn write_u16(&mut self, port: u16, _value: u16) {
        panic!("unexpected outw {:#x}", port)
    }

    fn write_u32(&mut self, port: u16, _value: u32) {
        panic!("unexpected outl {:#x}", port)
    }
}

/// Passes every access through to `inner` and remembers the port.
pub struct PortTrace<P> {
    pub inner: P,
    ports: Vec<u16>,
}

impl<P: PortIo> PortTrace<P> {
    pub fn new(inner: P) -> Self {
        PortTrace { inner, ports: Vec::new() }
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }
}

impl<P: PortIo> PortIo for PortTrace<P> {
    fn read_u8(&mut self, port: u16) -> u8 {
        self.ports.push(port);
        self.inner.read_u8(port)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        self.ports.push(port);
        self.inner.read_u16(port)
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        self.ports.push(port);
        self.inner.read_u32(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        self.ports.push(port);
        self.inner.write_u8(port, value)
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        self.ports.push(port);
        self.inner.write_u16(port, value)
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        self.ports.push(port);
        self.inner.write_u32(port, value)
    }
}

/// Fixed byte reads, every byte write recorded per port.
pub struct RecordingPorts {
    reads: HashMap<u16, u8>,
    writes: HashMap<u16, Vec<u8>>,
}

impl RecordingPorts {
    pub fn new() -> Self {
        RecordingPorts { reads: HashMap::new(), writes: HashMap::new() }
    }

    pub fn set_u8(&mut self, port: u16, value: u8) {
        self.reads.insert(port, value);
    }

    pub fn written_bytes(&self, port: u16) -> Vec<u8> {
        self.writes.get(&port).cloned().unwrap_or_default()
    }
}

impl PortIo for RecordingPorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        self.reads.get(&port).copied().unwrap_or(0)
    }

    fn read_u16(&mut self, _port: u16) -> u16 {
        0
    }

    fn read_u32(&mut self, _port: u16) -> u32 {
        0
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        self.writes.entry(port).or_default().push(value);
    }

    fn write_u16(&mut self, _port: u16, _value: u16) {}

    fn write_u32(&mut self, _port: u16, _value: u32) {}
}

/// Collects log lines for inspection.
#[derive(Default)]
pub struct CaptureLog {
    pub lines: Vec<(LogLevel, String)>,
}

impl CaptureLog {
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.lines.iter().any(|(l, line)| *l == level && line.contains(needle))
    }
}

impl LogSink for CaptureLog {
    fn write_line(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        self.lines.push((level, args.to_string()));
    }
}

pub struct HeaderBuilder {
    raw: RawHeader,
}

impl HeaderBuilder {
    pub fn new(vendor_id: u16, device_id: u16) -> Self {
        let mut builder = HeaderBuilder { raw: [0; HEADER_SIZE] };
        builder.word(0x00, vendor_id).word(0x02, device_id);
        builder
    }

    pub fn byte(&mut self, at: usize, value: u8) -> &mut Self {
        self.raw[at] = value;
        self
    }

    pub fn word(&mut self, at: usize, value: u16) -> &mut Self {
        self.raw[at..at + 2].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn dword(&mut self, at: usize, value: u32) -> &mut Self {
        self.raw[at..at + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    pub fn command(&mut self, value: u16) -> &mut Self {
        self.word(0x04, value)
    }

    pub fn class(&mut self, base: u8, sub: u8, api: u8) -> &mut Self {
        self.byte(0x09, api).byte(0x0A, sub).byte(0x0B, base)
    }

    pub fn header_type(&mut self, value: u8) -> &mut Self {
        self.byte(0x0E, value)
    }

    pub fn bar(&mut self, index: usize, value: u32) -> &mut Self {
        self.dword(0x10 + 4 * index, value)
    }

    pub fn build(&self) -> RawHeader {
        self.raw
    }
}
