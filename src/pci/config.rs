use core::fmt;

use crate::error::{Error, Result};
use crate::io::PortIo;

use super::mechanism::{
    AccessMechanism, CONF1_ENABLE, CONF2_ENABLE, CONF2_FORWARD, CONF2_WINDOW, CONFIG_ADDRESS,
    CONFIG_DATA, detect_mechanism,
};
use super::scan::Devices;

pub const MAX_BUS: u8 = 255;
pub const MAX_DEVICE: u8 = 31;
pub const MAX_FUNCTION: u8 = 7;

/// Standard offsets shared by every header type.
pub mod offset {
    pub const VENDOR_ID: u8 = 0x00;
    pub const DEVICE_ID: u8 = 0x02;
    pub const COMMAND: u8 = 0x04;
    pub const STATUS: u8 = 0x06;
    pub const REVISION: u8 = 0x08;
    pub const CLASS_API: u8 = 0x09;
    pub const CLASS_SUB: u8 = 0x0A;
    pub const CLASS_BASE: u8 = 0x0B;
    pub const LINE_SIZE: u8 = 0x0C;
    pub const LATENCY: u8 = 0x0D;
    pub const HEADER_TYPE: u8 = 0x0E;
    pub const BIST: u8 = 0x0F;
    pub const BAR0: u8 = 0x10;
}

/// Bus/device/function of one configuration-space slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl DeviceAddress {
    pub const fn new(bus: u8, device: u8, function: u8) -> Self {
        Self { bus, device, function }
    }

    pub const fn is_valid(&self) -> bool {
        self.device <= MAX_DEVICE && self.function <= MAX_FUNCTION
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte = 1,
    Word = 2,
    Dword = 4,
}

impl Width {
    pub const fn bytes(self) -> u8 {
        self as u8
    }

    /// What an empty slot reads as.
    pub const fn all_ones(self) -> u32 {
        match self {
            Width::Byte => 0xFF,
            Width::Word => 0xFFFF,
            Width::Dword => 0xFFFF_FFFF,
        }
    }
}

impl TryFrom<u8> for Width {
    type Error = Error;

    fn try_from(bytes: u8) -> Result<Self> {
        match bytes {
            1 => Ok(Width::Byte),
            2 => Ok(Width::Word),
            4 => Ok(Width::Dword),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Mechanism 1 CONFIG_ADDRESS value. The low two register bits are dropped;
/// the data port offset selects the byte lane instead.
pub const fn conf1_address(address: DeviceAddress, register: u8) -> u32 {
    CONF1_ENABLE
        | (address.bus as u32) << 16
        | (address.device as u32) << 11
        | (address.function as u32) << 8
        | (register as u32 & !3)
}

/// Splits a mechanism 1 CONFIG_ADDRESS value back into slot and dword-aligned register.
pub const fn decode_conf1_address(value: u32) -> (DeviceAddress, u8) {
    let address = DeviceAddress {
        bus: (value >> 16) as u8,
        device: ((value >> 11) & 0x1F) as u8,
        function: ((value >> 8) & 0x07) as u8,
    };
    (address, (value & 0xFC) as u8)
}

/// Highest device number the mechanism 2 window can reach.
pub const CONF2_MAX_DEVICE: u8 = 0x0F;

/// Mechanism 2 port inside the 0xC000 window.
pub const fn conf2_port(device: u8, register: u8) -> u16 {
    CONF2_WINDOW | (device as u16) << 8 | register as u16
}

/// Reads `width` bytes (1, 2 or 4) at `register` of the given slot.
///
/// Arguments are checked before any port is touched.
pub fn read_config<P: PortIo>(
    ports: &mut P,
    mechanism: AccessMechanism,
    address: DeviceAddress,
    register: u8,
    width: u8,
) -> Result<u32> {
    let width = Width::try_from(width)?;
    if !address.is_valid() {
        return Err(Error::InvalidArgument);
    }

    match mechanism {
        AccessMechanism::None => Err(Error::UnsupportedMechanism),
        AccessMechanism::Mechanism1 => {
            ports.write_u32(CONFIG_ADDRESS, conf1_address(address, register));
            let port = CONFIG_DATA + u16::from(register & (4 - width.bytes()));
            Ok(read_width(ports, port, width))
        }
        AccessMechanism::Mechanism2 if address.device > CONF2_MAX_DEVICE => {
            // 0xD000 and up belong to other devices' I/O BARs
            Ok(width.all_ones())
        }
        AccessMechanism::Mechanism2 => {
            ports.write_u8(CONF2_ENABLE, 0xF0 | address.function << 1);
            ports.write_u8(CONF2_FORWARD, address.bus);
            let value = read_width(ports, conf2_port(address.device, register), width);
            ports.write_u8(CONF2_ENABLE, 0);
            Ok(value)
        }
    }
}

fn read_width<P: PortIo>(ports: &mut P, port: u16, width: Width) -> u32 {
    match width {
        Width::Byte => u32::from(ports.read_u8(port)),
        Width::Word => u32::from(ports.read_u16(port)),
        Width::Dword => ports.read_u32(port),
    }
}

/// Port access plus the mechanism detected on it.
///
/// There is no locking here: nothing else may drive the configuration ports
/// while a `ConfigSpace` is in use.
pub struct ConfigSpace<P> {
    ports: P,
    mechanism: AccessMechanism,
}

impl<P: PortIo> ConfigSpace<P> {
    pub fn detect(mut ports: P) -> Self {
        let mechanism = detect_mechanism(&mut ports);
        Self { ports, mechanism }
    }

    pub const fn with_mechanism(ports: P, mechanism: AccessMechanism) -> Self {
        Self { ports, mechanism }
    }

    pub fn mechanism(&self) -> AccessMechanism {
        self.mechanism
    }

    pub fn read(&mut self, address: DeviceAddress, register: u8, width: u8) -> Result<u32> {
        read_config(&mut self.ports, self.mechanism, address, register, width)
    }

    pub fn read_u8(&mut self, address: DeviceAddress, register: u8) -> Result<u8> {
        self.read(address, register, 1).map(|v| v as u8)
    }

    pub fn read_u16(&mut self, address: DeviceAddress, register: u8) -> Result<u16> {
        self.read(address, register, 2).map(|v| v as u16)
    }

    pub fn read_u32(&mut self, address: DeviceAddress, register: u8) -> Result<u32> {
        self.read(address, register, 4)
    }

    /// Fresh walk over every present function.
    pub fn devices(&mut self) -> Devices<'_, P> {
        Devices::new(self)
    }

    pub fn into_ports(self) -> P {
        self.ports
    }
}
