use crate::error::{Error, Result};
use crate::io::PortIo;
use crate::log::LogSink;
use crate::info;

use super::config::{ConfigSpace, DeviceAddress, offset};
use super::header::{CommonHeader, ConfigHeader, HEADER_SIZE, HEADER_TYPE_MASK, RawHeader};
use super::mechanism::AccessMechanism;

const SLOT_COUNT: u32 = 256 * 32 * 8;

/// A function that answered the vendor/device probe, with its raw header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentDevice {
    pub address: DeviceAddress,
    pub vendor_id: u16,
    pub device_id: u16,
    pub header: RawHeader,
}

impl PresentDevice {
    pub fn header_type(&self) -> u8 {
        self.header[offset::HEADER_TYPE as usize] & HEADER_TYPE_MASK
    }

    pub fn common(&self) -> CommonHeader {
        CommonHeader::parse(&self.header)
    }

    pub fn parse(&self) -> ConfigHeader {
        ConfigHeader::parse(&self.header)
    }
}

/// Reads vendor and device id, then the header one byte at a time.
pub fn probe<P: PortIo>(config: &mut ConfigSpace<P>, address: DeviceAddress) -> Result<PresentDevice> {
    let vendor_id = config.read_u16(address, offset::VENDOR_ID)?;
    let device_id = config.read_u16(address, offset::DEVICE_ID)?;

    if vendor_id == 0xFFFF || device_id == 0xFFFF || (vendor_id == 0 && device_id == 0) {
        return Err(Error::DeviceAbsent);
    }

    let mut header = [0u8; HEADER_SIZE];
    for (register, byte) in header.iter_mut().enumerate() {
        *byte = config.read_u8(address, register as u8)?;
    }

    Ok(PresentDevice { address, vendor_id, device_id, header })
}

/// Walks bus 0..=255, device 0..=31, function 0..=7 and yields every
/// present function. Each call to [`ConfigSpace::devices`] starts over.
pub struct Devices<'a, P> {
    config: &'a mut ConfigSpace<P>,
    next_slot: u32,
}

impl<'a, P: PortIo> Devices<'a, P> {
    pub(crate) fn new(config: &'a mut ConfigSpace<P>) -> Self {
        let next_slot = match config.mechanism() {
            AccessMechanism::None => SLOT_COUNT,
            _ => 0,
        };
        Devices { config, next_slot }
    }
}

fn slot_address(slot: u32) -> DeviceAddress {
    DeviceAddress::new((slot >> 8) as u8, ((slot >> 3) & 0x1F) as u8, (slot & 0x07) as u8)
}

impl<P: PortIo> Iterator for Devices<'_, P> {
    type Item = PresentDevice;

    fn next(&mut self) -> Option<PresentDevice> {
        while self.next_slot < SLOT_COUNT {
            let address = slot_address(self.next_slot);
            self.next_slot += 1;

            match probe(self.config, address) {
                Ok(device) => return Some(device),
                Err(_) => continue,
            }
        }
        None
    }
}

/// Logs every present function and returns how many there were.
pub fn list_devices<P: PortIo, L: LogSink>(config: &mut ConfigSpace<P>, log: &mut L) -> usize {
    let mut count = 0;
    for device in config.devices() {
        let common = device.common();
        info!(
            log,
            "{} vendor: {:04x} device: {:04x} class: {:02x}.{:02x} header: {:02x} command: {:?}",
            device.address,
            device.vendor_id,
            device.device_id,
            common.class_base,
            common.class_sub,
            device.header_type(),
            common.command_flags()
        );
        count += 1;
    }
    count
}
