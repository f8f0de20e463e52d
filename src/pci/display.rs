//! Finding the linear framebuffer of the display controller.

use x86_64::PhysAddr;

use crate::error::{Error, Result};
use crate::io::PortIo;
use crate::log::LogSink;
use crate::{error, info, warn};

use super::bar::{BarFlags, MEM_ADDRESS_MASK, decode_bar_flags};
use super::config::{ConfigSpace, offset};
use super::header::{CLASS_DISPLAY, HeaderKind, RawHeader, u32_at};
use super::mechanism::AccessMechanism;

const NORMAL_BAR_COUNT: usize = 6;
const BRIDGE_FRAMEBUFFER_BAR: usize = 0x14;

/// Picks the framebuffer address out of one raw header, if the device is a
/// display controller that exposes one.
///
/// Normal headers need a prefetchable memory BAR; a bridge's second BAR is
/// taken as is.
pub fn locate_in_header<L: LogSink>(raw: &RawHeader, log: &mut L) -> Option<PhysAddr> {
    if raw[offset::CLASS_BASE as usize] != CLASS_DISPLAY {
        return None;
    }

    let header_type = raw[offset::HEADER_TYPE as usize];
    match HeaderKind::from_header_type(header_type) {
        Ok(HeaderKind::Normal) => locate_in_bars(raw, log),
        Ok(HeaderKind::Bridge) => {
            let bar = u32_at(raw, BRIDGE_FRAMEBUFFER_BAR);
            let address = bar & !BarFlags::IO_SPACE.bits() & MEM_ADDRESS_MASK;
            Some(PhysAddr::new(u64::from(address)))
        }
        Ok(HeaderKind::CardBus) => {
            warn!(log, "CardBus display controller not supported");
            None
        }
        Err(e) => {
            warn!(log, "Unexpected PCI header: {}", e);
            None
        }
    }
}

fn locate_in_bars<L: LogSink>(raw: &RawHeader, log: &mut L) -> Option<PhysAddr> {
    let mut index = 0;
    while index < NORMAL_BAR_COUNT {
        let at = offset::BAR0 as usize + 4 * index;
        let value = u32_at(raw, at);
        let flags = BarFlags::from_bits_truncate(decode_bar_flags(value));
        index += 1;

        if value == 0 && flags.is_empty() {
            continue;
        }
        if flags.contains(BarFlags::IO_SPACE) || !flags.contains(BarFlags::PREFETCHABLE) {
            continue;
        }

        // the next register holds the upper half of a 64-bit BAR
        let upper = if flags.contains(BarFlags::MEM_64) && index < NORMAL_BAR_COUNT {
            index += 1;
            u32_at(raw, at + 4)
        } else {
            0
        };

        let address = u64::from(upper) << 32 | u64::from(value & MEM_ADDRESS_MASK);
        match PhysAddr::try_new(address) {
            Ok(address) => {
                info!(log, "Prefetchable PCI memory at {:#x}", address.as_u64());
                return Some(address);
            }
            Err(_) => {
                warn!(log, "BAR at {:#x} points outside physical memory: {:#x}", at, address);
            }
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Detecting,
    Scanning,
    Found(PhysAddr),
    Exhausted,
}

/// One pass of detection plus bus walk. Nothing is kept between passes.
pub struct DisplayScan<P, L> {
    ports: P,
    log: L,
    state: ScanState,
}

impl<P: PortIo, L: LogSink> DisplayScan<P, L> {
    pub fn new(ports: P, log: L) -> Self {
        DisplayScan { ports, log, state: ScanState::Idle }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn run(&mut self) -> Result<PhysAddr> {
        self.state = ScanState::Detecting;
        let mut config = ConfigSpace::detect(&mut self.ports);

        if config.mechanism() == AccessMechanism::None {
            error!(self.log, "No PCI configuration mechanism");
        }

        info!(self.log, "Starting PCI scan");
        self.state = ScanState::Scanning;

        for device in config.devices() {
            info!(
                self.log,
                "Found device! Vendor: {:04x} device: {:04x} header: {:02x}",
                device.vendor_id,
                device.device_id,
                device.header_type()
            );

            if let Some(address) = locate_in_header(&device.header, &mut self.log) {
                info!(self.log, "Display at {} framebuffer {:#x}", device.address, address.as_u64());
                self.state = ScanState::Found(address);
                return Ok(address);
            }
        }

        error!(self.log, "PCI scan: failed");
        self.state = ScanState::Exhausted;
        Err(Error::NotFound)
    }

    pub fn into_parts(self) -> (P, L) {
        (self.ports, self.log)
    }
}

/// Detects the mechanism and walks the bus until a display framebuffer shows up.
///
/// The caller must keep every other user off the configuration ports until
/// this returns.
pub fn find_display_framebuffer_with<P: PortIo, L: LogSink>(ports: P, log: L) -> Result<PhysAddr> {
    DisplayScan::new(ports, log).run()
}

/// [`find_display_framebuffer_with`] on the real ports, logging to COM1.
///
/// # Safety
///
/// Needs I/O privilege, and no other CPU or thread may touch the PCI
/// configuration ports or COM1 while the scan runs.
#[cfg(target_arch = "x86_64")]
pub unsafe fn find_display_framebuffer() -> Result<PhysAddr> {
    let ports = unsafe { crate::io::IoPorts::new() };
    let mut log = crate::log::SERIAL_LOGGER.lock();
    find_display_framebuffer_with(ports, &mut *log)
}
