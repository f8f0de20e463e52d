//! Decoding of the first 64 bytes of configuration space.
//!
//! Fields are pulled out of the little-endian wire bytes one by one; nothing
//! here depends on host layout or alignment.

use bitflags::bitflags;

use crate::error::{Error, Result};

use super::bar::Bar;
use super::config::offset;

pub const HEADER_SIZE: usize = 0x40;
pub const HEADER_TYPE_MASK: u8 = 0x7F;
pub const MULTI_FUNCTION: u8 = 0x80;

pub const CLASS_DISPLAY: u8 = 0x03;

pub type RawHeader = [u8; HEADER_SIZE];

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Command: u16 {
        const IO_SPACE = 1 << 0;
        const MEMORY_SPACE = 1 << 1;
        const BUS_MASTER = 1 << 2;
        const SPECIAL_CYCLES = 1 << 3;
        const MEMORY_WRITE_INVALIDATE = 1 << 4;
        const VGA_PALETTE_SNOOP = 1 << 5;
        const PARITY_ERROR_RESPONSE = 1 << 6;
        const SERR = 1 << 8;
        const FAST_BACK_TO_BACK = 1 << 9;
        const INTERRUPT_DISABLE = 1 << 10;
    }
}

fn u16_at(raw: &RawHeader, at: usize) -> u16 {
    u16::from_le_bytes([raw[at], raw[at + 1]])
}

pub(crate) fn u32_at(raw: &RawHeader, at: usize) -> u32 {
    u32::from_le_bytes([raw[at], raw[at + 1], raw[at + 2], raw[at + 3]])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Normal = 0,
    Bridge = 1,
    CardBus = 2,
}

impl HeaderKind {
    /// Multi-function bit is ignored.
    pub fn from_header_type(header_type: u8) -> Result<Self> {
        match header_type & HEADER_TYPE_MASK {
            0 => Ok(HeaderKind::Normal),
            1 => Ok(HeaderKind::Bridge),
            2 => Ok(HeaderKind::CardBus),
            other => Err(Error::UnrecognizedHeaderType(other)),
        }
    }
}

/// Layout-independent part at 0x00..0x10.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub vendor_id: u16,
    pub device_id: u16,
    pub command: u16,
    pub status: u16,
    pub revision: u8,
    pub class_api: u8,
    pub class_sub: u8,
    pub class_base: u8,
    pub line_size: u8,
    pub latency: u8,
    pub header_type: u8,
    pub bist: u8,
}

impl CommonHeader {
    pub fn parse(raw: &RawHeader) -> Self {
        CommonHeader {
            vendor_id: u16_at(raw, offset::VENDOR_ID as usize),
            device_id: u16_at(raw, offset::DEVICE_ID as usize),
            command: u16_at(raw, offset::COMMAND as usize),
            status: u16_at(raw, offset::STATUS as usize),
            revision: raw[offset::REVISION as usize],
            class_api: raw[offset::CLASS_API as usize],
            class_sub: raw[offset::CLASS_SUB as usize],
            class_base: raw[offset::CLASS_BASE as usize],
            line_size: raw[offset::LINE_SIZE as usize],
            latency: raw[offset::LATENCY as usize],
            header_type: raw[offset::HEADER_TYPE as usize],
            bist: raw[offset::BIST as usize],
        }
    }

    pub fn layout(&self) -> u8 {
        self.header_type & HEADER_TYPE_MASK
    }

    pub fn is_multi_function(&self) -> bool {
        self.header_type & MULTI_FUNCTION != 0
    }

    pub fn is_display(&self) -> bool {
        self.class_base == CLASS_DISPLAY
    }

    /// Base class, subclass and programming interface packed as `0xBBSSPP`.
    pub fn class_code(&self) -> u32 {
        u32::from(self.class_base) << 16 | u32::from(self.class_sub) << 8 | u32::from(self.class_api)
    }

    pub fn command_flags(&self) -> Command {
        Command::from_bits_retain(self.command)
    }
}

/// Type 0 layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalHeader {
    pub base_registers: [u32; 6],
    pub cardbus_cis: u32,
    pub subsystem_vendor_id: u16,
    pub subsystem_id: u16,
    pub rom_base: u32,
    pub capabilities_pointer: u8,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub min_grant: u8,
    pub max_latency: u8,
}

impl NormalHeader {
    pub fn parse(raw: &RawHeader) -> Self {
        let mut base_registers = [0; 6];
        for (i, bar) in base_registers.iter_mut().enumerate() {
            *bar = u32_at(raw, offset::BAR0 as usize + 4 * i);
        }
        NormalHeader {
            base_registers,
            cardbus_cis: u32_at(raw, 0x28),
            subsystem_vendor_id: u16_at(raw, 0x2C),
            subsystem_id: u16_at(raw, 0x2E),
            rom_base: u32_at(raw, 0x30),
            capabilities_pointer: raw[0x34],
            interrupt_line: raw[0x3C],
            interrupt_pin: raw[0x3D],
            min_grant: raw[0x3E],
            max_latency: raw[0x3F],
        }
    }

    pub fn bar(&self, index: usize) -> Option<Bar> {
        self.base_registers.get(index).map(|raw| Bar::decode(*raw))
    }
}

/// Address range forwarded by a bridge, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub base: u64,
    pub limit: u64,
}

impl Window {
    fn new(base: u64, limit: u64) -> Option<Self> {
        (base <= limit).then_some(Window { base, limit })
    }
}

/// Type 1 (PCI-to-PCI bridge) layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeHeader {
    pub base_registers: [u32; 2],
    pub primary_bus: u8,
    pub secondary_bus: u8,
    pub subordinate_bus: u8,
    pub secondary_latency: u8,
    pub io_base: u8,
    pub io_limit: u8,
    pub secondary_status: u16,
    pub memory_base: u16,
    pub memory_limit: u16,
    pub prefetchable_memory_base: u16,
    pub prefetchable_memory_limit: u16,
    pub prefetchable_memory_base_upper32: u32,
    pub prefetchable_memory_limit_upper32: u32,
    pub io_base_upper16: u16,
    pub io_limit_upper16: u16,
    pub capabilities_pointer: u8,
    pub rom_base: u32,
    pub interrupt_line: u8,
    pub interrupt_pin: u8,
    pub bridge_control: u16,
}

impl BridgeHeader {
    pub fn parse(raw: &RawHeader) -> Self {
        BridgeHeader {
            base_registers: [u32_at(raw, 0x10), u32_at(raw, 0x14)],
            primary_bus: raw[0x18],
            secondary_bus: raw[0x19],
            subordinate_bus: raw[0x1A],
            secondary_latency: raw[0x1B],
            io_base: raw[0x1C],
            io_limit: raw[0x1D],
            secondary_status: u16_at(raw, 0x1E),
            memory_base: u16_at(raw, 0x20),
            memory_limit: u16_at(raw, 0x22),
            prefetchable_memory_base: u16_at(raw, 0x24),
            prefetchable_memory_limit: u16_at(raw, 0x26),
            prefetchable_memory_base_upper32: u32_at(raw, 0x28),
            prefetchable_memory_limit_upper32: u32_at(raw, 0x2C),
            io_base_upper16: u16_at(raw, 0x30),
            io_limit_upper16: u16_at(raw, 0x32),
            capabilities_pointer: raw[0x34],
            rom_base: u32_at(raw, 0x38),
            interrupt_line: raw[0x3C],
            interrupt_pin: raw[0x3D],
            bridge_control: u16_at(raw, 0x3E),
        }
    }

    pub fn bar(&self, index: usize) -> Option<Bar> {
        self.base_registers.get(index).map(|raw| Bar::decode(*raw))
    }

    pub fn io_window(&self) -> Option<Window> {
        // low nibble 1 means the upper 16 bits are decoded
        let wide = self.io_base & 0x0F == 0x01;
        let (base_hi, limit_hi) = if wide {
            (u64::from(self.io_base_upper16), u64::from(self.io_limit_upper16))
        } else {
            (0, 0)
        };
        let base = base_hi << 16 | u64::from(self.io_base & 0xF0) << 8;
        let limit = limit_hi << 16 | u64::from(self.io_limit & 0xF0) << 8 | 0xFFF;
        Window::new(base, limit)
    }

    pub fn memory_window(&self) -> Option<Window> {
        let base = u64::from(self.memory_base & 0xFFF0) << 16;
        let limit = u64::from(self.memory_limit & 0xFFF0) << 16 | 0xF_FFFF;
        Window::new(base, limit)
    }

    pub fn prefetchable_window(&self) -> Option<Window> {
        let wide = self.prefetchable_memory_base & 0x0F == 0x01;
        let (base_hi, limit_hi) = if wide {
            (
                u64::from(self.prefetchable_memory_base_upper32),
                u64::from(self.prefetchable_memory_limit_upper32),
            )
        } else {
            (0, 0)
        };
        let base = base_hi << 32 | u64::from(self.prefetchable_memory_base & 0xFFF0) << 16;
        let limit =
            limit_hi << 32 | u64::from(self.prefetchable_memory_limit & 0xFFF0) << 16 | 0xF_FFFF;
        Window::new(base, limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVariant {
    Normal(NormalHeader),
    Bridge(BridgeHeader),
    /// Type 2. Only the socket register is kept; nothing else is decoded.
    CardBus { socket_base: u32 },
    Unrecognized(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigHeader {
    pub common: CommonHeader,
    pub variant: HeaderVariant,
}

impl ConfigHeader {
    /// Never fails: an unknown layout becomes [`HeaderVariant::Unrecognized`].
    pub fn parse(raw: &RawHeader) -> Self {
        let common = CommonHeader::parse(raw);
        let variant = match HeaderKind::from_header_type(common.header_type) {
            Ok(HeaderKind::Normal) => HeaderVariant::Normal(NormalHeader::parse(raw)),
            Ok(HeaderKind::Bridge) => HeaderVariant::Bridge(BridgeHeader::parse(raw)),
            Ok(HeaderKind::CardBus) => HeaderVariant::CardBus { socket_base: u32_at(raw, 0x10) },
            Err(_) => HeaderVariant::Unrecognized(common.layout()),
        };
        ConfigHeader { common, variant }
    }
}
