use bitflags::bitflags;

bitflags! {
    /// Low flag bits of a base address register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BarFlags: u32 {
        const IO_SPACE = 0x1;
        const MEM_BELOW_1M = 0x2;
        const MEM_64 = 0x4;
        const PREFETCHABLE = 0x8;
    }
}

pub const MEM_ADDRESS_MASK: u32 = !0xF;
pub const IO_ADDRESS_MASK: u32 = !0x3;
pub const MEM_TYPE_MASK: u32 = 0x6;

/// Flag word of a BAR as read from the wire; all-ones means unimplemented.
pub const fn decode_bar_flags(raw: u32) -> u32 {
    if raw == u32::MAX { 0 } else { raw }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryType {
    Bits32,
    Below1M,
    Bits64,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bar {
    Unimplemented,
    Memory {
        address: u32,
        kind: MemoryType,
        prefetchable: bool,
    },
    Io {
        address: u32,
    },
}

impl Bar {
    pub fn decode(raw: u32) -> Bar {
        let flags = decode_bar_flags(raw);
        if flags == 0 {
            return Bar::Unimplemented;
        }

        let bits = BarFlags::from_bits_truncate(flags);
        if bits.contains(BarFlags::IO_SPACE) {
            return Bar::Io { address: raw & IO_ADDRESS_MASK };
        }

        let kind = match flags & MEM_TYPE_MASK {
            0x0 => MemoryType::Bits32,
            0x2 => MemoryType::Below1M,
            0x4 => MemoryType::Bits64,
            _ => MemoryType::Reserved,
        };
        Bar::Memory {
            address: raw & MEM_ADDRESS_MASK,
            kind,
            prefetchable: bits.contains(BarFlags::PREFETCHABLE),
        }
    }

    pub fn is_prefetchable_memory(&self) -> bool {
        matches!(self, Bar::Memory { prefetchable: true, .. })
    }
}
