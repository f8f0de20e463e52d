use crate::io::PortIo;

pub const CONFIG_ADDRESS: u16 = 0xCF8;
pub const CONFIG_DATA: u16 = 0xCFC;

pub const CONF2_ENABLE: u16 = 0xCF8;
pub const CONF2_FORWARD: u16 = 0xCFA;
pub const CONF2_WINDOW: u16 = 0xC000;

pub const CONF1_ENABLE: u32 = 0x8000_0000;

/// Which legacy configuration protocol the chipset decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMechanism {
    #[default]
    None,
    Mechanism1,
    Mechanism2,
}

/// Probes the chipset for a configuration mechanism.
///
/// Mechanism 2 is tried first: both of its control bytes read back as zero
/// after being cleared. Otherwise the mechanism 1 address register must latch
/// the enable bit. The address register is restored before returning.
pub fn detect_mechanism<P: PortIo>(ports: &mut P) -> AccessMechanism {
    ports.write_u8(CONF2_ENABLE, 0);
    ports.write_u8(CONF2_FORWARD, 0);

    if ports.read_u8(CONF2_ENABLE) == 0 && ports.read_u8(CONF2_FORWARD) == 0 {
        return AccessMechanism::Mechanism2;
    }

    let saved = ports.read_u32(CONFIG_ADDRESS);
    ports.write_u32(CONFIG_ADDRESS, CONF1_ENABLE);
    let latched = ports.read_u32(CONFIG_ADDRESS);
    ports.write_u32(CONFIG_ADDRESS, saved);

    if latched == CONF1_ENABLE {
        AccessMechanism::Mechanism1
    } else {
        AccessMechanism::None
    }
}
