use x86_64::PhysAddr;

use crate::error::Result;
use crate::io::PortIo;
use crate::log::LogSink;
use crate::pci::find_display_framebuffer_with;
use crate::{error, info};

/// Framebuffer address used by Bochs and QEMU's standard VGA.
pub const BOCHS_VIDEO_ADDRESS: u64 = 0xE000_0000;

pub const DEFAULT_WIDTH: u32 = 1024;
pub const DEFAULT_HEIGHT: u32 = 768;

pub const BYTES_PER_PIXEL: u64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoAddress {
    Autodetect,
    Manual(PhysAddr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConfig {
    pub address: VideoAddress,
    pub width: u32,
    pub height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        VideoConfig {
            address: VideoAddress::Autodetect,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl VideoConfig {
    /// Skips the bus scan and assumes the emulator's fixed framebuffer.
    pub fn bochs() -> Self {
        VideoConfig {
            address: VideoAddress::Manual(PhysAddr::new(BOCHS_VIDEO_ADDRESS)),
            ..Self::default()
        }
    }
}

/// Physical extent of the framebuffer, 32 bits per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoRegion {
    pub base: PhysAddr,
    pub width: u32,
    pub height: u32,
}

impl VideoRegion {
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn size_bytes(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * BYTES_PER_PIXEL
    }

    pub fn contains(&self, address: PhysAddr) -> bool {
        address >= self.base && address.as_u64() - self.base.as_u64() < self.size_bytes()
    }
}

pub fn video_init<P: PortIo, L: LogSink>(
    ports: P,
    mut log: L,
    config: &VideoConfig,
) -> Result<VideoRegion> {
    let base = match config.address {
        VideoAddress::Manual(base) => base,
        VideoAddress::Autodetect => match find_display_framebuffer_with(ports, &mut log) {
            Ok(base) => base,
            Err(e) => {
                error!(log, "PCI display detection failed: {}", e);
                return Err(e);
            }
        },
    };

    info!(log, "Found PCI display region at physical address {:#010x}", base.as_u64());

    Ok(VideoRegion { base, width: config.width, height: config.height })
}
