//! Bare-metal discovery of the display controller's framebuffer through
//! legacy PCI configuration space, for code that runs beneath the OS.

#![cfg_attr(not(test), no_std)]

pub mod error;
pub mod io;
pub mod log;
pub mod pci;
pub mod video;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use io::PortIo;
pub use log::{LogLevel, LogSink, Logger};
#[cfg(target_arch = "x86_64")]
pub use pci::find_display_framebuffer;
pub use pci::{
    AccessMechanism, ConfigSpace, DeviceAddress, detect_mechanism, find_display_framebuffer_with,
    read_config,
};
pub use video::{VideoConfig, VideoRegion, video_init};
