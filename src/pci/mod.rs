//! Legacy PCI configuration access (mechanisms 1 and 2) and the display scan.
//!
//! None of this locks. Callers on a multi-core host serialize entry
//! themselves for the whole detect-and-scan sequence.

pub mod bar;
pub mod config;
pub mod display;
pub mod header;
pub mod mechanism;
pub mod scan;

pub use bar::{Bar, BarFlags, decode_bar_flags};
pub use config::{ConfigSpace, DeviceAddress, Width, read_config};
#[cfg(target_arch = "x86_64")]
pub use display::find_display_framebuffer;
pub use display::{DisplayScan, ScanState, find_display_framebuffer_with, locate_in_header};
pub use header::{BridgeHeader, CommonHeader, ConfigHeader, HeaderVariant, NormalHeader};
pub use mechanism::{AccessMechanism, detect_mechanism};
pub use scan::{Devices, PresentDevice, list_devices};
