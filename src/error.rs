use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Address field, register offset or access width out of range. No port was touched.
    InvalidArgument,
    /// No configuration mechanism was detected on this platform.
    UnsupportedMechanism,
    /// Nothing answers at the probed slot.
    DeviceAbsent,
    /// Header type other than normal, bridge or cardbus.
    UnrecognizedHeaderType(u8),
    /// The whole bus was scanned without finding a display framebuffer.
    NotFound,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument => write!(f, "invalid configuration space argument"),
            Error::UnsupportedMechanism => write!(f, "no PCI configuration mechanism available"),
            Error::DeviceAbsent => write!(f, "no device present"),
            Error::UnrecognizedHeaderType(kind) => {
                write!(f, "unrecognized PCI header type {:#04x}", kind)
            }
            Error::NotFound => write!(f, "no PCI display framebuffer found"),
        }
    }
}
