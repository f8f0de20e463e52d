pub mod serial;

#[cfg(target_arch = "x86_64")]
use x86_64::instructions::port::Port;

/// Byte, word and dword access to the x86 I/O port space.
///
/// Everything above this trait (mechanism detection, configuration reads, the
/// bus scan) is written against it so it can run on a simulated bus.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn read_u16(&mut self, port: u16) -> u16;
    fn read_u32(&mut self, port: u16) -> u32;
    fn write_u8(&mut self, port: u16, value: u8);
    fn write_u16(&mut self, port: u16, value: u16);
    fn write_u32(&mut self, port: u16, value: u32);
}

impl<P: PortIo + ?Sized> PortIo for &mut P {
    fn read_u8(&mut self, port: u16) -> u8 {
        (**self).read_u8(port)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        (**self).read_u16(port)
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        (**self).read_u32(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        (**self).write_u8(port, value)
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        (**self).write_u16(port, value)
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        (**self).write_u32(port, value)
    }
}

/// Real `in`/`out` instructions.
#[cfg(target_arch = "x86_64")]
#[derive(Debug)]
pub struct IoPorts {
    _private: (),
}

#[cfg(target_arch = "x86_64")]
impl IoPorts {
    /// # Safety
    ///
    /// The caller must run with I/O privilege and must be the only code path
    /// touching the PCI configuration ports (0xCF8..0xCFF, 0xC000..0xCFFF) and
    /// COM1 while this value is alive.
    pub const unsafe fn new() -> Self {
        IoPorts { _private: () }
    }
}

#[cfg(target_arch = "x86_64")]
impl PortIo for IoPorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        unsafe { Port::<u8>::new(port).read() }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        unsafe { Port::<u16>::new(port).read() }
    }

    fn read_u32(&mut self, port: u16) -> u32 {
        unsafe { Port::<u32>::new(port).read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        unsafe {
            Port::<u8>::new(port).write(value);
        }
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        unsafe {
            Port::<u16>::new(port).write(value);
        }
    }

    fn write_u32(&mut self, port: u16, value: u32) {
        unsafe {
            Port::<u32>::new(port).write(value);
        }
    }
}
