//! Access to one I2C bus through the kernel's `i2c-dev` interface.

mod ioctl;
#[cfg(all(target_os = "linux", feature = "native_i2c"))]
mod linux;

use std::path::{Path, PathBuf};

use log::trace;

use crate::error::{Error, Result};

/// The raw operations a bus backend has to provide.
pub trait BusIO {
    /// Direct subsequent transfers at the 7-bit `address`.
    fn set_target(&mut self, address: u16) -> nix::Result<()>;

    /// One blocking read; returns the number of bytes the bus delivered.
    fn read(&mut self, data: &mut [u8]) -> nix::Result<usize>;
}

/// Device node of I2C bus `bus`.
pub fn bus_path(bus: u32) -> PathBuf {
    PathBuf::from(format!("/dev/i2c-{}", bus))
}

pub struct Device {
    bus: u32,
    io: Box<dyn BusIO>,
}

impl Device {
    /// Open `/dev/i2c-<bus>` for reading.
    pub fn open(bus: u32) -> Result<Device> {
        let path = bus_path(bus);
        let io = open_io(&path).map_err(|errno| Error::OpenBus { bus, path, errno })?;
        Ok(Device { bus, io })
    }

    /// Wrap an already opened backend.
    pub fn with_io(bus: u32, io: Box<dyn BusIO>) -> Device {
        Device { bus, io }
    }

    pub fn set_target(&mut self, address: u16) -> Result<()> {
        self.io
            .set_target(address)
            .map_err(|errno| Error::SetAddress { address, errno })
    }

    /// Fill `data` with a single read. Anything short of `data.len()` bytes is an error.
    pub fn read_exact(&mut self, data: &mut [u8]) -> Result<()> {
        let expected = data.len();
        let res = self.io.read(data);
        trace!("i2c-{}: read {:?} of {} bytes", self.bus, res, expected);
        match res {
            Ok(n) if n == expected => Ok(()),
            Ok(n) => Err(Error::ShortRead { expected, read: Some(n), errno: None }),
            Err(errno) => Err(Error::ShortRead { expected, read: None, errno: Some(errno) }),
        }
    }
}

#[cfg(all(target_os = "linux", feature = "native_i2c"))]
fn open_io(path: &Path) -> nix::Result<Box<dyn BusIO>> {
    Ok(Box::new(linux::LinuxBusIO::open(path)?))
}

#[cfg(not(all(target_os = "linux", feature = "native_i2c")))]
fn open_io(_path: &Path) -> nix::Result<Box<dyn BusIO>> {
    Err(nix::errno::Errno::ENOTSUP)
}


#[cfg(test)]
mod tests {
    use super::mock::MockBusIO;
    use super::*;
    use nix::errno::Errno;

    #[test]
    fn test_bus_path() {
        assert_eq!(bus_path(8), PathBuf::from("/dev/i2c-8"));
        assert_eq!(bus_path(0x10), PathBuf::from("/dev/i2c-16"));
    }

    #[test]
    fn test_wrong_address() {
        let mut dev = Device::with_io(1, Box::new(MockBusIO::new(0x50, vec![0; 256])));
        let err = dev.set_target(0x37).unwrap_err();
        assert!(matches!(err, Error::SetAddress { address: 0x37, errno: Errno::ENXIO }));
    }

    #[test]
    fn test_short_read() {
        let mut dev = Device::with_io(1, Box::new(MockBusIO::new(0x50, vec![0xaa; 128])));
        dev.set_target(0x50).unwrap();
        let mut buf = [0u8; 256];
        let err = dev.read_exact(&mut buf).unwrap_err();
        assert!(matches!(err, Error::ShortRead { expected: 256, read: Some(128), errno: None }));
    }

    #[test]
    fn test_read_os_error() {
        let mut dev = Device::with_io(1, Box::new(MockBusIO::new(0x50, vec![0; 256])));
        let mut buf = [0u8; 256];
        let err = dev.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.errno(), Some(Errno::EREMOTEIO));
    }

    #[test]
    fn test_open_missing_bus() {
        // no adapter will ever have this index
        let err = Device::open(0xFFFFF).err().unwrap();
        match err {
            Error::OpenBus { bus, path, .. } => {
                assert_eq!(bus, 0xFFFFF);
                assert_eq!(path, PathBuf::from("/dev/i2c-1048575"));
            }
            e => panic!("unexpected error {:?}", e),
        }
    }
}
