use super::ioctl;
use super::BusIO;

use std::{os::fd::RawFd, path::Path};
use log::{info, trace};
use nix::{fcntl, sys::stat::Mode, unistd};

/// An `i2c-dev` character device opened read-only.
pub struct LinuxBusIO {
    fd: RawFd,
}

impl Drop for LinuxBusIO {
    fn drop(&mut self) {
        trace!("Closing i2c device {}", self.fd);
        if let Err(e) = unistd::close(self.fd) {
            log::warn!("cannot close i2c device {}: {}", self.fd, e);
        }
    }
}

impl BusIO for LinuxBusIO {
    fn set_target(&mut self, address: u16) -> nix::Result<()> {
        unsafe {
            ioctl::i2c_set_slave(self.fd, address.into())?;
        }
        trace!("LinuxBusIO {} bound to address {:02x}h", self.fd, address);
        Ok(())
    }

    fn read(&mut self, data: &mut [u8]) -> nix::Result<usize> {
        unistd::read(self.fd, data)
    }
}

impl LinuxBusIO {
    pub fn open(path: &Path) -> nix::Result<LinuxBusIO> {
        let fd = fcntl::open(path, fcntl::OFlag::O_RDONLY, Mode::empty())?;
        info!("Opened i2c device {:?}: {}", path, fd);
        Ok(LinuxBusIO { fd })
    }
}
