#[cfg(all(target_os = "linux", feature = "native_i2c"))]
use nix::ioctl_write_int_bad;

/// Use this target address for subsequent reads and writes (linux/i2c-dev.h).
#[cfg(all(target_os = "linux", feature = "native_i2c"))]
pub const I2C_SLAVE: u16 = 0x0703;

#[cfg(all(target_os = "linux", feature = "native_i2c"))]
ioctl_write_int_bad!(i2c_set_slave, I2C_SLAVE);
