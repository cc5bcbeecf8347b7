use std::io::Write;

use log::debug;

use crate::bus::{self, AdapterSource, Enumerator};
use crate::cli::{BusSelector, Config};
use crate::driver::i2c::{bus_path, Device};
use crate::error::{Error, Result};

/// Size of the single read; covers the base block and one extension.
pub const EDID_BLOCK_SIZE: usize = 256;

/// Fixed pattern every EDID base block starts with.
pub const EDID_HEADER: [u8; 8] = [0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00];

pub type EdidBlock = [u8; EDID_BLOCK_SIZE];

/// Bind `address` on an open bus and read one block from it.
pub fn read_block(device: &mut Device, address: u16) -> Result<EdidBlock> {
    device.set_target(address)?;
    let mut block = [0u8; EDID_BLOCK_SIZE];
    device.read_exact(&mut block)?;
    Ok(block)
}

pub fn write_block<W: Write>(out: &mut W, block: &EdidBlock) -> Result<()> {
    out.write_all(block).map_err(Error::Output)?;
    out.flush().map_err(Error::Output)
}

/// Read the EDID block selected by `config` and write it raw to `out`.
///
/// `adapters` lists the candidate buses for automatic selection and `open`
/// gives access to a bus.
pub fn dump_with<W, S, F>(config: &Config, adapters: &S, out: &mut W, mut open: F) -> Result<()>
where
    W: Write,
    S: AdapterSource + ?Sized,
    F: FnMut(u32) -> Result<Device>,
{
    debug!("Bus {}, Address {:02x}h", config.bus, config.address);
    let (bus, block) = match config.bus {
        BusSelector::Index(bus) => {
            debug!("Opening {}", bus_path(bus).display());
            let mut device = open(bus)?;
            (bus, read_block(&mut device, config.address)?)
        }
        // the probe already read the whole block
        BusSelector::Auto => bus::autodetect(adapters, config.address, &mut open)?,
    };
    debug!("Read {} bytes from i2c-{}", block.len(), bus);

    write_block(out, &block)
}

/// Read the EDID block selected by `config` from `/dev/i2c-*` and write it raw to `out`.
pub fn dump<W: Write>(config: &Config, out: &mut W) -> Result<()> {
    dump_with(config, &Enumerator::new(), out, Device::open)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::tests::{adapter, edid_bytes, NoAdapters};
    use crate::driver::i2c::mock::MockBusIO;

    fn config(bus: u32, address: u16) -> Config {
        Config { bus: BusSelector::Index(bus), address, verbose: true }
    }

    fn block() -> Vec<u8> {
        let mut data: Vec<u8> = (0..=255).collect();
        data[..8].copy_from_slice(&EDID_HEADER);
        data
    }

    #[test]
    fn test_dump_full_block() {
        let mut out = Vec::new();
        let mut opened = None;
        dump_with(&config(7, 0x50), &NoAdapters, &mut out, |bus| {
            opened = Some(bus);
            Ok(Device::with_io(bus, Box::new(MockBusIO::new(0x50, block()))))
        })
        .unwrap();
        assert_eq!(opened, Some(7));
        assert_eq!(out, block());
    }

    #[test]
    fn test_dump_short_read_writes_nothing() {
        let mut out = Vec::new();
        let err = dump_with(&config(7, 0x50), &NoAdapters, &mut out, |bus| {
            Ok(Device::with_io(bus, Box::new(MockBusIO::new(0x50, vec![0; 128]))))
        })
        .unwrap_err();
        assert!(matches!(err, Error::ShortRead { read: Some(128), .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_dump_bind_failure() {
        let mut out = Vec::new();
        let err = dump_with(&config(7, 0x37), &NoAdapters, &mut out, |bus| {
            Ok(Device::with_io(bus, Box::new(MockBusIO::new(0x50, block()))))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "could not set I²C address for display to 37h");
        assert!(out.is_empty());
    }

    #[test]
    fn test_dump_open_failure() {
        let mut out = Vec::new();
        let err = dump(&config(0xFFFFF, 0x50), &mut out).unwrap_err();
        assert!(matches!(err, Error::OpenBus { bus: 0xFFFFF, .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_block_is_not_decoded() {
        let mut out = Vec::new();
        let data = vec![0xa5; EDID_BLOCK_SIZE];
        dump_with(&config(1, 0x50), &NoAdapters, &mut out, |bus| {
            Ok(Device::with_io(bus, Box::new(MockBusIO::new(0x50, data.clone()))))
        })
        .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_dump_auto_uses_scanned_block() {
        let adapters = vec![adapter(0, "SMBus I801 adapter"), adapter(3, "i915 gmbus dpb")];
        let config = Config { bus: BusSelector::Auto, address: 0x50, verbose: false };
        let mut out = Vec::new();
        let mut opened = Vec::new();
        dump_with(&config, &adapters, &mut out, |bus| {
            opened.push(bus);
            Ok(Device::with_io(bus, Box::new(MockBusIO::new(0x50, edid_bytes()))))
        })
        .unwrap();
        // one open and one read for the whole run
        assert_eq!(opened, vec![3]);
        assert_eq!(out, edid_bytes());
    }

    #[test]
    fn test_dump_auto_without_adapters() {
        let config = Config { bus: BusSelector::Auto, address: 0x50, verbose: false };
        let mut out = Vec::new();
        let err = dump_with(&config, &NoAdapters, &mut out, |bus| {
            Ok(Device::with_io(bus, Box::new(MockBusIO::new(0x50, edid_bytes()))))
        })
        .unwrap_err();
        assert!(matches!(err, Error::NoDisplay { address: 0x50 }));
        assert!(out.is_empty());
    }
}
