//! Locating the bus a display is attached to.
//!
//! Adapters of the `i2c-dev` subsystem are listed through udev and probed one
//! at a time at the target address. The first one that delivers a full block
//! starting with the EDID header wins. A display that is powered off or
//! attached to another host will not show up.

use std::io;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::driver::i2c::Device;
use crate::edid::{self, EdidBlock};
use crate::error::{Error, Result};

// adapters that never carry a display (same list as ddcutil's ignorable names)
const SKIP_PREFIX: [&str; 5] = ["SMBus", "soc:i2cdsi", "smu", "mac-io", "u4"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub index: u32,
    pub name: String,
    pub dev_path: PathBuf,
}

impl Adapter {
    pub fn is_display_candidate(&self) -> bool {
        !SKIP_PREFIX.iter().any(|p| self.name.starts_with(p))
    }
}

/// Something that can list the I2C adapters of the system.
pub trait AdapterSource {
    /// All adapters, ordered by bus index.
    fn adapters(&self) -> io::Result<Vec<Adapter>>;
}

impl AdapterSource for [Adapter] {
    fn adapters(&self) -> io::Result<Vec<Adapter>> {
        Ok(self.to_vec())
    }
}

impl AdapterSource for Vec<Adapter> {
    fn adapters(&self) -> io::Result<Vec<Adapter>> {
        Ok(self.clone())
    }
}

/// Lists `i2c-dev` devices known to udev.
///
/// Requires the `udev` feature; without it listing always fails and the
/// automatic bus selection finds nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct Enumerator;

impl Enumerator {
    pub fn new() -> Self {
        Enumerator
    }
}

#[cfg(feature = "udev")]
impl AdapterSource for Enumerator {
    fn adapters(&self) -> io::Result<Vec<Adapter>> {
        let mut en = udev::Enumerator::new()?;
        en.match_subsystem("i2c-dev")?;

        let mut adapters = Vec::new();
        for dev in en.scan_devices()? {
            match adapter_from_device(&dev) {
                Ok(adapter) => adapters.push(adapter),
                Err(e) => debug!("Ignoring {:?}: {:#}", dev.syspath(), e),
            }
        }
        adapters.sort_by_key(|a| a.index);
        Ok(adapters)
    }
}

#[cfg(not(feature = "udev"))]
impl AdapterSource for Enumerator {
    fn adapters(&self) -> io::Result<Vec<Adapter>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "built without udev support",
        ))
    }
}

#[cfg(feature = "udev")]
fn adapter_from_device(dev: &udev::Device) -> anyhow::Result<Adapter> {
    use anyhow::Context;

    let index = dev
        .sysnum()
        .context("no bus number")
        .and_then(|n| u32::try_from(n).context("bus number out of range"))?;
    let dev_path = dev.devnode().context("no device node")?.to_path_buf();
    let name = dev
        .attribute_value("name")
        .map(|name| name.to_string_lossy().trim_end().to_owned())
        .unwrap_or_default();
    Ok(Adapter { index, name, dev_path })
}

/// Probe `adapters` in order at `address`; `open` gives access to a bus.
///
/// Returns the bus that answered together with the block it delivered.
pub fn scan<F>(adapters: &[Adapter], address: u16, mut open: F) -> Result<(u32, EdidBlock)>
where
    F: FnMut(u32) -> Result<Device>,
{
    for adapter in adapters {
        if !adapter.is_display_candidate() {
            debug!("Skipping {} ({})", adapter.dev_path.display(), adapter.name);
            continue;
        }
        match probe(&mut open, adapter.index, address) {
            Ok(block) => {
                info!("Found display on {} ({})", adapter.dev_path.display(), adapter.name);
                return Ok((adapter.index, block));
            }
            Err(e) => debug!("No display on {}: {}", adapter.dev_path.display(), e),
        }
    }
    Err(Error::NoDisplay { address })
}

fn probe<F>(open: &mut F, bus: u32, address: u16) -> Result<EdidBlock>
where
    F: FnMut(u32) -> Result<Device>,
{
    let mut device = open(bus)?;
    let block = edid::read_block(&mut device, address)?;
    if has_edid_header(&block) {
        Ok(block)
    } else {
        Err(Error::NoDisplay { address })
    }
}

pub fn has_edid_header(block: &EdidBlock) -> bool {
    block.starts_with(&edid::EDID_HEADER)
}

/// Find the first display responding at `address` among the adapters of `source`.
pub fn autodetect<S, F>(source: &S, address: u16, open: F) -> Result<(u32, EdidBlock)>
where
    S: AdapterSource + ?Sized,
    F: FnMut(u32) -> Result<Device>,
{
    let adapters = match source.adapters() {
        Ok(adapters) => adapters,
        Err(e) => {
            warn!("Cannot list I2C adapters: {}", e);
            return Err(Error::NoDisplay { address });
        }
    };
    debug!("Scanning {} I2C adapters", adapters.len());
    scan(&adapters, address, open)
}
