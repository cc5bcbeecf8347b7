//! Read the raw EDID block of a display over I2C.

pub mod bus;
pub mod cli;
pub mod driver;
pub mod edid;
pub mod error;

pub use error::{Error, Result};
