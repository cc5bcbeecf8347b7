//! Command line and environment resolution.
//!
//! Defaults are overridden by `EDID_BUS`, which is overridden by flags.
//! Flags are scanned left to right and the last occurrence of a flag wins.

use std::ffi::OsString;
use std::fmt;
use std::io::Write;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{ArgAction, Parser};

use crate::error::{Error, Range, Result};

/// 7-bit address EDID EEPROMs answer on.
pub const DEFAULT_ADDRESS: u16 = 0x50;
pub const ADDRESS_MIN: u16 = 0x03;
pub const ADDRESS_MAX: u16 = 0x77;
pub const BUS_MAX: u32 = 0xFFFFF;

/// Environment variable providing the default bus.
pub const BUS_ENV: &str = "EDID_BUS";

const BUS_ENV_NAME: &str = "EDID_BUS environment variable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSelector {
    /// Probe every adapter for a display.
    Auto,
    Index(u32),
}

impl fmt::Display for BusSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusSelector::Auto => write!(f, "auto"),
            BusSelector::Index(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub bus: BusSelector,
    pub address: u16,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus: BusSelector::Auto,
            address: DEFAULT_ADDRESS,
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    Read(Config),
}

#[derive(Parser, Debug)]
#[command(
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct Args {
    #[arg(short, long, action = ArgAction::Help)]
    help: Option<bool>,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[arg(short, long, value_name = "BUS", allow_hyphen_values = true)]
    bus: Option<String>,

    #[arg(short, long, value_name = "ADDRESS", allow_hyphen_values = true)]
    address: Option<String>,

    // whatever follows `--`
    #[arg(last = true, hide = true)]
    rest: Vec<String>,
}

pub fn usage(prog: &str) -> String {
    format!("Usage: {} [-h] [-v] [-b BUS] [-a ADDRESS]", prog)
}

pub fn help_text(prog: &str) -> String {
    let mut text = usage(prog);
    text.push('\n');
    text.push_str("Retrieve EDID data from a display via (E-)DDC / I²C.\n");
    text.push_str("  -h|--help              Display this help\n");
    text.push_str("  -v|--verbose           Output informative and debug messages over stderr.\n");
    text.push_str("  -b|--bus      BUS      Use I²C bus BUS, if empty scans all available I²C busses.\n");
    text.push_str(&format!(
        "                            Can also be set by {} environmental variable.\n",
        BUS_ENV
    ));
    text.push_str(&format!(
        "  -a|--address  ADDRESS  Use I²C target address ADDRESS, in hexadecimal. [Default: {:02x}h]\n",
        DEFAULT_ADDRESS
    ));
    text.push('\n');
    text.push_str(&format!("{} version {}\n", prog, env!("CARGO_PKG_VERSION")));
    text
}

pub fn write_help<W: Write>(prog: &str, out: &mut W) -> Result<()> {
    out.write_all(help_text(prog).as_bytes()).map_err(Error::Output)?;
    out.flush().map_err(Error::Output)
}

/// Resolve the command line (program name first) and the value of `EDID_BUS`.
pub fn parse<I, T>(args: I, env_bus: Option<OsString>) -> Result<Command>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    check_spellings(&args)?;

    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayHelp => return Ok(Command::Help),
        Err(e) => return Err(from_clap(e)),
    };

    if let Some(extra) = args.rest.into_iter().next() {
        return Err(Error::TooManyArguments(extra));
    }

    let bus = match (args.bus, env_bus) {
        (Some(bus), _) => parse_bus(&bus, "BUS")?,
        (None, Some(env)) => parse_bus(&env.to_string_lossy(), BUS_ENV_NAME)?,
        (None, None) => BusSelector::Auto,
    };

    let address = match args.address {
        Some(address) => parse_int(
            &address,
            "ADDRESS",
            16,
            ADDRESS_MIN.into(),
            ADDRESS_MAX.into(),
        )?
        .map_or(DEFAULT_ADDRESS, |a| a as u16),
        None => DEFAULT_ADDRESS,
    };

    Ok(Command::Read(Config {
        bus,
        address,
        verbose: args.verbose,
    }))
}

fn parse_bus(arg: &str, name: &'static str) -> Result<BusSelector> {
    Ok(parse_int(arg, name, 0, 0, BUS_MAX)?.map_or(BusSelector::Auto, BusSelector::Index))
}

// Only the exact flag spellings are accepted: no `-b5`, `--bus=5` or `-vh`.
fn check_spellings(args: &[OsString]) -> Result<()> {
    let mut tokens = args.iter().skip(1).map(|a| a.to_string_lossy());
    while let Some(token) = tokens.next() {
        match token.as_ref() {
            "--" | "-h" | "--help" => break,
            "-v" | "--verbose" => {}
            "-b" | "--bus" | "-a" | "--address" => {
                tokens.next();
            }
            option if option.starts_with('-') => return Err(Error::InvalidOption(option.to_owned())),
            arg => return Err(Error::InvalidArgument(arg.to_owned())),
        }
    }
    Ok(())
}

fn from_clap(err: clap::Error) -> Error {
    let arg = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(s)) => s.clone(),
        _ => String::new(),
    };
    match err.kind() {
        ErrorKind::UnknownArgument if arg.starts_with('-') => Error::InvalidOption(arg),
        ErrorKind::UnknownArgument => Error::InvalidArgument(arg),
        // only reachable for a flag given without its value
        ErrorKind::InvalidValue if arg.starts_with("--bus") => Error::MissingArgument("BUS"),
        ErrorKind::InvalidValue if arg.starts_with("--address") => Error::MissingArgument("ADDRESS"),
        kind => Error::Cli(kind.as_str().unwrap_or("invalid command line").to_owned()),
    }
}

/// Parse `arg` the way `strtol` does, with `radix` 0 meaning auto-detection
/// (`0x` hex, leading `0` octal, decimal otherwise).
///
/// Returns `None` for an empty string so callers can apply their own default.
pub fn parse_int(arg: &str, name: &'static str, radix: u32, min: u32, max: u32) -> Result<Option<u32>> {
    if arg.is_empty() {
        return Ok(None);
    }
    let num = strtol(arg, radix).ok_or_else(|| Error::NotAnInteger {
        name,
        value: arg.to_owned(),
    })?;
    if num < i64::from(min) || num > i64::from(max) {
        return Err(Error::OutOfRange {
            name,
            range: Range { min, max, hex: radix == 16 },
            value: arg.to_owned(),
        });
    }
    Ok(Some(num as u32))
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    let rest = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    rest.starts_with(|c: char| c.is_ascii_hexdigit()).then_some(rest)
}

// Saturates like strtol on overflow; None when the whole string is not a number.
fn strtol(arg: &str, radix: u32) -> Option<i64> {
    let s = arg.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match radix {
        0 => match strip_hex_prefix(s) {
            Some(rest) => (16, rest),
            None if s.len() > 1 && s.starts_with('0') => (8, &s[1..]),
            None => (10, s),
        },
        16 => (16, strip_hex_prefix(s).unwrap_or(s)),
        radix => (radix, s),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let num = match i64::from_str_radix(digits, radix) {
        Ok(num) => num,
        Err(_) => i64::MAX,
    };
    Some(if negative { num.saturating_neg() } else { num })
}
