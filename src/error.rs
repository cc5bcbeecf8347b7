use std::io::Write;
use std::path::PathBuf;

use nix::errno::Errno;

use crate::cli;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Inclusive bounds of a numeric argument, rendered in the radix it was parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub min: u32,
    pub max: u32,
    pub hex: bool,
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hex {
            write!(f, "{:02x}h-{:02x}h", self.min, self.max)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing argument {0}")]
    MissingArgument(&'static str),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("too many arguments: {0}")]
    TooManyArguments(String),

    #[error("{name} is not an integer: {value}")]
    NotAnInteger { name: &'static str, value: String },

    #[error("{name} out of range [{range}]: {value}")]
    OutOfRange {
        name: &'static str,
        range: Range,
        value: String,
    },

    #[error("{0}")]
    Cli(String),

    #[error("could not open I²C bus {bus} [{}]", .path.display())]
    OpenBus {
        bus: u32,
        path: PathBuf,
        errno: Errno,
    },

    #[error("could not set I²C address for display to {address:02x}h")]
    SetAddress { address: u16, errno: Errno },

    #[error("reading EDID block ({expected} bytes){}", short_read_suffix(.read))]
    ShortRead {
        expected: usize,
        read: Option<usize>,
        errno: Option<Errno>,
    },

    #[error("no display found responding at I²C address {address:02x}h")]
    NoDisplay { address: u16 },

    #[error("could not write to standard output")]
    Output(#[source] std::io::Error),
}

fn short_read_suffix(read: &Option<usize>) -> String {
    match read {
        Some(n) => format!(", got {}", n),
        None => String::new(),
    }
}

impl Error {
    /// The OS error behind this failure, if there is one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Error::OpenBus { errno, .. } | Error::SetAddress { errno, .. } => Some(*errno),
            Error::ShortRead { errno, .. } => *errno,
            Error::Output(e) => e.raw_os_error().map(Errno::from_i32),
            _ => None,
        }
    }
}

/// Write the terminal diagnostic for `err`: one line prefixed with the
/// program name, the OS error description when known, then the usage line.
pub fn report(prog: &str, err: &Error, stream: &mut impl Write) -> std::io::Result<()> {
    match err.errno() {
        Some(errno) => writeln!(stream, "{}: {}: {}", prog, err, errno.desc())?,
        None => writeln!(stream, "{}: {}", prog, err)?,
    }
    writeln!(stream, "{}", cli::usage(prog))
}
