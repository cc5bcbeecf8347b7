use std::io::Write;
use std::process::ExitCode;

use log::LevelFilter;

use edid_i2c::cli::{self, Command};
use edid_i2c::{edid, error};

fn main() -> ExitCode {
    let mut args = std::env::args_os().peekable();
    let prog = args
        .peek()
        .map(|a| a.to_string_lossy().into_owned())
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned());

    let result = match cli::parse(args, std::env::var_os(cli::BUS_ENV)) {
        Ok(Command::Help) => {
            let stdout = std::io::stdout();
            cli::write_help(&prog, &mut stdout.lock())
        }
        Ok(Command::Read(config)) => {
            init_logger(config.verbose);
            let stdout = std::io::stdout();
            edid::dump(&config, &mut stdout.lock())
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let stderr = std::io::stderr();
            let mut stderr = stderr.lock();
            let _ = error::report(&prog, &e, &mut stderr);
            let _ = stderr.flush();
            ExitCode::FAILURE
        }
    }
}

fn init_logger(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(LevelFilter::Warn);
    builder.parse_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp_micros().init();
}
