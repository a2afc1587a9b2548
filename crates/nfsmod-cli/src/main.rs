use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nfsmod_core::config::CONFIG_FILE;
use nfsmod_core::{Config, TextEncoding, ValueKind};
use tracing::debug;

mod attach;
mod commands;
#[cfg(test)]
mod fake;
mod logging;

use commands::hex_utils::parse_hex_address;

#[derive(Parser)]
#[command(name = "nfsmod")]
#[command(about = "Memory toolkit and mod host for Need for Speed games")]
#[command(version)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Target executable (overrides the config file)
    #[arg(short, long, global = true, env = "NFSMOD_PROCESS")]
    process: Option<String>,

    /// Log fail-soft memory errors
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Address options shared by every command that targets one location.
#[derive(clap::Args, Debug, Clone)]
struct Target {
    /// Address in hex (with or without 0x)
    #[arg(value_parser = parse_hex_address)]
    address: u64,

    /// Treat the address as an offset from the main module base
    #[arg(short, long)]
    relative: bool,
}

impl Target {
    fn address(&self) -> nfsmod_core::Address {
        if self.relative {
            nfsmod_core::Address::Relative(self.address)
        } else {
            nfsmod_core::Address::Absolute(self.address)
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a typed value
    Read {
        #[command(flatten)]
        target: Target,

        /// Value kind (bool, u8, char, i16, u16, i32, u32, i64, u64, f32, f64)
        #[arg(short, long, default_value = "i32")]
        kind: ValueKind,
    },

    /// Write a typed value
    Write {
        #[command(flatten)]
        target: Target,

        /// Value to write (integers accept 0x-prefixed hex)
        #[arg(allow_negative_numbers = true)]
        value: String,

        #[arg(short, long, default_value = "i32")]
        kind: ValueKind,
    },

    /// Read a NUL-terminated string
    ReadString {
        #[command(flatten)]
        target: Target,

        /// Number of bytes to read
        #[arg(short, long, default_value = "64")]
        length: usize,

        /// Text encoding (ascii, utf8, utf16, shift-jis)
        #[arg(short, long, default_value = "ascii")]
        encoding: TextEncoding,
    },

    /// Write a string followed by its NUL terminator
    WriteString {
        #[command(flatten)]
        target: Target,

        text: String,

        #[arg(short, long, default_value = "ascii")]
        encoding: TextEncoding,

        /// Zero-fill this many bytes before writing
        #[arg(long)]
        clear: Option<usize>,
    },

    /// Dump raw bytes
    Hexdump {
        #[command(flatten)]
        target: Target,

        /// Number of bytes
        #[arg(short, long, default_value = "256")]
        size: usize,

        /// Show ASCII column
        #[arg(long)]
        ascii: bool,
    },

    /// Find the first occurrence of a byte pattern in committed memory
    Scan {
        /// Space-separated hex bytes, e.g. "DE AD BE EF"
        pattern: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List memory regions of the target
    Regions {
        /// Include free, reserved and guarded regions
        #[arg(long)]
        all: bool,

        #[arg(long)]
        json: bool,
    },

    /// Poll a value and log every change until Ctrl+C or the game exits
    Watch {
        #[command(flatten)]
        target: Target,

        #[arg(short, long, default_value = "i32")]
        kind: ValueKind,

        /// Poll interval in milliseconds (defaults to the configured tick)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(&args.config);
    if let Some(process) = &args.process {
        config.process_name = process.clone();
    }
    config.debug |= args.debug;

    logging::init(&config.log, config.debug)?;
    debug!("Using config: {:?}", config);

    let memory = attach::attach_or_exit(&config.process_name);

    match args.command {
        Command::Read { target, kind } => {
            commands::read::run(&memory, target.address(), kind, config.debug)
        }
        Command::Write {
            target,
            value,
            kind,
        } => commands::write::run(&memory, target.address(), &value, kind, config.debug),
        Command::ReadString {
            target,
            length,
            encoding,
        } => commands::string::read(&memory, target.address(), length, encoding, config.debug),
        Command::WriteString {
            target,
            text,
            encoding,
            clear,
        } => commands::string::write(
            &memory,
            target.address(),
            &text,
            encoding,
            clear,
            config.debug,
        ),
        Command::Hexdump {
            target,
            size,
            ascii,
        } => commands::hexdump::run(&memory, target.address(), size, ascii),
        Command::Scan { pattern, json } => commands::scan::run(&memory, &pattern, json),
        Command::Regions { all, json } => commands::regions::run(&memory, all, json),
        Command::Watch {
            target,
            kind,
            interval,
        } => {
            let interval = interval
                .map(std::time::Duration::from_millis)
                .unwrap_or_else(|| config.tick_interval());
            commands::watch::run(&memory, target.address(), kind, interval, config.debug)
        }
    }
}
