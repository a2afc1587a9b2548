//! Logging setup: console output plus a per-day log file.
//!
//! Lines look like `(2024-03-01 21:04:55)  INFO nfsmod: Attached to speed.exe`.
//! The file name carries the local date (`<prefix> MM-dd-YYYY.log`) and is
//! re-evaluated for every event, so a long session rolls over at midnight.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use nfsmod_core::LogConfig;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// `(YYYY-MM-DD HH:MM:SS)` in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl FormatTime for LocalClock {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "({})", Local::now().format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Appends to `<directory>/<prefix> MM-dd-YYYY.log` for the current date.
#[derive(Debug, Clone)]
pub struct DailyLogFile {
    directory: PathBuf,
    prefix: String,
}

impl DailyLogFile {
    pub fn new(directory: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.into(),
        }
    }

    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{} {}.log", self.prefix, date.format("%m-%d-%Y"))
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(self.file_name(date))
    }

    fn open(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }
}

/// Writer handed to the fmt layer; a file that cannot be opened swallows the event.
pub enum LogWriter {
    File(File),
    Discard,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogWriter::File(f) => f.write(buf),
            LogWriter::Discard => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogWriter::File(f) => f.flush(),
            LogWriter::Discard => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for DailyLogFile {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        let path = self.path_for(Local::now().date_naive());
        match self.open(&path) {
            Ok(file) => LogWriter::File(file),
            Err(_) => LogWriter::Discard,
        }
    }
}

/// Default filter directive when `RUST_LOG` is unset.
pub fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// Install the global subscriber.
pub fn init(config: &LogConfig, debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let console = config
        .console
        .then(|| fmt::layer().with_timer(LocalClock).with_writer(io::stderr));

    let file = if config.file {
        fs::create_dir_all(&config.directory).with_context(|| {
            format!(
                "Failed to create log directory {}",
                config.directory.display()
            )
        })?;
        Some(
            fmt::layer()
                .with_timer(LocalClock)
                .with_ansi(false)
                .with_writer(DailyLogFile::new(
                    &config.directory,
                    config.file_prefix.as_str(),
                )),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()?;
    Ok(())
}
