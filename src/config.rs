use std::ffi::OsString;

use clap::Parser;

/// Upper bound on reader threads
pub const MAX_READERS: usize = 12;
/// Writes performed by the writer unless told otherwise
pub const DEFAULT_WRITES: u64 = 25_000;
/// Reads performed by every reader unless told otherwise
pub const DEFAULT_READS: u64 = 2_000_000;

#[derive(Parser, Debug)]
#[command(version, about = "Readers-writers demo over a shared counter", long_about = None)]
pub struct Args {
    /// Number of reader threads, between 1 and 12
    #[arg(allow_negative_numbers = true)]
    number_of_readers: Option<String>,

    /// Increments performed by the writer
    #[arg(long, default_value_t = DEFAULT_WRITES)]
    writes: u64,

    /// Reads performed by every reader
    #[arg(long, default_value_t = DEFAULT_READS, value_parser = clap::value_parser!(u64).range(1..))]
    reads: u64,

    /// Start the readers alongside the writer instead of after it
    #[arg(long)]
    interleave: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Usage: {program} <number_of_readers>")]
    MissingReaderCount { program: String },

    #[error("Usage: {program} <number_of_readers>\nNumber of readers must be an integer, got '{value}'")]
    MalformedReaderCount { program: String, value: String },

    #[error("Number of readers must be between 1 and {max}, got {count}")]
    ReaderCountOutOfRange { count: i64, max: usize },

    #[error("{0}")]
    Arguments(#[from] clap::Error),
}

/// When readers are started relative to the writer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOrder {
    /// Run the writer to completion, then start every reader
    WriterFirst,
    /// Start everything at once, observed values are nondeterministic
    Interleaved,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub readers: usize,
    pub writes: u64,
    pub reads: u64,
    pub order: StartOrder,
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let program = args
            .first()
            .map(|a| a.to_string_lossy().into_owned())
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());

        let parsed = Args::try_parse_from(&args)?;
        let value = match parsed.number_of_readers {
            Some(v) => v,
            None => return Err(ConfigError::MissingReaderCount { program }),
        };
        let count: i64 = match value.trim().parse() {
            Ok(c) => c,
            Err(_) => return Err(ConfigError::MalformedReaderCount { program, value }),
        };

        if count < 1 || count > MAX_READERS as i64 {
            return Err(ConfigError::ReaderCountOutOfRange {
                count,
                max: MAX_READERS,
            });
        }

        Ok(Config {
            readers: count as usize,
            writes: parsed.writes,
            reads: parsed.reads,
            order: if parsed.interleave {
                StartOrder::Interleaved
            } else {
                StartOrder::WriterFirst
            },
        })
    }
}
