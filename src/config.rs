use crate::orchestrator::ProbeConfig;
use clap::Parser;
use std::{ffi::OsString, path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::Level;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    BadArgs(#[from] clap::Error),

    #[error("Invalid value for {field}: `{value}`")]
    InvalidValue { field: &'static str, value: String },

    #[error("Invalid path to the log file {0}")]
    InvalidLogfile(PathBuf),
}

mod args {
    use super::*;

    /// Scan for BLE peripherals, connect to those advertising the target
    /// name, and enumerate their GATT services and characteristics.
    #[derive(Parser, Debug)]
    #[clap(name = "blescout")]
    pub struct Args {
        /// Bluetooth adapter to use (first available when omitted)
        pub adapter: Option<String>,

        /// Advertised device name to connect to
        #[clap(short = 'n', long, default_value = "Local")]
        pub name: String,

        /// Scan window in seconds
        #[clap(short = 't', long, default_value_t = 10)]
        pub scan_timeout: u64,

        /// Connection attempt timeout in seconds (unbounded when omitted)
        #[clap(long)]
        pub connect_timeout: Option<u64>,

        /// Number of connection workers
        #[clap(short = 'w', long, default_value_t = 4)]
        pub workers: usize,

        /// Log level [trace|debug|info|warn|error]
        #[clap(short = 'v', long)]
        pub log_level: Option<Level>,

        /// Log file
        #[clap(short = 'f', long)]
        pub log_file: Option<PathBuf>,
    }
}

#[derive(Debug)]
pub struct Config {
    pub adapter: Option<String>,
    pub probe: ProbeConfig,
    pub log: LogConfig,
}

#[derive(Debug)]
pub struct LogConfig {
    pub level: Level,
    pub file: Option<(PathBuf, OsString)>,
}

impl Config {
    pub fn get() -> Result<Self, ConfigError> {
        Self::from_args(args::Args::try_parse()?)
    }

    fn from_args(args: args::Args) -> Result<Self, ConfigError> {
        if args.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                value: args.workers.to_string(),
            });
        }
        if args.scan_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan-timeout",
                value: args.scan_timeout.to_string(),
            });
        }

        let config = Config {
            adapter: args.adapter,
            probe: ProbeConfig {
                device_name: args.name,
                scan_timeout: Duration::from_secs(args.scan_timeout),
                connect_timeout: args.connect_timeout.map(Duration::from_secs),
                workers: args.workers,
                ..ProbeConfig::default()
            },
            log: LogConfig {
                level: args.log_level.unwrap_or(Level::INFO),
                file: args
                    .log_file
                    .map(|path| {
                        if let (Some(directory), Some(file_name)) =
                            (path.parent(), path.file_name())
                        {
                            Ok((directory.to_owned(), file_name.to_owned()))
                        } else {
                            Err(ConfigError::InvalidLogfile(path))
                        }
                    })
                    .transpose()?,
            },
        };
        Ok(config)
    }
}
