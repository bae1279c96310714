use clap::{App, Arg, ArgMatches};
use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::chain::Network;
use crate::errors::*;
use crate::names::encoding::{NameEncoding, NameEncodings};

#[derive(Debug, Clone)]
pub struct Config {
    pub log: stderrlog::StdErrLog,
    pub network_type: Network,
    pub db_path: PathBuf,
    pub namehash_index: bool,
    pub encodings: NameEncodings,
    pub monitoring_addr: Option<SocketAddr>,
    pub blocks_file: Option<PathBuf>,
    pub lookup: Option<String>,
}

fn app<'a>(network_help: &'a str, encoding_help: &'a str) -> App<'a, 'a> {
    App::new("Names Index")
        .version(crate_version!())
        .arg(
            Arg::with_name("verbosity")
                .short("v")
                .multiple(true)
                .help("Increase logging verbosity"),
        )
        .arg(
            Arg::with_name("timestamp")
                .long("timestamp")
                .help("Prepend log lines with a timestamp"),
        )
        .arg(
            Arg::with_name("db_dir")
                .long("db-dir")
                .help("Directory to store index database (default: ./db/)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("network")
                .long("network")
                .help(network_help)
                .takes_value(true)
                .validator(|name| {
                    if Network::names().contains(&name) {
                        Ok(())
                    } else {
                        Err(format!("unsupported network: {}", name))
                    }
                }),
        )
        .arg(
            Arg::with_name("namehash_index")
                .long("namehash-index")
                .help("Maintain the index of name hashes to names"),
        )
        .arg(
            Arg::with_name("name_encoding")
                .long("name-encoding")
                .help(encoding_help)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("value_encoding")
                .long("value-encoding")
                .help(encoding_help)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("monitoring_addr")
                .long("monitoring-addr")
                .help("Prometheus monitoring 'addr:port' to listen on (default: disabled)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("blocks")
                .long("blocks")
                .help("File with one hex-encoded block per line, starting at height 0")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("lookup")
                .long("lookup")
                .help("Hex-encoded SHA-256d name hash to look up")
                .takes_value(true),
        )
}

fn network_help() -> String {
    format!("Select network type ({})", Network::names().join(", "))
}

fn encoding_help() -> String {
    format!(
        "Encoding of names/values in outputs ({}, default: ascii)",
        NameEncoding::names().join(", ")
    )
}

fn make_logger(m: &ArgMatches) -> stderrlog::StdErrLog {
    let mut log = stderrlog::new();
    log.verbosity(m.occurrences_of("verbosity") as usize);
    log.timestamp(if m.is_present("timestamp") {
        stderrlog::Timestamp::Millisecond
    } else {
        stderrlog::Timestamp::Off
    });
    log
}

impl Config {
    /// Parses the process arguments. The logger is initialised before the
    /// options are interpreted, so fallbacks get reported.
    pub fn from_args() -> Result<Config> {
        let (network_help, encoding_help) = (network_help(), encoding_help());
        let m = app(&network_help, &encoding_help).get_matches();
        let mut log = make_logger(&m);
        log.init()
            .unwrap_or_else(|err| eprintln!("failed to initialize logger: {}", err));
        Config::from_matches(&m, log)
    }

    /// Parses `args` (including the program name) without touching the logger.
    pub fn from_iter<I, T>(args: I) -> Result<Config>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let (network_help, encoding_help) = (network_help(), encoding_help());
        let m = app(&network_help, &encoding_help)
            .get_matches_from_safe(args)
            .chain_err(|| "invalid arguments")?;
        let log = make_logger(&m);
        Config::from_matches(&m, log)
    }

    fn from_matches(m: &ArgMatches, log: stderrlog::StdErrLog) -> Result<Config> {
        let network_name = m.value_of("network").unwrap_or("mainnet");
        let network_type = Network::from(network_name);
        let db_dir = Path::new(m.value_of("db_dir").unwrap_or("./db"));
        let db_path = db_dir.join(network_type.subdir());

        let encodings =
            NameEncodings::from_options(m.value_of("name_encoding"), m.value_of("value_encoding"));

        let monitoring_addr = match m.value_of("monitoring_addr") {
            Some(addr) => Some(
                addr.parse::<SocketAddr>()
                    .chain_err(|| format!("invalid monitoring address {}", addr))?,
            ),
            None => None,
        };

        Ok(Config {
            log,
            network_type,
            db_path,
            namehash_index: m.is_present("namehash_index"),
            encodings,
            monitoring_addr,
            blocks_file: m.value_of("blocks").map(PathBuf::from),
            lookup: m.value_of("lookup").map(str::to_string),
        })
    }

    pub fn namehash_path(&self) -> PathBuf {
        self.db_path.join("namehash")
    }
}
