use std::path::PathBuf;

use clap::{Parser, Subcommand};
use opentimestamps::calendar::DEFAULT_CALENDAR;
use tracing::Level;

mod commands;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Logging verbosity
    #[arg(long, short = 'v', action = clap::ArgAction::Count, default_value = "0")]
    verbose: u8,
    /// Only log errors
    #[arg(long, short = 'q')]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stamp a file, writing the proof to `<file>.ots`
    Stamp {
        /// The file to stamp
        file: PathBuf,
        /// Calendar server to submit the digest to
        #[arg(long, default_value = DEFAULT_CALENDAR)]
        calendar: String,
    },
    /// Print a human-readable rendering of a proof
    Dump {
        /// The `.ots` file to dump
        file: PathBuf,
    },
    /// Fetch upgraded proofs for pending attestations and rewrite the file
    Upgrade {
        /// The `.ots` file to upgrade in place
        file: PathBuf,
    },
    /// Verify a proof against Bitcoin Core
    Verify {
        /// The `.ots` file to verify
        file: PathBuf,
        /// bitcoin-rpc hostname
        #[arg(long, default_value = "localhost:8332")]
        btc_host: String,
        /// bitcoin-rpc username
        #[arg(long, default_value = "bitcoin")]
        btc_user: String,
        /// bitcoin-rpc password
        #[arg(long, default_value = "bitcoin")]
        btc_pass: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match cli.command {
        Commands::Stamp { file, calendar } => commands::stamp(file, calendar).await,
        Commands::Dump { file } => commands::dump(file),
        Commands::Upgrade { file } => commands::upgrade(file).await,
        Commands::Verify {
            file,
            btc_host,
            btc_user,
            btc_pass,
        } => commands::verify(file, btc_host, btc_user, btc_pass),
    }
}
