mod archive;
mod config;
mod cursor;
mod session;
mod writer;

use clap::Parser;
use config::Config;
use log::{error, info};
use std::path::PathBuf;
use std::process;

/// Incrementally archives IMAP mailboxes into per-message .eml files.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// Location of the config file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log debug output unless RUST_LOG says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("loading config {:?}", args.config);
    let config = match Config::read_from(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config {:?}: {}", args.config, e);
            process::exit(1);
        }
    };

    for acc in &config.accounts {
        info!("archiving {:?} into {:?}", acc, acc.target);
        match archive::get(acc) {
            Ok(reports) => {
                let archived: usize = reports.iter().map(|r| r.archived.len()).sum();
                info!("{} mailboxes done, {} messages archived", reports.len(), archived);
            }
            Err(e) => error!("an unexpected error has occured: {:?}", e),
        }
    }
}
