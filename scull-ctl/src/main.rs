//! scullctl - control client for the scull character device.
//!
//! Each invocation:
//! - Opens one session on the device (`/dev/scull` unless overridden)
//! - Runs exactly one control verb, or fans a describe-caller query out
//!   over worker processes or threads
//! - Releases the session on every exit path

mod args;
mod command;
mod dispatch;
mod fanout;
mod output;
mod run;

use args::Args;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(device = %args.device.display(), verb = ?args.verb, "scullctl started");

    let exit_code = match run::run(args) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("scullctl error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}
