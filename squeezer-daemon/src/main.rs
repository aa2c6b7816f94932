//! # squeezerd
//!
//! Watches an incoming directory and compresses every MP4 written into it.
//! Run `squeezerd --help` for options; `RUST_LOG` controls verbosity.

use clap::Parser;
use squeezer_daemon::{cli::Cli, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    squeezer_daemon::init_tracing();
    run(cli).await
}
