pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod logging;
pub mod preview;
pub mod render;
pub mod session;
pub mod state;
pub mod viewport;
pub use error::{AppError, AppResult};

use clap::Parser;

/// Entrypoint used by the binary: parses arguments and runs one export pass.
pub fn run() -> AppResult<()> {
    logging::init();
    let args = cli::CliArgs::parse();
    tracing::info!(input = %args.input.display(), "starting memecrop");

    let path = cli::execute(&args)?;
    tracing::info!(path = %path.display(), "export complete");
    println!("{}", path.display());
    Ok(())
}
