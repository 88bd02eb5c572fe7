//! simple-config
//!
//! Shows which configuration files a loader would read and what their
//! merged content is.

use anyhow::Result;
use clap::Parser;
use simple_config::cli::{Cli, Command};
use simple_config::logging::{self, LogTarget};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let loader = cli.loader();
    debug!(name = loader.name(), format = %loader.format(), "Loader configured");

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => {
            let resolved = loader.resolve()?;
            for source in &resolved.sources {
                eprintln!("# {}", source.display());
            }
            println!("{}", serde_json::to_string_pretty(&resolved.tree)?);
        }
        Command::Paths => {
            for path in loader.candidate_paths() {
                let marker = if path.is_file() { "found" } else { "absent" };
                println!("{:<7} {}", marker, path.display());
            }
        }
    }

    Ok(())
}
