//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`health`].

pub mod health;
pub mod run;

use crate::cli::{Cli, Commands};
use crate::error::SfRelayError;

pub async fn dispatch(cli: Cli) -> Result<(), SfRelayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  sfrelay v{version} \u{2014} CORS-friendly Salesforce API proxy\n\n  \
         No command provided. To get started:\n\n    \
         sfrelay run                  Start the proxy on 0.0.0.0:5000\n    \
         sfrelay run -p 8080          Start on another port (or set PORT)\n    \
         sfrelay health               Check a running instance\n    \
         sfrelay --help               See all commands and options\n"
    );
}
