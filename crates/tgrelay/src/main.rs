//! # tgrelay
//!
//! `tgrelay serve` runs the HTTP bridge in front of one authorized platform
//! session. `tgrelay send` is a small client of that bridge that sends a
//! batch of text messages.

#![deny(unsafe_code)]

mod send;
mod serve;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Platform HTTP bridge.
#[derive(Parser, Debug)]
#[command(name = "tgrelay", version, about = "Platform HTTP bridge")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authorize the platform session and serve `/api/call`.
    Serve(serve::ServeArgs),
    /// Send a batch of messages through a running bridge.
    Send(send::SendArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve::run(args).await,
        Command::Send(args) => send::run(args).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from(["tgrelay", "serve", "--port", "9001", "--log-format", "json"])
            .unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, Some(9001));
    }

    #[test]
    fn parses_send_positionals() {
        let cli = Cli::try_parse_from(["tgrelay", "send", "@bob", "hello there"]).unwrap();
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.target.as_deref(), Some("@bob"));
        assert_eq!(args.text.as_deref(), Some("hello there"));
    }
}
