//! mdexport CLI - Markdown export.
//!
//! Provides commands for:
//! - `serve`: Start the conversion server
//! - `convert`: Convert a Markdown file to PDF, DOCX, HTML or text

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConvertArgs, ServeArgs};
use output::Output;

/// mdexport - Markdown to PDF, DOCX, HTML and text.
#[derive(Parser)]
#[command(name = "mdexport", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the conversion server.
    Serve(ServeArgs),
    /// Convert a Markdown file.
    Convert(ConvertArgs),
}

impl Cli {
    /// Whether the chosen subcommand was given `--verbose`.
    fn verbose(&self) -> bool {
        match &self.command {
            Commands::Serve(args) => args.verbose,
            Commands::Convert(args) => args.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            output.error(&format!("Error: failed to create tokio runtime: {err}"));
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve(args) => rt.block_on(args.execute()),
        Commands::Convert(args) => rt.block_on(args.execute()),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_flag_per_subcommand() {
        let cli = Cli::try_parse_from(["mdexport", "convert", "guide.md", "-v"]).unwrap();
        assert!(cli.verbose());

        let cli = Cli::try_parse_from(["mdexport", "serve", "--port", "8080"]).unwrap();
        assert!(!cli.verbose());

        let cli = Cli::try_parse_from(["mdexport", "serve", "--verbose"]).unwrap();
        assert!(cli.verbose());
    }
}
