//! `mdexport serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use mdexport_config::{CliSettings, Config};
use mdexport_core::format_bytes;
use mdexport_server::run_server;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover mdexport.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Reject mutating requests without an Origin header.
    #[arg(long)]
    production: bool,

    /// Chrome/Chromium executable for PDF export (overrides config).
    #[arg(long, env = "MDEXPORT_CHROME")]
    chrome_path: Option<PathBuf>,

    /// Enable verbose output (request and export logs).
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            production: self.production.then_some(true),
            chrome_path: self.chrome_path,
            pdf_timeout_secs: None,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.banner(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        output.info(&format!(
            "Limits: PDF {}, other formats {}",
            format_bytes(config.limits.pdf_max_bytes),
            format_bytes(config.limits.max_bytes)
        ));
        if config.rate_limit.enabled {
            output.info(&format!(
                "PDF rate limit: {} requests per {}s",
                config.rate_limit.pdf_requests, config.rate_limit.window_secs
            ));
        } else {
            output.warning("PDF rate limit: disabled");
        }
        if config.server.production {
            output.info("Production mode: requests must carry an allowed Origin");
        } else if config.security.allowed_origins.is_empty() {
            output.warning("No allowed origins configured; cross-origin requests are rejected");
        }

        run_server(&config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
