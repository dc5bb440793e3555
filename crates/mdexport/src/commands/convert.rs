//! `mdexport convert` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use mdexport_config::{CliSettings, Config};
use mdexport_core::{
    Converter, DocumentSource, ExportFormat, ExportOutcome, Orchestrator, TracingTelemetry,
};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Markdown file to convert (.md, .markdown or .txt).
    input: PathBuf,

    /// Output format: pdf, docx, html or txt.
    #[arg(short, long, default_value = "pdf")]
    format: ExportFormat,

    /// Output file (default: input path with the format's extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover mdexport.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chrome/Chromium executable for PDF export (overrides config).
    #[arg(long, env = "MDEXPORT_CHROME")]
    chrome_path: Option<PathBuf>,

    /// PDF time budget in seconds (overrides config).
    #[arg(long)]
    timeout: Option<u64>,

    /// Enable verbose output.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or validated, the
    /// conversion fails, or the output cannot be written.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            chrome_path: self.chrome_path,
            pdf_timeout_secs: self.timeout,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let target = match self.output {
            Some(path) => path,
            None => default_output(&self.input, self.format)?,
        };

        let name = self
            .input
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                CliError::Validation(format!("Invalid input path: {}", self.input.display()))
            })?;
        let bytes = std::fs::read(&self.input)?;
        let source = DocumentSource::from_file(name, bytes)?;

        let orchestrator = Orchestrator::new(
            Arc::new(Converter::from_config(&config)),
            Arc::new(TracingTelemetry),
        );
        orchestrator.load(source);

        let artifact = match orchestrator.export(self.format).await {
            ExportOutcome::Completed(artifact) => artifact,
            ExportOutcome::Failed(error) => return Err(error.into()),
            ExportOutcome::Stale | ExportOutcome::NotReady => {
                return Err(CliError::Validation("Export did not run".to_owned()));
            }
        };

        output.parse_warnings(&artifact.warnings);

        std::fs::write(&target, &artifact.bytes)?;
        output.written(&target, artifact.bytes.len());

        Ok(())
    }
}

/// Input path with the format's extension. Refuses to overwrite the input.
fn default_output(input: &Path, format: ExportFormat) -> Result<PathBuf, CliError> {
    let target = input.with_extension(format.extension());
    if target == input {
        return Err(CliError::Validation(format!(
            "Output would overwrite {}; pass --output",
            input.display()
        )));
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(input: PathBuf, format: ExportFormat, output: Option<PathBuf>) -> ConvertArgs {
        ConvertArgs {
            input,
            format,
            output,
            config: None,
            chrome_path: None,
            timeout: None,
            verbose: false,
        }
    }

    #[test]
    fn test_default_output_swaps_extension() {
        assert_eq!(
            default_output(Path::new("docs/guide.md"), ExportFormat::Docx).unwrap(),
            PathBuf::from("docs/guide.docx")
        );
    }

    #[test]
    fn test_default_output_refuses_to_overwrite_input() {
        let result = default_output(Path::new("notes.txt"), ExportFormat::Txt);
        assert!(matches!(result, Err(CliError::Validation(_))));
    }

    #[tokio::test]
    async fn test_convert_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("guide.md");
        std::fs::write(&input, "# Guide\n\n- [x] done\n").unwrap();

        args(input, ExportFormat::Txt, None).execute().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("guide.txt")).unwrap();
        assert_eq!(written, "Guide\n\n- [x] done\n");
    }

    #[tokio::test]
    async fn test_convert_to_explicit_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("guide.md");
        let target = dir.path().join("out.html");
        std::fs::write(&input, "# Guide").unwrap();

        args(input, ExportFormat::Html, Some(target.clone()))
            .execute()
            .await
            .unwrap();

        let html = std::fs::read_to_string(target).unwrap();
        assert!(html.contains("<title>Guide</title>"));
    }

    #[tokio::test]
    async fn test_convert_rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("image.png");
        std::fs::write(&input, "not markdown").unwrap();

        let result = args(input, ExportFormat::Txt, None).execute().await;

        assert!(matches!(
            result,
            Err(CliError::Convert(mdexport_core::ConvertError::InvalidInputType(_)))
        ));
    }
}
