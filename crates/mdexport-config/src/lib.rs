//! Configuration management for mdexport.
//!
//! Parses `mdexport.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `pdf.chrome_path`
//! - `security.allowed_origins`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override production mode.
    pub production: Option<bool>,
    /// Override the Chrome/Chromium executable.
    pub chrome_path: Option<PathBuf>,
    /// Override the PDF engine time budget.
    pub pdf_timeout_secs: Option<u64>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdexport.toml";

/// Largest PDF input accepted by default (1 MiB).
pub const DEFAULT_PDF_MAX_BYTES: usize = 1024 * 1024;

/// Largest DOCX/HTML/TXT input accepted by default (5 MiB).
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Input size ceilings.
    pub limits: LimitsConfig,
    /// PDF engine configuration (paths are relative strings from TOML).
    pdf: PdfConfigRaw,
    /// Rate limiting for the PDF endpoint.
    pub rate_limit: RateLimitConfig,
    /// Origin allow-list.
    pub security: SecurityConfig,

    /// Resolved PDF configuration (set after loading).
    #[serde(skip)]
    pub pdf_resolved: PdfConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            limits: LimitsConfig::default(),
            pdf: PdfConfigRaw::default(),
            rate_limit: RateLimitConfig::default(),
            security: SecurityConfig::default(),
            pdf_resolved: PdfConfig::default(),
            config_path: None,
        }
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Production mode: requests without an `Origin` are rejected.
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 7980,
            production: false,
        }
    }
}

/// Input size ceilings, one per export format family.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum Markdown bytes accepted for PDF export.
    pub pdf_max_bytes: usize,
    /// Maximum Markdown bytes accepted for DOCX, HTML and text export.
    pub max_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            pdf_max_bytes: DEFAULT_PDF_MAX_BYTES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// Paper size used for PDF output.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Paper {
    /// ISO A4 (210 x 297 mm).
    #[default]
    A4,
    /// US Letter (8.5 x 11 in).
    Letter,
}

/// Raw PDF configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PdfConfigRaw {
    chrome_path: Option<String>,
    timeout_secs: Option<u64>,
    paper: Option<Paper>,
    margin_mm: Option<f64>,
    sandbox: Option<bool>,
}

/// Resolved PDF engine configuration.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Chrome/Chromium executable (`None` lets the engine auto-detect).
    pub chrome_path: Option<PathBuf>,
    /// Time budget for a single PDF print.
    pub timeout: Duration,
    /// Paper size.
    pub paper: Paper,
    /// Page margin on every side, in millimetres.
    pub margin_mm: f64,
    /// Run the browser with its sandbox enabled.
    pub sandbox: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            timeout: Duration::from_secs(30),
            paper: Paper::A4,
            margin_mm: 20.0,
            sandbox: true,
        }
    }
}

/// Rate limiting configuration for the PDF endpoint.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enforced.
    pub enabled: bool,
    /// Requests allowed per client address per window.
    pub pdf_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitConfig {
    /// Window length as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pdf_requests: 10,
            window_secs: 60,
        }
    }
}

/// Origin validation configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SecurityConfig {
    /// Origins allowed to issue conversion requests (e.g. `https://example.com`).
    pub allowed_origins: Vec<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`pdf.chrome_path`").
        field: String,
        /// Error message (e.g., "${`CHROME`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require an origin to use http:// or https:// and carry no path.
fn require_origin(origin: &str, field: &str) -> Result<(), ConfigError> {
    let rest = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
        .ok_or_else(|| {
            ConfigError::Validation(format!("{field} must start with http:// or https://"))
        })?;
    if rest.is_empty() || rest.contains('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must be a bare origin like https://example.com, got {origin}"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdexport.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading, allowing CLI arguments to take
    /// precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(production) = settings.production {
            self.server.production = production;
        }
        if let Some(chrome_path) = &settings.chrome_path {
            self.pdf_resolved.chrome_path = Some(chrome_path.clone());
        }
        if let Some(secs) = settings.pdf_timeout_secs {
            self.pdf_resolved.timeout = Duration::from_secs(secs);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_pdf(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_limits()?;
        self.validate_pdf()?;
        self.validate_rate_limit()?;
        for origin in &self.security.allowed_origins {
            require_origin(origin, "security.allowed_origins")?;
        }
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        if self.limits.pdf_max_bytes == 0 || self.limits.max_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_pdf(&self) -> Result<(), ConfigError> {
        const MAX_MARGIN_MM: f64 = 100.0;

        if self.pdf_resolved.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "pdf.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        let margin = self.pdf_resolved.margin_mm;
        if !(0.0..=MAX_MARGIN_MM).contains(&margin) {
            return Err(ConfigError::Validation(format!(
                "pdf.margin_mm must be between 0 and {MAX_MARGIN_MM}"
            )));
        }
        Ok(())
    }

    fn validate_rate_limit(&self) -> Result<(), ConfigError> {
        if !self.rate_limit.enabled {
            return Ok(());
        }
        if self.rate_limit.pdf_requests == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.pdf_requests must be greater than 0".to_owned(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Validation(
                "rate_limit.window_secs must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.pdf.chrome_path =
            expand::expand_env_opt(self.pdf.chrome_path.as_deref(), "pdf.chrome_path")?;
        for origin in &mut self.security.allowed_origins {
            *origin = expand::expand_env(origin, "security.allowed_origins")?;
        }
        Ok(())
    }

    /// Resolve the raw `[pdf]` section, making a relative `chrome_path`
    /// absolute against the config directory.
    fn resolve_pdf(&mut self, config_dir: &Path) {
        let defaults = PdfConfig::default();
        let chrome_path = self.pdf.chrome_path.as_deref().map(|p| {
            let path = Path::new(p);
            if path.is_relative() && p.contains(std::path::MAIN_SEPARATOR) {
                config_dir.join(path)
            } else {
                path.to_path_buf()
            }
        });

        self.pdf_resolved = PdfConfig {
            chrome_path,
            timeout: self
                .pdf
                .timeout_secs
                .map_or(defaults.timeout, Duration::from_secs),
            paper: self.pdf.paper.unwrap_or(defaults.paper),
            margin_mm: self.pdf.margin_mm.unwrap_or(defaults.margin_mm),
            sandbox: self.pdf.sandbox.unwrap_or(defaults.sandbox),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(toml: &str) -> Config {
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_pdf(Path::new("/project"));
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7980);
        assert!(!config.server.production);
        assert_eq!(config.limits.pdf_max_bytes, 1024 * 1024);
        assert_eq!(config.limits.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.pdf_resolved.timeout, Duration::from_secs(30));
        assert_eq!(config.pdf_resolved.paper, Paper::A4);
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.pdf_requests, 10);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
        assert!(config.security.allowed_origins.is_empty());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config = parse("");
        assert_eq!(config.server.port, 7980);
        assert!(config.pdf_resolved.chrome_path.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let config = parse(
            r#"
[server]
host = "0.0.0.0"
port = 9000
production = true

[limits]
pdf_max_bytes = 2048
max_bytes = 4096

[pdf]
chrome_path = "bin/chromium"
timeout_secs = 12
paper = "letter"
margin_mm = 15.5
sandbox = false

[rate_limit]
pdf_requests = 3
window_secs = 30

[security]
allowed_origins = ["https://example.com", "http://localhost:3000"]
"#,
        );

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert!(config.server.production);
        assert_eq!(config.limits.pdf_max_bytes, 2048);
        assert_eq!(config.limits.max_bytes, 4096);
        assert_eq!(
            config.pdf_resolved.chrome_path,
            Some(PathBuf::from("/project/bin/chromium"))
        );
        assert_eq!(config.pdf_resolved.timeout, Duration::from_secs(12));
        assert_eq!(config.pdf_resolved.paper, Paper::Letter);
        assert!((config.pdf_resolved.margin_mm - 15.5).abs() < f64::EPSILON);
        assert!(!config.pdf_resolved.sandbox);
        assert_eq!(config.rate_limit.pdf_requests, 3);
        assert_eq!(
            config.security.allowed_origins,
            vec![
                "https://example.com".to_owned(),
                "http://localhost:3000".to_owned()
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bare_chrome_name_not_resolved() {
        let config = parse("[pdf]\nchrome_path = \"chromium\"\n");
        assert_eq!(
            config.pdf_resolved.chrome_path,
            Some(PathBuf::from("chromium"))
        );
    }

    #[test]
    fn test_unknown_paper_rejected() {
        let result: Result<Config, _> = toml::from_str("[pdf]\npaper = \"a3\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdexport.toml");
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/mdexport.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_file_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdexport.toml");
        std::fs::write(&path, "[limits]\npdf_max_bytes = 0\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            host: Some("0.0.0.0".to_owned()),
            port: Some(9999),
            production: Some(true),
            chrome_path: Some(PathBuf::from("/opt/chrome")),
            pdf_timeout_secs: Some(5),
        });

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9999);
        assert!(config.server.production);
        assert_eq!(
            config.pdf_resolved.chrome_path,
            Some(PathBuf::from("/opt/chrome"))
        );
        assert_eq!(config.pdf_resolved.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings::default());
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 7980);
    }

    #[test]
    fn test_expand_env_vars_chrome_path() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDEXPORT_TEST_CHROME", "/usr/bin/chromium");
        }
        let mut config: Config =
            toml::from_str("[pdf]\nchrome_path = \"${MDEXPORT_TEST_CHROME}\"\n").unwrap();
        config.expand_env_vars().unwrap();
        config.resolve_pdf(Path::new("/project"));
        assert_eq!(
            config.pdf_resolved.chrome_path,
            Some(PathBuf::from("/usr/bin/chromium"))
        );
        unsafe {
            std::env::remove_var("MDEXPORT_TEST_CHROME");
        }
    }

    #[test]
    fn test_validate_server_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.pdf_resolved.timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("pdf.timeout_secs"));
    }

    #[test]
    fn test_validate_margin_out_of_range() {
        let mut config = Config::default();
        config.pdf_resolved.margin_mm = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rate_limit_zero_requests() {
        let mut config = Config::default();
        config.rate_limit.pdf_requests = 0;
        assert!(config.validate().is_err());

        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_origin_with_path_rejected() {
        let mut config = Config::default();
        config.security.allowed_origins = vec!["https://example.com/app".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bare origin"));
    }

    #[test]
    fn test_validate_origin_without_scheme_rejected() {
        let mut config = Config::default();
        config.security.allowed_origins = vec!["example.com".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }
}
