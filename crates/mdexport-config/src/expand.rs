//! Environment variable expansion for configuration strings.
//!
//! Supports:
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

use crate::ConfigError;

/// Expand environment variable references in a string.
///
/// Returns the original string unchanged if no `${}` patterns are present.
/// Bare `$VAR` syntax is not expanded (only `${VAR}` with braces).
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, UnsetVar> {
        std::env::var(var)
            .map(Some)
            .map_err(|_| UnsetVar(var.to_owned()))
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

/// Expand an optional value, leaving `None` untouched.
pub(crate) fn expand_env_opt(
    value: Option<&str>,
    field: &str,
) -> Result<Option<String>, ConfigError> {
    value.map(|v| expand_env(v, field)).transpose()
}

/// Name of the variable that failed lookup.
struct UnsetVar(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_simple_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDEXPORT_TEST_SIMPLE", "chrome");
        }
        let result = expand_env("${MDEXPORT_TEST_SIMPLE}", "pdf.chrome_path").unwrap();
        assert_eq!(result, "chrome");
        unsafe {
            std::env::remove_var("MDEXPORT_TEST_SIMPLE");
        }
    }

    #[test]
    fn test_expand_default_used_when_unset() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDEXPORT_TEST_UNSET");
        }
        let result = expand_env("${MDEXPORT_TEST_UNSET:-0.0.0.0}", "server.host").unwrap();
        assert_eq!(result, "0.0.0.0");
    }

    #[test]
    fn test_expand_missing_var_names_field() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDEXPORT_TEST_MISSING");
        }
        let err = expand_env("${MDEXPORT_TEST_MISSING}", "server.host").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MDEXPORT_TEST_MISSING"));
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_expand_literal_unchanged() {
        assert_eq!(expand_env("/usr/bin/chromium", "f").unwrap(), "/usr/bin/chromium");
        assert_eq!(expand_env("$HOME", "f").unwrap(), "$HOME");
    }

    #[test]
    fn test_expand_opt_none() {
        assert_eq!(expand_env_opt(None, "pdf.chrome_path").unwrap(), None);
    }
}
