//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use chartbump_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid arguments or options
    #[error("Invalid usage: {message}")]
    #[diagnostic(code(chartbump::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A version was required by policy but none was given
    #[error("Missing parameter: {param}")]
    #[diagnostic(code(chartbump::cli::missing_version))]
    MissingVersion {
        param: String,
        #[help]
        help: String,
    },

    /// No image reference matched the requested images
    #[error("No image tags found in {file}")]
    #[diagnostic(
        code(chartbump::cli::no_match),
        help("check the --image list, or pass --error-no-tags false to allow this")
    )]
    NoMatchFound { file: String },

    /// Matching image references were all already at the desired version
    #[error("{found} image tag(s) found, all already at {version}")]
    #[diagnostic(code(chartbump::cli::no_change))]
    NoChangeNeeded { found: usize, version: String },

    /// Nothing changed in chart, app or image versions
    #[error("No changes found in chart, app or image versions")]
    #[diagnostic(code(chartbump::cli::no_release))]
    NoRelease,

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartbump::cli::io))]
    Io { message: String },

    /// YAML could not be parsed or rewritten
    #[error("Document error: {message}")]
    #[diagnostic(code(chartbump::cli::document))]
    Document {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Internal error (unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartbump::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } | CliError::MissingVersion { .. } => exit_codes::USAGE_ERROR,
            CliError::NoMatchFound { .. } => exit_codes::NO_MATCH,
            CliError::NoChangeNeeded { .. } | CliError::NoRelease => exit_codes::NO_CHANGE,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Document { .. } => exit_codes::DOCUMENT_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create a usage error with help text
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a missing-version error for a `--<param>` option
    pub fn missing_version(param: &str) -> Self {
        let env = format!("PLUGIN_{}", param.to_uppercase().replace('-', "_"));
        Self::MissingVersion {
            param: param.to_string(),
            help: format!("pass --{param} or --{param}-file, or set {env}"),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Io { .. } => CliError::Io {
                message: err.to_string(),
            },
            CoreError::NoImages => CliError::usage_with_help(
                err.to_string(),
                "pass a comma separated list, e.g. --image 'app,registry.io/worker'",
            ),
            CoreError::UnsupportedEdit { .. } => CliError::Document {
                message: err.to_string(),
                help: Some("rewrite the value as a plain or quoted scalar on a single line".into()),
            },
            CoreError::Parse { .. } | CoreError::NotAMapping | CoreError::NotAScalar { .. } => {
                CliError::Document {
                    message: err.to_string(),
                    help: None,
                }
            }
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::usage_with_help("bad", "try again").exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(
            CliError::missing_version("chart-version").exit_code(),
            exit_codes::USAGE_ERROR
        );
        assert_eq!(
            CliError::NoMatchFound {
                file: "values.yaml".into()
            }
            .exit_code(),
            exit_codes::NO_MATCH
        );
        assert_eq!(CliError::NoRelease.exit_code(), exit_codes::NO_CHANGE);
        assert_eq!(CliError::internal("boom").exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_missing_version_env_name() {
        match CliError::missing_version("image-version") {
            CliError::MissingVersion { help, .. } => assert_eq!(
                help,
                "pass --image-version or --image-version-file, or set PLUGIN_IMAGE_VERSION"
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_core_errors_map_to_exit_codes() {
        assert_eq!(CliError::from(CoreError::NoImages).exit_code(), exit_codes::USAGE_ERROR);
        assert_eq!(
            CliError::from(CoreError::NotAMapping).exit_code(),
            exit_codes::DOCUMENT_ERROR
        );
        let io = CoreError::Io {
            path: "Chart.yaml".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(CliError::from(io).exit_code(), exit_codes::IO_ERROR);
    }
}
