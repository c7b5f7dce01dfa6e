use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Configuration loading errors
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    #[diagnostic(code(config::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    #[diagnostic(code(config::parse), help("config files are TOML; every section is optional"))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value:?}")]
    #[diagnostic(code(config::invalid_value))]
    InvalidValue { var: &'static str, value: String },
}
