use serde::Deserialize;
use std::str::FromStr;

/// Which native collaborator `native::connect` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// CUPS or Winspool through the `printers` crate.
    System,
    /// In-memory collaborator.
    Mock,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(Backend::System),
            "mock" => Ok(Backend::Mock),
            other => Err(ConfigError::InvalidBackend {
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrintingConfig {
    pub backend: Backend,
    /// Document name the legacy surface uses when the caller gives none.
    pub default_docname: String,
    /// Document type the legacy `printDirect` uses when the caller gives none.
    pub default_format: String,
}

impl Default for PrintingConfig {
    fn default() -> Self {
        Self {
            backend: Backend::System,
            default_docname: "print job".to_string(),
            default_format: "RAW".to_string(),
        }
    }
}

impl PrintingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let backend = match std::env::var("PRINTING_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        let config = PrintingConfig {
            backend,
            default_docname: std::env::var("PRINTING_DEFAULT_DOCNAME")
                .unwrap_or(defaults.default_docname),
            default_format: std::env::var("PRINTING_DEFAULT_FORMAT")
                .map(|f| f.trim().to_uppercase())
                .unwrap_or(defaults.default_format),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_format.is_empty() {
            return Err(ConfigError::EmptyFormat);
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid printing backend: {value}")]
    InvalidBackend { value: String },

    #[error("Default print format must not be empty")]
    EmptyFormat,
}
