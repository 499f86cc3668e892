//! Configuration loader with environment variable expansion

use super::{Config, ConfigError};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables.
    ///
    /// Supports two syntaxes:
    /// - `${VAR_NAME}` - keeps the placeholder if the variable is not set
    /// - `${VAR_NAME:-default}` - falls back to `default`
    fn expand_env_vars(content: &str) -> String {
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
            .expect("static regex is valid");

        re.replace_all(content, |cap: &regex_lite::Captures<'_>| {
            match std::env::var(&cap[1]) {
                Ok(value) => value,
                Err(_) => match cap.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => cap[0].to_string(),
                },
            }
        })
        .into_owned()
    }
}
