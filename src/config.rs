use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;
use crate::error::ConfigError;
use crate::template::{ConditionScope, RenderOptions};


/// Application settings, read from a YAML file.
///
/// ```yaml
/// templates: demos/templates
/// condition_scope: enclosing
/// log: info
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory templates are loaded from.
    pub templates: PathBuf,
    pub condition_scope: ConditionScope,
    /// Default `tracing` filter directive, overridden by `RUST_LOG`.
    pub log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            templates: PathBuf::from("templates"),
            condition_scope: ConditionScope::default(),
            log: "info".to_owned(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Config::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // an empty file deserializes as null
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        Ok(serde_yaml::from_str::<Config>(text)?)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            condition_scope: self.condition_scope,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let config = Config::from_yaml(
            "templates: site/templates\ncondition_scope: iteration\nlog: debug\n"
        ).unwrap();
        assert_eq!(config.templates, PathBuf::from("site/templates"));
        assert_eq!(config.condition_scope, ConditionScope::Iteration);
        assert_eq!(config.log, "debug");
        assert_eq!(config.render_options().condition_scope, ConditionScope::Iteration);
    }

    #[test]
    fn missing_fields_default() {
        let config = Config::from_yaml("log: warn\n").unwrap();
        assert_eq!(config.templates, PathBuf::from("templates"));
        assert_eq!(config.condition_scope, ConditionScope::Enclosing);
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_yaml("condition_scope: sometimes\n"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::from_yaml("port: 8000\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
