//! Application configuration

pub mod persona;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use persona::{Greetings, Persona, PersonaError};

use crate::providers::EndpointConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Built-in persona name, used when no persona file is given
    pub persona: String,
    pub persona_file: Option<PathBuf>,
    /// Overrides the persona's endpoint url
    pub endpoint_url: Option<String>,
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            persona: "chat".into(),
            persona_file: None,
            endpoint_url: None,
            data_dir: PathBuf::from("./data"),
            timeout_secs: 60,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match var("PORT") {
            Some(p) => p
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("PORT".into(), p))?,
            None => defaults.port,
        };

        let timeout_secs = match var("CHARLA_TIMEOUT_SECS") {
            Some(t) => match t.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::Invalid("CHARLA_TIMEOUT_SECS".into(), t)),
            },
            None => defaults.timeout_secs,
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            persona: var("CHARLA_PERSONA").unwrap_or(defaults.persona),
            persona_file: var("CHARLA_PERSONA_FILE").map(PathBuf::from),
            endpoint_url: var("CHARLA_ENDPOINT_URL").filter(|u| !u.trim().is_empty()),
            data_dir: var("CHARLA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            timeout_secs,
        })
    }

    /// Resolve the active persona: a persona file wins over the built-in name
    pub async fn load_persona(&self) -> Result<Persona, PersonaError> {
        match &self.persona_file {
            Some(path) => Persona::load_from_file(path).await,
            None => Persona::builtin(&self.persona),
        }
    }

    /// Endpoint settings for the given persona, honoring the url override
    pub fn endpoint(&self, persona: &Persona) -> EndpointConfig {
        let url = self
            .endpoint_url
            .clone()
            .unwrap_or_else(|| persona.endpoint.url.clone());
        EndpointConfig::new(url).with_timeout_secs(self.timeout_secs)
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("charla.db")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.persona, "chat");
        assert_eq!(config.db_path(), PathBuf::from("./data/charla.db"));
        assert!(config.endpoint_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("CHARLA_PERSONA", "mei"),
            ("CHARLA_ENDPOINT_URL", "http://localhost:9000/prompt"),
            ("CHARLA_TIMEOUT_SECS", "5"),
            ("CHARLA_DATA_DIR", "/tmp/charla"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.persona, "mei");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/charla/charla.db"));

        let persona = Persona::builtin(&config.persona).unwrap();
        let endpoint = config.endpoint(&persona);
        assert_eq!(endpoint.url, "http://localhost:9000/prompt");
        assert_eq!(endpoint.timeout_secs, 5);
    }

    #[test]
    fn test_endpoint_defaults_to_persona_url() {
        let config = Config::default();
        let mei = Persona::builtin("mei").unwrap();
        assert_eq!(config.endpoint(&mei).url, persona::builtin::MEI_ENDPOINT);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::Invalid(..))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("CHARLA_TIMEOUT_SECS", "0")])),
            Err(ConfigError::Invalid(..))
        ));
    }

    #[tokio::test]
    async fn test_load_persona_unknown_builtin() {
        let config = Config {
            persona: "pirate".into(),
            ..Config::default()
        };
        assert!(matches!(
            config.load_persona().await,
            Err(PersonaError::NotFound(_))
        ));
    }
}
