mod loader;
pub mod secrets;
pub mod settings;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use secrets::{DefaultSecretResolver, SecretResolver};
pub use settings::{ApiSettings, CacheSettings, ClientSettings, HostedImage, MediaSettings};
pub use value::{ConfigValue, FromConfigValue};

/// Error type for configuration operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The requested key was not found in the configuration.
    NotFound(String),
    /// The value could not be converted to the requested type.
    TypeMismatch { key: String, expected: &'static str },
    /// An I/O or YAML parsing error occurred while loading config files.
    Load(String),
    /// The value has the right type but is not acceptable.
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "Config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "Config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid config value for '{key}': {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Environment variable selecting the active profile.
pub const PROFILE_ENV: &str = "SCHOLARSTREAM_PROFILE";

/// Client configuration loaded from YAML files, `.env` files, and environment variables.
///
/// Resolution order (lowest to highest priority):
/// 1. `scholarstream.yaml` (base)
/// 2. `scholarstream-{profile}.yaml` (profile override)
/// 3. `.env` file (loaded into process environment)
/// 4. `.env.{profile}` file (loaded into process environment)
/// 5. Environment variables (`SCHOLARSTREAM_API_URL` overrides `scholarstream.api.url`)
///
/// `.env` files never overwrite already-set environment variables.
///
/// Profile is determined by: `SCHOLARSTREAM_PROFILE` env var > argument > default `"dev"`.
#[derive(Debug, Clone)]
pub struct ScholarConfig {
    values: HashMap<String, ConfigValue>,
    profile: String,
}

impl ScholarConfig {
    /// Load configuration for the given profile from the current directory.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        Self::load_from(Path::new("."), profile, &DefaultSecretResolver)
    }

    /// Load configuration for the given profile from `dir`, resolving
    /// `${...}` placeholders with `resolver`.
    pub fn load_from(
        dir: &Path,
        profile: &str,
        resolver: &dyn SecretResolver,
    ) -> Result<Self, ConfigError> {
        let active_profile = std::env::var(PROFILE_ENV).unwrap_or_else(|_| profile.to_string());

        let mut values = HashMap::new();

        loader::load_yaml_file(&dir.join("scholarstream.yaml"), &mut values)?;
        loader::load_yaml_file(
            &dir.join(format!("scholarstream-{active_profile}.yaml")),
            &mut values,
        )?;

        let _ = dotenvy::from_path(dir.join(".env"));
        let _ = dotenvy::from_path(dir.join(format!(".env.{active_profile}")));

        resolve_string_values(&mut values, resolver)?;

        // Convention: `scholarstream.api.url` <-> `SCHOLARSTREAM_API_URL`
        for (env_key, env_val) in std::env::vars() {
            if env_key == PROFILE_ENV {
                continue;
            }
            let config_key = env_key.to_lowercase().replace('_', ".");
            values.insert(config_key, ConfigValue::String(env_val));
        }

        tracing::debug!(profile = %active_profile, keys = values.len(), "Configuration loaded");

        Ok(ScholarConfig {
            values,
            profile: active_profile,
        })
    }

    /// Create a config from a YAML string.
    pub fn from_yaml_str(yaml: &str, profile: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_str(yaml, &mut values)?;
        Ok(ScholarConfig {
            values,
            profile: profile.to_string(),
        })
    }

    /// Create an empty config.
    pub fn empty() -> Self {
        ScholarConfig {
            values: HashMap::new(),
            profile: "test".to_string(),
        }
    }

    /// Set a value programmatically.
    pub fn set(&mut self, key: &str, value: ConfigValue) {
        self.values.insert(key.to_string(), value);
    }

    /// Get a typed value for the given dot-separated key.
    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    /// Get a typed value, returning `None` if the key is missing.
    ///
    /// A present value of the wrong type is still an error.
    pub fn get_opt<V: FromConfigValue>(&self, key: &str) -> Result<Option<V>, ConfigError> {
        match self.values.get(key) {
            None | Some(ConfigValue::Null) => Ok(None),
            Some(value) => V::from_config_value(value, key).map(Some),
        }
    }

    /// Get a typed value, returning a default if the key is missing.
    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// The active profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }
}

fn resolve_string_values(
    values: &mut HashMap<String, ConfigValue>,
    resolver: &dyn SecretResolver,
) -> Result<(), ConfigError> {
    let keys: Vec<String> = values.keys().cloned().collect();
    for key in keys {
        if let Some(ConfigValue::String(s)) = values.get(&key) {
            if s.contains("${") {
                let resolved = secrets::resolve_placeholders(s, resolver)?;
                values.insert(key, ConfigValue::String(resolved));
            }
        }
    }
    Ok(())
}
