use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable holding the service credential
pub const ENV_API_KEY: &str = "FIRECRAWL_API_KEY";

/// Environment variable holding the submission endpoint
pub const ENV_ENDPOINT: &str = "FIRECRAWL_ENDPOINT";

impl Config {
    /// Builds a configuration from defaults and the process environment
    ///
    /// A `.env` file in the working directory is honoured if present.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Defaults overlaid with `FIRECRAWL_API_KEY` / `FIRECRAWL_ENDPOINT`
    /// * `Err(ConfigError)` - The resulting configuration failed validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from defaults and a key lookup, then validates it
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.apply_overrides(lookup);
        validate(&config)?;
        Ok(config)
    }

    /// Overlays credentials and endpoint from a key lookup
    ///
    /// Values found through `lookup` win over values from the file. Empty
    /// values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.service.api_key = Some(key.trim().to_string());
        }
        if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
            self.service.endpoint = endpoint.trim().to_string();
        }
    }
}

/// Loads and parses a configuration file from the given path
///
/// The environment is overlaid on top of the file (see
/// [`Config::apply_overrides`]) before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ember_poll::config::load_config;
///
/// let config = load_config(Path::new("ember.toml")).unwrap();
/// println!("Endpoint: {}", config.service.endpoint);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let mut config: Config = toml::from_str(&content)?;

    // Environment wins over the file
    let _ = dotenvy::dotenv();
    config.apply_overrides(|key| std::env::var(key).ok());

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be tied back to the exact settings it used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
