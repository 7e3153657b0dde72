//! Declarative configuration surface, loaded the way the teacher loads
//! its own settings: plain `std::env::var` reads (via `dotenvy` for
//! local `.env` files), parsed into a typed, immutable struct once at
//! startup and handed around as an `Arc`.

use bot_detect_cluster::ClusterConfig;
use bot_detect_coordinator::CoordinatorConfig;
use bot_detect_reputation::ReputationConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IDENTITY_HASH_SALT is required outside development")]
    MissingIdentitySalt,
    #[error("invalid PATH_POLICY_MAP entry '{0}', expected pattern=policy_name")]
    InvalidPathPolicyEntry(String),
}

#[derive(Debug, Clone)]
pub struct PathPolicyEntry {
    pub pattern: String,
    pub policy_name: String,
}

/// Everything the orchestrator and its collaborators need, resolved
/// once at process start. Config objects are immutable after load;
/// a hot reload constructs a fresh one and swaps the `Arc` atomically.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub identity_salt: String,
    pub default_policy_name: String,
    pub path_policy_map: Vec<PathPolicyEntry>,
    pub max_parallelism: usize,
    pub coordinator: CoordinatorConfig,
    pub cluster: ClusterConfig,
    pub reputation: ReputationConfig,
}

impl EngineConfig {
    /// Loads from environment, falling back to development defaults
    /// where the teacher's own `main()` falls back (e.g. `PORT`). Fails
    /// only on `IDENTITY_HASH_SALT` missing in a non-dev environment,
    /// or a malformed `PATH_POLICY_MAP` entry.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let identity_salt = match std::env::var("IDENTITY_HASH_SALT") {
            Ok(salt) if !salt.is_empty() => salt,
            _ if environment == "development" => {
                tracing::warn!("IDENTITY_HASH_SALT unset, using an insecure development default");
                "dev-insecure-salt".to_string()
            }
            _ => return Err(ConfigError::MissingIdentitySalt),
        };

        let default_policy_name = std::env::var("DEFAULT_POLICY_NAME").unwrap_or_else(|_| "default".to_string());

        let path_policy_map = match std::env::var("PATH_POLICY_MAP") {
            Ok(raw) if !raw.is_empty() => Self::parse_path_policy_map(&raw)?,
            _ => Vec::new(),
        };

        let max_parallelism = std::env::var("MAX_DETECTOR_PARALLELISM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(num_cpus::get);

        Ok(Self {
            identity_salt,
            default_policy_name,
            path_policy_map,
            max_parallelism,
            coordinator: CoordinatorConfig::default(),
            cluster: ClusterConfig::default(),
            reputation: ReputationConfig::default(),
        })
    }

    fn parse_path_policy_map(raw: &str) -> Result<Vec<PathPolicyEntry>, ConfigError> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|entry| {
                entry
                    .split_once('=')
                    .map(|(pattern, policy_name)| PathPolicyEntry {
                        pattern: pattern.trim().to_string(),
                        policy_name: policy_name.trim().to_string(),
                    })
                    .ok_or_else(|| ConfigError::InvalidPathPolicyEntry(entry.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_path_policy_map() {
        let parsed = EngineConfig::parse_path_policy_map("/api/**=strict, /static/*=relaxed").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].pattern, "/api/**");
        assert_eq!(parsed[0].policy_name, "strict");
    }

    #[test]
    fn rejects_an_entry_missing_equals() {
        assert!(EngineConfig::parse_path_policy_map("not-an-entry").is_err());
    }
}
