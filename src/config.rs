use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for halal-sync
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HalalSyncConfig {
    /// Form provider credentials and target form
    pub formapi: FormApiConfig,
    /// Certification portal endpoint and token
    pub certportal: CertPortalConfig,
    /// Local storage locations
    pub storage: StorageConfig,
    /// Reconciliation settings
    pub sync: SyncConfig,
    /// Log level
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormApiConfig {
    pub base_url: String,
    /// API key (can be set via env var)
    pub api_key: Option<String>,
    pub form_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertPortalConfig {
    pub base_url: String,
    /// Bearer token (can be set via env var)
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory for submission records
    pub data_dir: String,
    /// Root directory for submission attachments
    pub files_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Advisory lock stamp file
    pub lock_path: String,
    /// Staleness cap for a crashed holder, in minutes
    pub lock_ttl_minutes: i64,
}

impl Default for HalalSyncConfig {
    fn default() -> Self {
        Self {
            formapi: FormApiConfig {
                base_url: "https://api.jotform.com".to_string(),
                api_key: None,
                form_id: String::new(),
            },
            certportal: CertPortalConfig {
                base_url: "https://ptsp.halal.go.id/api/v1".to_string(),
                token: None,
            },
            storage: StorageConfig {
                data_dir: ".halal-sync/submissions".to_string(),
                files_dir: ".halal-sync/files".to_string(),
            },
            sync: SyncConfig {
                lock_path: ".halal-sync/sync.lock".to_string(),
                lock_ttl_minutes: 10,
            },
            log_level: "info".to_string(),
        }
    }
}

impl HalalSyncConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (halal-sync.toml)
    /// 3. Environment variables (prefixed with HALAL_SYNC_)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&HalalSyncConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("halal-sync.toml").exists() {
            builder = builder.add_source(File::with_name("halal-sync"));
        }

        builder = builder.add_source(
            Environment::with_prefix("HALAL_SYNC")
                .separator("_")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let mut loaded: HalalSyncConfig = config.try_deserialize()?;

        // Credentials are usually injected via bare env vars by the host.
        if loaded.certportal.token.is_none() {
            if let Ok(token) = std::env::var("CERTPORTAL_TOKEN") {
                loaded.certportal.token = Some(token);
            }
        }
        if loaded.formapi.api_key.is_none() {
            if let Ok(key) = std::env::var("FORMAPI_KEY") {
                loaded.formapi.api_key = Some(key);
            }
        }

        Ok(loaded)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<HalalSyncConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = HalalSyncConfig::load_env_file();
        HalalSyncConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static HalalSyncConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = HalalSyncConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: HalalSyncConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.sync.lock_ttl_minutes, 10);
        assert_eq!(parsed.storage.data_dir, ".halal-sync/submissions");
    }
}
