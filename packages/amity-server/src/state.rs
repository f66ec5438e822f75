//! Server state.
//!
//! One [`AmityCore`] shared by every handler, plus the HTTP-only settings
//! the core never sees (CORS origin and upload limit).

use std::sync::Arc;

use amity_core::{AmityCore, CoreConfig};

/// Default upload ceiling in MiB.
const DEFAULT_MAX_UPLOAD_MB: usize = 1000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Origin allowed to make credentialed cross-site requests
    pub allowed_origin: String,
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            allowed_origin: "http://localhost:5173".to_string(),
            max_upload_mb: DEFAULT_MAX_UPLOAD_MB,
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub core: AmityCore,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(core: AmityCore, config: ServerConfig) -> Self {
        Self {
            core,
            config: Arc::new(config),
        }
    }

    /// Fully in-memory state for handler tests.
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        let core = AmityCore::open(CoreConfig::default())
            .await
            .expect("in-memory core");
        Self::new(core, ServerConfig::default())
    }

    /// Open the core described by `core_config`.
    pub async fn open(core_config: CoreConfig, config: ServerConfig) -> amity_core::Result<Self> {
        let core = AmityCore::open(core_config).await?;
        Ok(Self::new(core, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_upload_mb, 1000);
        assert_eq!(config.max_upload_bytes(), 1000 * 1024 * 1024);
    }
}
