//! Startup configuration from environment variables.

use respond_store::{
    ActionStore, InMemoryActionStore, RestActionStore, SqliteActionStore, StoreError,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid RESPOND_LISTEN address: {0}")]
    Listen(#[from] std::net::AddrParseError),
    #[error("unknown RESPOND_STORE '{0}' (expected memory, sqlite or rest)")]
    UnknownStore(String),
    #[error("{0} must be set when RESPOND_STORE={1}")]
    Missing(&'static str, &'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Backing store selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite(PathBuf),
    Rest {
        url: String,
        api_key: Option<String>,
        table: Option<String>,
    },
}

impl StoreKind {
    pub fn name(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Sqlite(_) => "sqlite",
            StoreKind::Rest { .. } => "rest",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub listen: SocketAddr,
    /// Path segment guarding the admin routes. Unset disables them.
    pub admin_secret: Option<String>,
    pub store: StoreKind,
}

impl ApiConfig {
    /// RESPOND_LISTEN (default 0.0.0.0:8002), RESPOND_ADMIN_SECRET, RESPOND_STORE
    /// (memory | sqlite | rest), RESPOND_SQLITE_PATH, RESPOND_REST_URL, RESPOND_REST_KEY,
    /// RESPOND_TABLE.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let listen = var("RESPOND_LISTEN")
            .unwrap_or_else(|| "0.0.0.0:8002".to_string())
            .parse()?;
        let store = match var("RESPOND_STORE").as_deref().unwrap_or("memory") {
            "memory" => StoreKind::Memory,
            "sqlite" => StoreKind::Sqlite(
                var("RESPOND_SQLITE_PATH")
                    .ok_or(ConfigError::Missing("RESPOND_SQLITE_PATH", "sqlite"))?
                    .into(),
            ),
            "rest" => StoreKind::Rest {
                url: var("RESPOND_REST_URL").ok_or(ConfigError::Missing("RESPOND_REST_URL", "rest"))?,
                api_key: var("RESPOND_REST_KEY"),
                table: var("RESPOND_TABLE"),
            },
            other => return Err(ConfigError::UnknownStore(other.to_string())),
        };
        Ok(Self {
            listen,
            admin_secret: var("RESPOND_ADMIN_SECRET"),
            store,
        })
    }

    pub fn build_store(&self) -> Result<Arc<dyn ActionStore>, ConfigError> {
        let store: Arc<dyn ActionStore> = match &self.store {
            StoreKind::Memory => Arc::new(InMemoryActionStore::new()),
            StoreKind::Sqlite(path) => Arc::new(SqliteActionStore::new(path)?),
            StoreKind::Rest {
                url,
                api_key,
                table,
            } => Arc::new(RestActionStore::new(
                url.clone(),
                api_key.clone(),
                table.as_deref(),
            )),
        };
        Ok(store)
    }
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
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_to_memory_store() {
        let cfg = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.listen.port(), 8002);
        assert_eq!(cfg.store, StoreKind::Memory);
        assert!(cfg.admin_secret.is_none());
    }

    #[test]
    fn rest_store_requires_url() {
        let err = ApiConfig::from_lookup(lookup(&[("RESPOND_STORE", "rest")])).unwrap_err();
        assert_eq!(err.to_string(), "RESPOND_REST_URL must be set when RESPOND_STORE=rest");

        let cfg = ApiConfig::from_lookup(lookup(&[
            ("RESPOND_STORE", "rest"),
            ("RESPOND_REST_URL", "https://db.example.test"),
            ("RESPOND_TABLE", "actions_v2"),
            ("RESPOND_ADMIN_SECRET", "s3cret"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreKind::Rest {
                url: "https://db.example.test".to_string(),
                api_key: None,
                table: Some("actions_v2".to_string()),
            }
        );
        assert_eq!(cfg.admin_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("RESPOND_STORE", "redis")])),
            Err(ConfigError::UnknownStore(_))
        ));
        assert!(matches!(
            ApiConfig::from_lookup(lookup(&[("RESPOND_LISTEN", "not-an-addr")])),
            Err(ConfigError::Listen(_))
        ));
    }

    #[tokio::test]
    async fn sqlite_store_opens_in_memory_database() {
        let cfg = ApiConfig::from_lookup(lookup(&[
            ("RESPOND_STORE", "sqlite"),
            ("RESPOND_SQLITE_PATH", ":memory:"),
        ]))
        .unwrap();
        let store = cfg.build_store().unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
