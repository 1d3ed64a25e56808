use crate::error::{KustoError, Result};
use crate::injector::AmbiguityPolicy;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Key/value configuration, seeded from the process environment
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// Empty configuration, nothing read from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a value, `Ok(None)` when the key is absent.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<T>()
                    .map_err(|e| KustoError::config(format!("invalid {key}={raw:?}: {e}")))
            })
            .transpose()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }
}

/// Application settings.
///
/// Sub-paths default to `<base_path>/routes`, `<base_path>/views` and
/// `<base_path>/db`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub port: u16,
    pub host: String,
    pub base_path: PathBuf,
    pub routes_path: PathBuf,
    pub views_path: PathBuf,
    pub db_path: PathBuf,
    pub trust_proxy: bool,
    pub ambiguity: AmbiguityPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::with_base_path("./app")
    }
}

impl CoreConfig {
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
            routes_path: base_path.join("routes"),
            views_path: base_path.join("views"),
            db_path: base_path.join("db"),
            base_path,
            trust_proxy: false,
            ambiguity: AmbiguityPolicy::default(),
        }
    }

    /// Read `PORT`, `HOST`, `APP_BASE_PATH`, `ROUTES_PATH`, `VIEWS_PATH`,
    /// `DB_PATH` and `TRUST_PROXY`; anything unset keeps its default.
    pub fn from_service(config: &ConfigService) -> Result<Self> {
        let mut core = match config.get("APP_BASE_PATH") {
            Some(base) => Self::with_base_path(base),
            None => Self::default(),
        };

        if let Some(port) = config.get_parsed::<u16>("PORT")? {
            core.port = port;
        }
        if let Some(host) = config.get("HOST") {
            core.host = host;
        }
        if let Some(path) = config.get("ROUTES_PATH") {
            core.routes_path = path.into();
        }
        if let Some(path) = config.get("VIEWS_PATH") {
            core.views_path = path.into();
        }
        if let Some(path) = config.get("DB_PATH") {
            core.db_path = path.into();
        }
        if let Some(trust) = config.get_parsed::<bool>("TRUST_PROXY")? {
            core.trust_proxy = trust;
        }
        Ok(core)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_service(&ConfigService::from_env())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.routes_path, PathBuf::from("./app/routes"));
        assert_eq!(config.ambiguity, AmbiguityPolicy::Omit);
    }

    #[test]
    fn test_from_service_overrides() {
        let service = ConfigService::new();
        service.set("PORT", "8080");
        service.set("APP_BASE_PATH", "./src/app");
        service.set("DB_PATH", "/var/db");
        service.set("TRUST_PROXY", "true");

        let config = CoreConfig::from_service(&service).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.views_path, PathBuf::from("./src/app/views"));
        assert_eq!(config.db_path, PathBuf::from("/var/db"));
        assert!(config.trust_proxy);
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let service = ConfigService::new();
        service.set("PORT", "eighty");

        let err = CoreConfig::from_service(&service).unwrap_err();
        assert!(matches!(err, KustoError::Config { .. }));
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_get_or() {
        let service = ConfigService::new();
        assert_eq!(service.get_or("MISSING", "fallback"), "fallback");
    }
}
