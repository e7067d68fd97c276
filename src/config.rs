//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// How long the "tour completed" toast stays up.
pub const COMPLETION_NOTICE_DURATION: Duration = Duration::from_millis(3000);

/// How long the "progress saved" toast stays up.
pub const PROGRESS_SAVED_NOTICE_DURATION: Duration = Duration::from_millis(2000);

/// Tour configuration.
#[derive(Debug, Clone)]
pub struct TourConfig {
    /// Product prefix in persisted keys (e.g. "mtx").
    pub product: String,
    /// Product callsign, the id segment of persisted keys.
    pub callsign: String,
    /// Style/theme value passed to the step catalog.
    pub theme: String,
    /// UI language for the bundled localizer.
    pub language: String,
    /// Path of the durable progress database, or ":memory:".
    pub db_path: String,
    /// Healthcheck endpoint that reports the deployment identity.
    pub healthcheck_url: String,
    /// Base URL that relative image paths are resolved against.
    pub asset_base_url: String,
    /// Port the UI-shell API listens on.
    pub port: u16,
    /// Per-image fetch timeout.
    pub image_timeout: Duration,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            product: "mtx".to_string(),
            callsign: "matrix".to_string(),
            theme: "light".to_string(),
            language: "en".to_string(),
            db_path: "./data/onboarding.db".to_string(),
            healthcheck_url: "http://127.0.0.1:8000/api/v1/healthcheck".to_string(),
            asset_base_url: "http://127.0.0.1:8000".to_string(),
            port: 8080,
            image_timeout: Duration::from_secs(10),
        }
    }
}

impl TourConfig {
    /// Build configuration from `TOUR_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("TOUR_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "TOUR_PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        let image_timeout = match lookup("TOUR_IMAGE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "TOUR_IMAGE_TIMEOUT_SECS".to_string(),
                    message: format!("{raw:?}: {e}"),
                }
            })?),
            None => defaults.image_timeout,
        };

        Ok(Self {
            product: lookup("TOUR_PRODUCT").unwrap_or(defaults.product),
            callsign: lookup("TOUR_CALLSIGN").unwrap_or(defaults.callsign),
            theme: lookup("TOUR_THEME").unwrap_or(defaults.theme),
            language: lookup("TOUR_LANGUAGE").unwrap_or(defaults.language),
            db_path: lookup("TOUR_DB_PATH").unwrap_or(defaults.db_path),
            healthcheck_url: lookup("TOUR_HEALTHCHECK_URL").unwrap_or(defaults.healthcheck_url),
            asset_base_url: lookup("TOUR_ASSET_BASE_URL").unwrap_or(defaults.asset_base_url),
            port,
            image_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = TourConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.product, "mtx");
        assert_eq!(config.callsign, "matrix");
        assert_eq!(config.port, 8080);
        assert_eq!(config.image_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_from_env() {
        let config = TourConfig::from_lookup(lookup_from(&[
            ("TOUR_CALLSIGN", "atlas"),
            ("TOUR_THEME", "dark"),
            ("TOUR_PORT", "9001"),
            ("TOUR_DB_PATH", ":memory:"),
        ]))
        .unwrap();
        assert_eq!(config.callsign, "atlas");
        assert_eq!(config.theme, "dark");
        assert_eq!(config.port, 9001);
        assert_eq!(config.db_path, ":memory:");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = TourConfig::from_lookup(lookup_from(&[("TOUR_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("TOUR_PORT"));
    }
}
