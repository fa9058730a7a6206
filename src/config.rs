// Process configuration, read from the environment (optionally seeded by .env)

use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use tracing::{info, warn};

use crate::{error::ConfigError, registry::CityRegistry};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_OTA_PID: &str = "284116645";
pub const DEFAULT_ALLIANCE_ID: &str = "7463534";
pub const DEFAULT_OUID: &str = "kfptpcljzh";
pub const DEFAULT_ORIGIN: &str = "北京";
pub const DEFAULT_ORIGIN_CODE: &str = "1";

// Affiliate ids and provider base URLs substituted into outbound links
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub ota_pid: String,
    pub alliance_id: String,
    pub ouid: String,
    pub fliggy_pid: Option<String>,
    pub hotel_base_url: String,
    pub transport_base_url: String,
    pub package_base_url: String,
    pub ticket_base_url: String,
    pub fliggy_hotel_base_url: String,
    pub default_origin: String,
    pub default_origin_code: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            ota_pid: DEFAULT_OTA_PID.to_string(),
            alliance_id: DEFAULT_ALLIANCE_ID.to_string(),
            ouid: DEFAULT_OUID.to_string(),
            fliggy_pid: None,
            hotel_base_url: "https://hotels.ctrip.com/hotels/list".to_string(),
            transport_base_url: "https://trains.ctrip.com/webapp/train/list".to_string(),
            package_base_url: "https://vacations.ctrip.com/list/whole".to_string(),
            ticket_base_url: "https://piao.ctrip.com/ticket/dest".to_string(),
            fliggy_hotel_base_url: "https://www.fliggy.com/hotel/".to_string(),
            default_origin: DEFAULT_ORIGIN.to_string(),
            default_origin_code: DEFAULT_ORIGIN_CODE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub city_registry_path: Option<PathBuf>,
    pub provider: ProviderConfig,
    // False when the affiliate pid fell back to the built-in default
    pub ota_pid_configured: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let explicit_pid = var("OTA_PID").or_else(|| var("CTRIP_PID"));
        let ota_pid_configured = explicit_pid.is_some();

        let defaults = ProviderConfig::default();
        let provider = ProviderConfig {
            ota_pid: explicit_pid.unwrap_or(defaults.ota_pid),
            alliance_id: or_default(&var, "ALLIANCE_ID", defaults.alliance_id),
            ouid: or_default(&var, "OUID", defaults.ouid),
            fliggy_pid: var("FLIGGY_PID"),
            default_origin: or_default(&var, "DEFAULT_ORIGIN", defaults.default_origin),
            default_origin_code: or_default(
                &var,
                "DEFAULT_ORIGIN_CODE",
                defaults.default_origin_code,
            ),
            ..defaults
        };

        Ok(Self {
            port: try_load(&var, "PORT", DEFAULT_PORT)?,
            data_dir: PathBuf::from(or_default(&var, "DATA_DIR", "data".to_string())),
            city_registry_path: var("CITY_REGISTRY_PATH").map(PathBuf::from),
            provider,
            ota_pid_configured,
        })
    }
}

impl Config {
    // CITY_REGISTRY_PATH replaces the built-in table when set
    pub fn load_registry(&self) -> Result<CityRegistry, ConfigError> {
        match &self.city_registry_path {
            Some(path) => {
                let registry = CityRegistry::load_from_file(path)?;
                info!(cities = registry.len(), path = %path.display(), "city registry loaded");
                Ok(registry)
            }
            None => {
                let registry = CityRegistry::builtin();
                info!(cities = registry.len(), "using built-in city registry");
                Ok(registry)
            }
        }
    }
}

fn or_default<F>(var: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default
    })
}

fn try_load<F, T>(var: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.city_registry_path.is_none());
        assert!(!config.ota_pid_configured);
        assert_eq!(config.provider, ProviderConfig::default());
    }

    #[test]
    fn test_ota_pid_falls_back_to_ctrip_pid() {
        let config = Config::from_lookup(lookup(&[("CTRIP_PID", "999")])).unwrap();
        assert_eq!(config.provider.ota_pid, "999");
        assert!(config.ota_pid_configured);

        let config =
            Config::from_lookup(lookup(&[("OTA_PID", "111"), ("CTRIP_PID", "999")])).unwrap();
        assert_eq!(config.provider.ota_pid, "111");
    }

    #[test]
    fn test_overrides_are_applied() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("ALLIANCE_ID", "42"),
            ("FLIGGY_PID", "mm_1"),
            ("DEFAULT_ORIGIN", "上海"),
            ("DEFAULT_ORIGIN_CODE", "2"),
            ("DATA_DIR", "/srv/data"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.provider.alliance_id, "42");
        assert_eq!(config.provider.fliggy_pid.as_deref(), Some("mm_1"));
        assert_eq!(config.provider.default_origin, "上海");
        assert_eq!(config.provider.default_origin_code, "2");
        assert_eq!(config.data_dir, PathBuf::from("/srv/data"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = Config::from_lookup(lookup(&[("FLIGGY_PID", "  ")])).unwrap();
        assert!(config.provider.fliggy_pid.is_none());
    }

    #[test]
    fn test_missing_registry_file_is_config_error() {
        let config =
            Config::from_lookup(lookup(&[("CITY_REGISTRY_PATH", "/no/such/cities.json")])).unwrap();
        let err = config.load_registry().unwrap_err();
        assert!(matches!(err, ConfigError::Registry(_)));

        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.load_registry().unwrap().len(), CityRegistry::builtin().len());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("PORT", "not-a-port")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "PORT"));
    }
}
