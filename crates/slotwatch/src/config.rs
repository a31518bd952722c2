use std::collections::BTreeSet;
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use crate::normalize::country_key;

pub const DEFAULT_SITE_URL: &str = "https://schengenappointments.com";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn default_state_file(city_slug: &str) -> PathBuf {
    PathBuf::from(format!("last_state_{city_slug}.json"))
}

pub fn default_snapshot_file(city_slug: &str) -> PathBuf {
    PathBuf::from(format!("rendered_{city_slug}.html"))
}

/// `{site}/in/{city}/{visa}`, the page listing every country for a city.
pub fn page_url(site_url: &str, city_slug: &str, visa_type: &str) -> String {
    format!(
        "{}/in/{}/{}",
        site_url.trim_end_matches('/'),
        city_slug.trim_matches('/'),
        visa_type.trim_matches('/')
    )
}

/// The target list, falling back to the single `TARGET_COUNTRY` that older
/// deployments set.
pub fn resolve_targets(targets: Option<String>, legacy_target: Option<String>) -> Option<String> {
    present(targets).or_else(|| present(legacy_target))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    MissingValue(&'static str),
    #[error("No target countries configured, expected a comma-separated list in TARGET_COUNTRIES")]
    NoTargetCountries,
}

/// Case-folded, decoration-free names of the countries to watch. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCountries(BTreeSet<String>);

impl TargetCountries {
    /// Builds the set from a comma-separated list, discarding blank entries.
    pub fn parse(list: &str) -> Result<Self, ConfigError> {
        let countries: BTreeSet<String> = list
            .split(',')
            .map(country_key)
            .filter(|c| !c.is_empty())
            .collect();

        if countries.is_empty() {
            return Err(ConfigError::NoTargetCountries);
        }
        Ok(Self(countries))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for TargetCountries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iter().collect::<Vec<_>>().join(", "))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// Which page to read and where a pre-rendered copy of it may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub city_slug: String,
    pub visa_type: String,
    pub site_url: String,
    pub snapshot_file: PathBuf,
    pub timeout: Duration,
}

impl PageSettings {
    pub fn page_url(&self) -> String {
        page_url(&self.site_url, &self.city_slug, &self.visa_type)
    }
}

/// Validated settings for a single run against one city.
#[derive(Clone)]
pub struct Config {
    pub page: PageSettings,
    pub target_countries: TargetCountries,
    pub telegram_token: Option<String>,
    pub chat_id: Option<String>,
    pub state_file: PathBuf,
    pub telegram_api_url: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("page", &self.page)
            .field("target_countries", &self.target_countries)
            .field("telegram_token", &self.telegram_token.as_ref().map(|_| "<redacted>"))
            .field("chat_id", &self.chat_id)
            .field("state_file", &self.state_file)
            .field("telegram_api_url", &self.telegram_api_url)
            .finish()
    }
}

impl Config {
    pub fn city_slug(&self) -> &str {
        &self.page.city_slug
    }

    pub fn page_url(&self) -> String {
        self.page.page_url()
    }

    /// Credentials are only required when messages are actually delivered.
    pub fn telegram_credentials(&self) -> Result<TelegramCredentials, ConfigError> {
        let token = self
            .telegram_token
            .clone()
            .ok_or(ConfigError::MissingValue("TELEGRAM_TOKEN"))?;
        let chat_id = self
            .chat_id
            .clone()
            .ok_or(ConfigError::MissingValue("CHAT_ID"))?;
        Ok(TelegramCredentials { token, chat_id })
    }
}

/// Unvalidated key/value input, typically filled from CLI flags and the
/// environment. Blank strings count as missing.
#[derive(Debug, Default, Clone)]
pub struct RawConfig {
    pub city_slug: Option<String>,
    pub visa_type: Option<String>,
    pub target_countries: Option<String>,
    pub telegram_token: Option<String>,
    pub chat_id: Option<String>,
    pub state_file: Option<PathBuf>,
    pub snapshot_file: Option<PathBuf>,
    pub site_url: Option<String>,
    pub telegram_api_url: Option<String>,
    pub timeout: Option<Duration>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn present_path(value: Option<PathBuf>) -> Option<PathBuf> {
    value.filter(|p| !p.as_os_str().is_empty())
}

impl RawConfig {
    /// Everything a full check needs. Targets are validated first.
    pub fn validate(mut self) -> Result<Config, ConfigError> {
        let target_countries = TargetCountries::parse(
            &present(self.target_countries.take()).ok_or(ConfigError::NoTargetCountries)?,
        )?;
        let telegram_token = present(self.telegram_token.take());
        let chat_id = present(self.chat_id.take());
        let state_file = present_path(self.state_file.take());
        let telegram_api_url = present(self.telegram_api_url.take())
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string());

        let page = self.validate_page()?;
        let state_file = state_file.unwrap_or_else(|| default_state_file(&page.city_slug));

        Ok(Config {
            page,
            target_countries,
            telegram_token,
            chat_id,
            state_file,
            telegram_api_url,
        })
    }

    /// Only the page settings; targets, credentials and state are ignored.
    pub fn validate_page(self) -> Result<PageSettings, ConfigError> {
        let city_slug = present(self.city_slug).ok_or(ConfigError::MissingValue("CITY_SLUG"))?;
        let visa_type = present(self.visa_type).ok_or(ConfigError::MissingValue("VISA_TYPE"))?;
        let snapshot_file =
            present_path(self.snapshot_file).unwrap_or_else(|| default_snapshot_file(&city_slug));

        Ok(PageSettings {
            city_slug,
            visa_type,
            site_url: present(self.site_url).unwrap_or_else(|| DEFAULT_SITE_URL.to_string()),
            snapshot_file,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> RawConfig {
        RawConfig {
            city_slug: Some("dubai".to_string()),
            visa_type: Some("tourism".to_string()),
            target_countries: Some("Cyprus, Norway".to_string()),
            telegram_token: Some("123:abc".to_string()),
            chat_id: Some("42".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_fills_defaults() {
        let config = raw().validate().expect("valid config");
        assert_eq!(config.state_file, PathBuf::from("last_state_dubai.json"));
        assert_eq!(config.page.snapshot_file, PathBuf::from("rendered_dubai.html"));
        assert_eq!(config.page.site_url, DEFAULT_SITE_URL);
        assert_eq!(config.telegram_api_url, DEFAULT_TELEGRAM_API_URL);
        assert_eq!(config.page.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.target_countries.len(), 2);
        assert_eq!(
            config.page_url(),
            "https://schengenappointments.com/in/dubai/tourism"
        );
    }

    #[test]
    fn test_validate_rejects_missing_targets() {
        let missing = RawConfig {
            target_countries: None,
            ..raw()
        };
        assert_eq!(missing.validate().unwrap_err(), ConfigError::NoTargetCountries);

        let blank = RawConfig {
            target_countries: Some(" , ".to_string()),
            ..raw()
        };
        assert_eq!(blank.validate().unwrap_err(), ConfigError::NoTargetCountries);
    }

    #[test]
    fn test_validate_checks_targets_before_anything_else() {
        let config = RawConfig {
            target_countries: Some(String::new()),
            city_slug: None,
            ..raw()
        };
        assert_eq!(config.validate().unwrap_err(), ConfigError::NoTargetCountries);
    }

    #[test]
    fn test_validate_rejects_blank_city() {
        let config = RawConfig {
            city_slug: Some("   ".to_string()),
            ..raw()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::MissingValue("CITY_SLUG")
        );
    }

    #[test]
    fn test_validate_page_needs_no_targets() {
        let page = RawConfig {
            city_slug: Some("london".to_string()),
            visa_type: Some("business".to_string()),
            ..Default::default()
        }
        .validate_page()
        .expect("targets are not needed to read the page");
        assert_eq!(page.snapshot_file, PathBuf::from("rendered_london.html"));
        assert_eq!(
            page.page_url(),
            "https://schengenappointments.com/in/london/business"
        );
    }

    #[test]
    fn test_validate_page_rejects_blank_slugs() {
        let blank_city = RawConfig {
            city_slug: Some(String::new()),
            visa_type: Some("tourism".to_string()),
            ..Default::default()
        };
        assert_eq!(
            blank_city.validate_page().unwrap_err(),
            ConfigError::MissingValue("CITY_SLUG")
        );

        let blank_visa = RawConfig {
            city_slug: Some("dubai".to_string()),
            visa_type: Some(" ".to_string()),
            ..Default::default()
        };
        assert_eq!(
            blank_visa.validate_page().unwrap_err(),
            ConfigError::MissingValue("VISA_TYPE")
        );
    }

    #[test]
    fn test_resolve_targets_falls_back_to_legacy_variable() {
        assert_eq!(
            resolve_targets(None, Some("Cyprus".to_string())),
            Some("Cyprus".to_string())
        );
        assert_eq!(
            resolve_targets(Some("  ".to_string()), Some("Cyprus".to_string())),
            Some("Cyprus".to_string())
        );
        assert_eq!(
            resolve_targets(Some("Italy, Norway".to_string()), Some("Cyprus".to_string())),
            Some("Italy, Norway".to_string())
        );
        assert_eq!(resolve_targets(None, None), None);

        let config = RawConfig {
            target_countries: resolve_targets(None, Some("Cyprus 🇨🇾".to_string())),
            ..raw()
        }
        .validate()
        .unwrap();
        assert!(config.target_countries.contains("cyprus"));
        assert_eq!(config.target_countries.len(), 1);
    }

    #[test]
    fn test_page_url() {
        assert_eq!(
            page_url("https://schengenappointments.com/", "dubai", "tourism"),
            "https://schengenappointments.com/in/dubai/tourism"
        );
        assert_eq!(
            page_url("http://127.0.0.1:8080", "/london/", "business"),
            "http://127.0.0.1:8080/in/london/business"
        );
    }

    #[test]
    fn test_target_countries_parse_normalizes_entries() {
        let targets = TargetCountries::parse(" Cyprus 🇨🇾, ITALY ,,  ,norway").unwrap();
        assert_eq!(targets.len(), 3);
        assert!(targets.contains("cyprus"));
        assert!(targets.contains("italy"));
        assert!(targets.contains("norway"));
        assert!(!targets.contains("Cyprus"));
    }

    #[test]
    fn test_target_countries_collapse_inner_whitespace() {
        let targets = TargetCountries::parse("Czech  Republic,\n  United\tKingdom").unwrap();
        assert!(targets.contains("czech republic"));
        assert!(targets.contains("united kingdom"));
    }

    #[test]
    fn test_target_countries_rejects_blank_list() {
        assert_eq!(
            TargetCountries::parse(""),
            Err(ConfigError::NoTargetCountries)
        );
        assert_eq!(
            TargetCountries::parse(" , ,, "),
            Err(ConfigError::NoTargetCountries)
        );
    }

    #[test]
    fn test_telegram_credentials_report_missing_value() {
        let config = RawConfig {
            chat_id: Some(String::new()),
            ..raw()
        }
        .validate()
        .expect("credentials are optional at validation time");
        assert_eq!(
            config.telegram_credentials().unwrap_err(),
            ConfigError::MissingValue("CHAT_ID")
        );

        let config = RawConfig {
            telegram_token: None,
            ..raw()
        }
        .validate()
        .unwrap();
        assert_eq!(
            config.telegram_credentials().unwrap_err(),
            ConfigError::MissingValue("TELEGRAM_TOKEN")
        );

        assert_eq!(
            raw().validate().unwrap().telegram_credentials(),
            Ok(TelegramCredentials {
                token: "123:abc".to_string(),
                chat_id: "42".to_string(),
            })
        );
    }

    #[test]
    fn test_config_debug_hides_token() {
        let config = raw().validate().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("123:abc"));
        assert!(debug.contains("<redacted>"));
    }
}
