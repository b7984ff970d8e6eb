//! Configuration loading and management
//!
//! Handles parsing of `.obra.toml` configuration files at the site root.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Site identity and location
    #[serde(default)]
    pub site: SiteConfig,

    /// Date input window
    #[serde(default)]
    pub dates: DateConfig,

    /// Weather advisory thresholds and provider
    #[serde(default)]
    pub weather: WeatherConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            dates: DateConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

/// Site-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name for the site
    #[serde(default)]
    pub name: Option<String>,

    /// Site latitude, used for the weather advisory
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    /// Site longitude, used for the weather advisory
    #[serde(default = "default_longitude")]
    pub longitude: f64,
}

fn default_latitude() -> f64 {
    32.5149
}

fn default_longitude() -> f64 {
    -117.0382
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: None,
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

/// Accepted year window for date inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateConfig {
    #[serde(default = "default_min_year")]
    pub min_year: i32,

    #[serde(default = "default_max_year")]
    pub max_year: i32,
}

fn default_min_year() -> i32 {
    2000
}

fn default_max_year() -> i32 {
    2100
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            min_year: default_min_year(),
            max_year: default_max_year(),
        }
    }
}

/// Weather advisory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Provider endpoint for current conditions
    #[serde(default = "default_provider_url")]
    pub provider_url: String,

    /// API key appended to the provider request, if required
    #[serde(default)]
    pub api_key: Option<String>,

    /// Lowest workable temperature in Celsius
    #[serde(default = "default_min_temp_c")]
    pub min_temp_c: f64,

    /// Highest workable temperature in Celsius
    #[serde(default = "default_max_temp_c")]
    pub max_temp_c: f64,

    /// Maximum workable wind speed in km/h
    #[serde(default = "default_max_wind_kmh")]
    pub max_wind_kmh: f64,

    /// Condition substrings that make work unfavorable
    #[serde(default = "default_bad_conditions")]
    pub bad_conditions: Vec<String>,
}

fn default_provider_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_min_temp_c() -> f64 {
    5.0
}

fn default_max_temp_c() -> f64 {
    35.0
}

fn default_max_wind_kmh() -> f64 {
    30.0
}

fn default_bad_conditions() -> Vec<String> {
    ["rain", "thunderstorm", "snow", "tornado", "hurricane", "storm"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
            api_key: None,
            min_temp_c: default_min_temp_c(),
            max_temp_c: default_max_temp_c(),
            max_wind_kmh: default_max_wind_kmh(),
            bad_conditions: default_bad_conditions(),
        }
    }
}

impl Config {
    /// Load configuration from an `.obra.toml` file
    pub fn load(path: &PathBuf) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the site root, or return defaults
    pub fn load_from_site(site_root: &PathBuf) -> Self {
        let config_path = site_root.join(".obra.toml");
        if config_path.exists() {
            Self::load(&config_path).unwrap_or_default()
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &PathBuf) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        self.site.validate()?;
        self.dates.validate()?;
        self.weather.validate()?;
        Ok(())
    }
}

impl SiteConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "site.latitude {} out of range [-90, 90]",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(crate::error::Error::InvalidConfig(format!(
                "site.longitude {} out of range [-180, 180]",
                self.longitude
            )));
        }
        Ok(())
    }
}

impl DateConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.min_year > self.max_year {
            return Err(crate::error::Error::InvalidConfig(format!(
                "dates.min_year {} exceeds dates.max_year {}",
                self.min_year, self.max_year
            )));
        }
        Ok(())
    }
}

impl WeatherConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.provider_url.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "weather.provider_url cannot be empty".to_string(),
            ));
        }
        if self.min_temp_c >= self.max_temp_c {
            return Err(crate::error::Error::InvalidConfig(format!(
                "weather.min_temp_c {} must be below weather.max_temp_c {}",
                self.min_temp_c, self.max_temp_c
            )));
        }
        if self.max_wind_kmh <= 0.0 {
            return Err(crate::error::Error::InvalidConfig(
                "weather.max_wind_kmh must be positive".to_string(),
            ));
        }
        for condition in &self.bad_conditions {
            if condition.trim().is_empty() {
                return Err(crate::error::Error::InvalidConfig(
                    "weather.bad_conditions cannot include empty entries".to_string(),
                ));
            }
        }
        Ok(())
    }
}
