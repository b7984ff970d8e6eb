//! Weather advisory for the site.
//!
//! One read-only GET against the configured provider, keyed by the
//! site's fixed coordinates. The favorability check is pure so a stored
//! report can be evaluated without touching the network.

use serde::{Deserialize, Serialize};

use crate::config::WeatherConfig;
use crate::error::Result;

const MPS_TO_KMH: f64 = 3.6;

/// Current conditions, normalized to the units the thresholds use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherReport {
    pub temperature_c: f64,
    pub wind_kmh: f64,
    pub humidity: f64,
    pub condition: String,
}

/// Whether conditions allow outdoor construction work.
///
/// Workable: temperature inside the configured band, wind at or below
/// the limit, and the condition matching none of the bad substrings.
pub fn favorable_for_construction(report: &WeatherReport, config: &WeatherConfig) -> bool {
    if report.temperature_c < config.min_temp_c || report.temperature_c > config.max_temp_c {
        return false;
    }
    if report.wind_kmh > config.max_wind_kmh {
        return false;
    }
    let condition = report.condition.to_lowercase();
    !config
        .bad_conditions
        .iter()
        .any(|bad| condition.contains(&bad.to_lowercase()))
}

// Provider response shape (metric units; wind arrives in m/s)
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    main: ProviderMain,
    wind: ProviderWind,
    weather: Vec<ProviderCondition>,
}

#[derive(Debug, Deserialize)]
struct ProviderMain {
    temp: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ProviderCondition {
    main: String,
}

/// Fetch current conditions for the given coordinates
pub fn fetch_current(config: &WeatherConfig, latitude: f64, longitude: f64) -> Result<WeatherReport> {
    let client = reqwest::blocking::Client::new();
    let mut request = client.get(&config.provider_url).query(&[
        ("lat", latitude.to_string()),
        ("lon", longitude.to_string()),
        ("units", "metric".to_string()),
    ]);
    if let Some(api_key) = config.api_key.as_deref() {
        request = request.query(&[("appid", api_key)]);
    }

    let response: ProviderResponse = request.send()?.error_for_status()?.json()?;
    Ok(WeatherReport {
        temperature_c: response.main.temp,
        wind_kmh: response.wind.speed * MPS_TO_KMH,
        humidity: response.main.humidity,
        condition: response
            .weather
            .into_iter()
            .next()
            .map(|condition| condition.main)
            .unwrap_or_default(),
    })
}
