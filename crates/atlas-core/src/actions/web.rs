//! Network-backed actions. Weather needs no API key: the location comes from
//! Nominatim (named city) or ipinfo (public IP), the reading from open-meteo.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Action, ActionArgs, ActionError, ActionSpec, ArgSpec};

const USER_AGENT: &str = "atlas-assistant/0.1";
const GEOCODE_URL: &str = "https://nominatim.openstreetmap.org/search";
const IP_LOCATION_URL: &str = "https://ipinfo.io/json";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Shared HTTP client for outbound action calls.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!("Failed to build HTTP client ({}); using defaults", e);
            reqwest::Client::new()
        })
}

/// A resolved place: coordinates plus an optional display name.
#[derive(Debug, Clone, PartialEq)]
struct Place {
    lat: f64,
    lon: f64,
    name: Option<String>,
}

impl Place {
    fn label(&self) -> String {
        match &self.name {
            Some(n) if !n.is_empty() => n.clone(),
            _ => format!("{:.3},{:.3}", self.lat, self.lon),
        }
    }
}

#[derive(Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct IpInfo {
    loc: Option<String>,
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
}

#[derive(Deserialize)]
struct Forecast {
    current_weather: Option<CurrentWeather>,
}

fn parse_geocode(hits: Vec<GeocodeHit>) -> Option<Place> {
    let hit = hits.into_iter().next()?;
    Some(Place {
        lat: hit.lat.parse().ok()?,
        lon: hit.lon.parse().ok()?,
        name: hit.display_name,
    })
}

/// ipinfo reports `"loc": "lat,lon"`.
fn parse_ip_info(info: IpInfo) -> Option<Place> {
    let loc = info.loc?;
    let (lat, lon) = loc.split_once(',')?;
    Some(Place {
        lat: lat.trim().parse().ok()?,
        lon: lon.trim().parse().ok()?,
        name: info.city,
    })
}

fn format_report(place: &Place, current: &CurrentWeather) -> String {
    format!(
        "Weather @ {}: {}°C, wind {} km/h",
        place.label(),
        current.temperature,
        current.windspeed
    )
}

// ── weather ──

static WEATHER: ActionSpec = ActionSpec {
    name: "weather",
    description: "Current weather for a city, or for the current location when no city is given",
    args: &[ArgSpec::optional_text("city")],
};

pub struct Weather {
    http: reqwest::Client,
}

impl Weather {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    async fn geocode(&self, city: &str) -> Result<Option<Place>> {
        let hits: Vec<GeocodeHit> = self
            .http
            .get(GEOCODE_URL)
            .query(&[("q", city), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .context("Geocoding request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid geocoding response")?;
        Ok(parse_geocode(hits))
    }

    async fn locate_by_ip(&self) -> Result<Option<Place>> {
        let info: IpInfo = self
            .http
            .get(IP_LOCATION_URL)
            .send()
            .await
            .context("IP location request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid IP location response")?;
        Ok(parse_ip_info(info))
    }

    async fn current(&self, place: &Place) -> Result<Option<CurrentWeather>> {
        let forecast: Forecast = self
            .http
            .get(FORECAST_URL)
            .query(&[
                ("latitude", place.lat.to_string()),
                ("longitude", place.lon.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .context("Forecast request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Invalid forecast response")?;
        Ok(forecast.current_weather)
    }
}

#[derive(Deserialize)]
struct WeatherArgs {
    city: Option<String>,
}

#[async_trait]
impl Action for Weather {
    fn spec(&self) -> &'static ActionSpec {
        &WEATHER
    }

    async fn run(&self, args: ActionArgs) -> Result<String, ActionError> {
        let args: WeatherArgs = args.parse()?;
        let city = args.city.as_deref().map(str::trim).filter(|c| !c.is_empty());

        let located = match city {
            Some(city) => self.geocode(city).await,
            None => self.locate_by_ip().await,
        };
        let place = match located {
            Ok(Some(place)) => place,
            Ok(None) => return Ok("Couldn't resolve location".to_string()),
            Err(e) => {
                debug!("Location lookup failed: {:#}", e);
                return Ok("Couldn't resolve location".to_string());
            }
        };

        match self.current(&place).await {
            Ok(Some(current)) => Ok(format_report(&place, &current)),
            Ok(None) => Ok("Weather unavailable".to_string()),
            Err(e) => {
                debug!("Forecast lookup failed: {:#}", e);
                Ok("Weather unavailable".to_string())
            }
        }
    }
}
