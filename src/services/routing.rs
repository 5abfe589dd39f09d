use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::RoutingConfig;
use crate::models::{common::GeoPoint, map::RouteOverlay};
use crate::utils::{AppError, AppResult};

/// Client for an OSRM-compatible routing engine.
#[derive(Clone)]
pub struct RoutingService {
    client: Client,
    config: RoutingConfig,
}

impl RoutingService {
    pub fn new(config: RoutingConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    fn route_url(&self, start: GeoPoint, end: GeoPoint) -> String {
        // OSRM takes lng,lat
        format!(
            "{}/route/v1/{}/{},{};{},{}?overview=full&geometries=geojson",
            self.config.base_url,
            self.config.profile,
            start.longitude,
            start.latitude,
            end.longitude,
            end.latitude
        )
    }

    pub async fn route(&self, start: GeoPoint, end: GeoPoint) -> Result<RouteOverlay> {
        let url = self.route_url(start, end);
        log::debug!("Requesting route: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;

        if !status.is_success() && body.get("code").is_none() {
            return Err(anyhow!("Routing engine returned {}", status));
        }

        parse_route(&body, start, end)
    }
}

/// Both ends must be known and on the globe before the engine is asked.
pub fn route_endpoints(start: Option<GeoPoint>, end: Option<GeoPoint>) -> AppResult<(GeoPoint, GeoPoint)> {
    match (start, end) {
        (Some(start), Some(end)) if start.is_valid() && end.is_valid() => Ok((start, end)),
        _ => Err(AppError::Validation("missing map selection".to_string())),
    }
}

fn parse_route(body: &Value, start: GeoPoint, end: GeoPoint) -> Result<RouteOverlay> {
    let code = body["code"].as_str().unwrap_or("");
    if code != "Ok" {
        let message = body["message"].as_str().unwrap_or("no message");
        return Err(anyhow!("Routing failed ({}): {}", code, message));
    }

    let route = body["routes"]
        .as_array()
        .and_then(|routes| routes.first())
        .ok_or_else(|| anyhow!("Routing engine returned no routes"))?;

    let path = route["geometry"]["coordinates"]
        .as_array()
        .map(|coords| {
            coords
                .iter()
                .filter_map(|pair| {
                    let lng = pair.get(0)?.as_f64()?;
                    let lat = pair.get(1)?.as_f64()?;
                    Some([lat, lng])
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(RouteOverlay {
        start,
        end,
        distance_meters: route["distance"].as_f64().unwrap_or(0.0),
        duration_seconds: route["duration"].as_f64().unwrap_or(0.0),
        path,
    })
}
