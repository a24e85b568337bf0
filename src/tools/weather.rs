//! Weather 工具：open-meteo 地理编码 + 当前天气
//!
//! 参数接受两种形状：{"city": "Tokyo"} 或 {"location": {"city", "state", "country"}}。
//! 地理编码失配时用逗号前的简化名重试一次；结果渲染为 "City, CC: T°C, wind W km/h."。

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::WeatherSection;
use crate::tools::Tool;

/// Weather 工具：city → 经纬度 → 当前天气文本
pub struct WeatherTool {
    client: Client,
    geocode_url: String,
    forecast_url: String,
}

/// 地理编码结果
struct Geocoded {
    latitude: f64,
    longitude: f64,
    name: String,
    country_code: String,
}

impl WeatherTool {
    pub fn new(cfg: &WeatherSection) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            geocode_url: cfg.geocode_url.clone(),
            forecast_url: cfg.forecast_url.clone(),
        }
    }

    async fn geocode_once(&self, query: &str) -> Result<Option<Geocoded>, String> {
        let resp = self
            .client
            .get(&self.geocode_url)
            .query(&[("name", query), ("count", "1")])
            .send()
            .await
            .map_err(|e| format!("Geocoding request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Geocoding HTTP {}", resp.status()));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| format!("Geocoding response: {}", e))?;

        let first = match data.get("results").and_then(|r| r.get(0)) {
            Some(r) => r,
            None => return Ok(None),
        };
        Ok(Some(Geocoded {
            latitude: first.get("latitude").and_then(|v| v.as_f64()).unwrap_or(0.0),
            longitude: first.get("longitude").and_then(|v| v.as_f64()).unwrap_or(0.0),
            name: first
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or(query)
                .to_string(),
            country_code: first
                .get("country_code")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string(),
        }))
    }

    /// 先按完整查询，失配时去掉逗号后的州/国家重试
    async fn geocode(&self, query: &str) -> Result<Option<Geocoded>, String> {
        if let Some(hit) = self.geocode_once(query).await? {
            return Ok(Some(hit));
        }
        let simplified = query.split(',').next().unwrap_or(query).trim();
        if simplified == query {
            return Ok(None);
        }
        self.geocode_once(simplified).await
    }

    async fn current_weather(&self, geocoded: &Geocoded) -> Result<String, String> {
        let resp = self
            .client
            .get(&self.forecast_url)
            .query(&[
                ("latitude", geocoded.latitude.to_string()),
                ("longitude", geocoded.longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .map_err(|e| format!("Forecast request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("Forecast HTTP {}", resp.status()));
        }
        let data: Value = resp
            .json()
            .await
            .map_err(|e| format!("Forecast response: {}", e))?;

        let current = match data.get("current_weather") {
            Some(c) if !c.is_null() => c,
            _ => return Ok(format!("No weather data for {}.", geocoded.name)),
        };
        let temperature = current.get("temperature").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let windspeed = current.get("windspeed").and_then(|v| v.as_f64()).unwrap_or(0.0);

        Ok(format!(
            "{}, {}: {}°C, wind {} km/h.",
            geocoded.name, geocoded.country_code, temperature, windspeed
        ))
    }
}

/// 从参数中取出地理编码查询串：city 或 location.{city,state,country} 拼接
fn location_query(args: &Value) -> Result<String, String> {
    if let Some(city) = args.get("city").and_then(|v| v.as_str()) {
        if !city.trim().is_empty() {
            return Ok(city.trim().to_string());
        }
    }

    if let Some(location) = args.get("location") {
        let city = location.get("city").and_then(|v| v.as_str()).unwrap_or("");
        if city.trim().is_empty() {
            return Err("Missing city in location.".to_string());
        }
        let parts: Vec<&str> = [city]
            .into_iter()
            .chain(location.get("state").and_then(|v| v.as_str()))
            .chain(location.get("country").and_then(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
            .collect();
        return Ok(parts.join(", "));
    }

    Err("Missing city".to_string())
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get current weather for a city. Args: {\"city\": \"Tokyo\"} or {\"location\": {\"city\", \"state\", \"country\"}}."
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = location_query(&args)?;
        tracing::info!(query = %query, "weather lookup");

        let geocoded = match self.geocode(&query).await? {
            Some(g) => g,
            None => return Ok(format!("Couldn't find '{}'.", query)),
        };
        self.current_weather(&geocoded).await
    }
}
