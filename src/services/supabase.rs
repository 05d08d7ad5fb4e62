use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::models::{GeoCode, GeoLevel};

const GEO_TABLE: &str = "geo_code";

/// Errors that can occur when talking to the hosted backend
#[derive(Debug, Error)]
pub enum SupabaseError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Unauthorized: invalid anon key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid province id: {0}")]
    InvalidProvince(String),
}

/// PostgREST client for the geographic reference table
///
/// Provinces and cities live in the hosted `geo_code` table and are read
/// with the public anon key.
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl SupabaseClient {
    pub fn new(base_url: String, anon_key: String, timeout: Duration) -> Result<Self, SupabaseError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            anon_key,
            client,
        })
    }

    /// All provinces, sorted by name
    pub async fn list_provinces(&self) -> Result<Vec<GeoCode>, SupabaseError> {
        let query = [
            ("select", "id,name,geo_level".to_string()),
            ("geo_level", "eq.Prov".to_string()),
            ("order", "name.asc".to_string()),
        ];

        self.fetch_geo_codes(&query).await
    }

    /// Cities and municipalities of a province
    ///
    /// Children share the first four digits of the province code.
    pub async fn list_cities(&self, province_id: &str) -> Result<Vec<GeoCode>, SupabaseError> {
        let prefix = province_prefix(province_id)?;

        let query = [
            ("select", "id,name,geo_level".to_string()),
            ("geo_level", "in.(City,Mun)".to_string()),
            ("id::text", format!("ilike.{}*", prefix)),
            ("order", "name.asc".to_string()),
        ];

        self.fetch_geo_codes(&query).await
    }

    async fn fetch_geo_codes(&self, query: &[(&str, String)]) -> Result<Vec<GeoCode>, SupabaseError> {
        let params = query
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let url = format!(
            "{}/rest/v1/{}?{}",
            self.base_url.trim_end_matches('/'),
            GEO_TABLE,
            params
        );

        tracing::debug!("Fetching geo codes: {}", url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SupabaseError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Geo code query failed: {} - {}", status, body);
            return Err(SupabaseError::ApiError(format!("Failed to fetch geo codes: {}", status)));
        }

        let json: Value = response.json().await?;
        parse_geo_codes(&json)
    }
}

/// First four characters of a province code
fn province_prefix(province_id: &str) -> Result<&str, SupabaseError> {
    let trimmed = province_id.trim();
    if trimmed.len() < 4 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(SupabaseError::InvalidProvince(province_id.to_string()));
    }
    Ok(&trimmed[..4])
}

/// Parse PostgREST rows; `id` may come back as a JSON number or string
fn parse_geo_codes(json: &Value) -> Result<Vec<GeoCode>, SupabaseError> {
    let rows = json
        .as_array()
        .ok_or_else(|| SupabaseError::InvalidResponse("Expected a JSON array".into()))?;

    rows.iter()
        .map(|row| {
            let id = match row.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => return Err(SupabaseError::InvalidResponse("Missing id".into())),
            };

            let name = row
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SupabaseError::InvalidResponse(format!("Missing name for {}", id)))?
                .to_string();

            let geo_level: GeoLevel = row
                .get("geo_level")
                .cloned()
                .map(serde_json::from_value::<GeoLevel>)
                .transpose()
                .map_err(|e| SupabaseError::InvalidResponse(format!("Bad geo_level for {}: {}", id, e)))?
                .ok_or_else(|| SupabaseError::InvalidResponse(format!("Missing geo_level for {}", id)))?;

            Ok(GeoCode { id, name, geo_level })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(url: String) -> SupabaseClient {
        SupabaseClient::new(url, "anon-key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_province_prefix() {
        assert_eq!(province_prefix("012800000").unwrap(), "0128");
        assert!(province_prefix("12").is_err());
        assert!(province_prefix("abcd0000").is_err());
    }

    #[test]
    fn test_parse_numeric_and_string_ids() {
        let json = serde_json::json!([
            {"id": 12800000, "name": "Ilocos Norte", "geo_level": "Prov"},
            {"id": "012801000", "name": "Adams", "geo_level": "Mun"}
        ]);

        let codes = parse_geo_codes(&json).unwrap();
        assert_eq!(codes[0].id, "12800000");
        assert_eq!(codes[1].geo_level, GeoLevel::Mun);
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        let json = serde_json::json!([{"id": "1", "name": "X", "geo_level": "Bgy"}]);
        assert!(matches!(parse_geo_codes(&json), Err(SupabaseError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_list_provinces() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/geo_code")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("geo_level".into(), "eq.Prov".into()),
                Matcher::UrlEncoded("order".into(), "name.asc".into()),
            ]))
            .match_header("apikey", "anon-key")
            .match_header("authorization", "Bearer anon-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"012800000","name":"Ilocos Norte","geo_level":"Prov"}]"#)
            .create_async()
            .await;

        let provinces = client_for(server.url()).list_provinces().await.unwrap();

        mock.assert_async().await;
        assert_eq!(provinces.len(), 1);
        assert_eq!(provinces[0].name, "Ilocos Norte");
    }

    #[tokio::test]
    async fn test_list_cities_filters_by_prefix() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/geo_code")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("geo_level".into(), "in.(City,Mun)".into()),
                Matcher::UrlEncoded("id::text".into(), "ilike.0128*".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"012805000","name":"Laoag City","geo_level":"City"}]"#)
            .create_async()
            .await;

        let cities = client_for(server.url()).list_cities("012800000").await.unwrap();

        mock.assert_async().await;
        assert_eq!(cities[0].geo_level, GeoLevel::City);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/geo_code")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let result = client_for(server.url()).list_provinces().await;
        assert!(matches!(result, Err(SupabaseError::Unauthorized)));
    }
}
