//! Gateway for the hosted backend's PostgREST-style API.
//!
//! Tables are exposed under `/rest/v1/<table>`, rows are selected with
//! `column=eq.value` filters, and writes ask for the affected rows back with
//! `Prefer: return=representation`.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};

use super::{Gateway, GatewayError};
use crate::config::BackendConfig;
use crate::models::{Fields, SyncRecord};

/// REST client for the hosted backend.
#[derive(Debug, Clone)]
pub struct RestGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl RestGateway {
    /// Creates a gateway from config.
    ///
    /// Returns an error if the backend URL or API key is missing.
    pub fn from_config(config: &BackendConfig) -> Result<Self, GatewayError> {
        let base_url = config.url.clone().ok_or(GatewayError::NotConfigured)?;
        let api_key = config.api_key.clone().ok_or(GatewayError::NotConfigured)?;
        let mut gateway = Self::new(base_url, api_key);
        gateway.access_token = config.access_token.clone();
        Ok(gateway)
    }

    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            access_token: None,
        }
    }

    /// Builds the URL for a table, optionally filtered by `column = value`.
    fn table_url(&self, table: &str, filter: Option<(&str, &str)>) -> String {
        let base = self.base_url.trim_end_matches('/');
        match filter {
            Some((column, value)) => format!(
                "{}/rest/v1/{}?{}=eq.{}",
                base,
                table,
                column,
                urlencoding::encode(value)
            ),
            None => format!("{}/rest/v1/{}", base, table),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.api_key);
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Takes the single row a write returned.
    fn single<R: SyncRecord>(rows: Vec<R>, id: &str) -> Result<R, GatewayError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl<R: SyncRecord> Gateway<R> for RestGateway {
    async fn list(&self, bar_id: &str) -> Result<Vec<R>, GatewayError> {
        let url = self.table_url(R::TABLE, Some(("bar_id", bar_id)));
        tracing::debug!(table = R::TABLE, bar_id, "listing records");

        let response = self.request(Method::GET, &url).send().await?;
        let rows = Self::check(response).await?.json::<Vec<R>>().await?;
        Ok(rows)
    }

    async fn create(&self, fields: Fields) -> Result<R, GatewayError> {
        let url = self.table_url(R::TABLE, None);
        let response = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;
        let rows = Self::check(response).await?.json::<Vec<R>>().await?;
        Self::single(rows, R::TABLE)
    }

    async fn update(&self, id: &str, fields: Fields) -> Result<R, GatewayError> {
        let url = self.table_url(R::TABLE, Some(("id", id)));
        let response = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await?;
        let rows = Self::check(response).await?.json::<Vec<R>>().await?;
        Self::single(rows, id)
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        let url = self.table_url(R::TABLE, Some(("id", id)));
        let response = self.request(Method::DELETE, &url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url_without_filter() {
        let gateway = RestGateway::new("https://api.example.com/".to_string(), "k".to_string());
        assert_eq!(
            gateway.table_url("seat_options", None),
            "https://api.example.com/rest/v1/seat_options"
        );
    }

    #[test]
    fn test_table_url_with_filter() {
        let gateway = RestGateway::new("https://api.example.com".to_string(), "k".to_string());
        assert_eq!(
            gateway.table_url("drink_options", Some(("bar_id", "b 1"))),
            "https://api.example.com/rest/v1/drink_options?bar_id=eq.b%201"
        );
    }

    #[test]
    fn test_from_config_requires_url_and_key() {
        let config = BackendConfig {
            url: Some("https://api.example.com".to_string()),
            api_key: None,
            access_token: None,
        };
        assert!(matches!(
            RestGateway::from_config(&config),
            Err(GatewayError::NotConfigured)
        ));
    }

    #[test]
    fn test_from_config_keeps_access_token() {
        let config = BackendConfig {
            url: Some("https://api.example.com".to_string()),
            api_key: Some("anon".to_string()),
            access_token: Some("jwt".to_string()),
        };
        let gateway = RestGateway::from_config(&config).unwrap();
        assert_eq!(gateway.access_token.as_deref(), Some("jwt"));
    }
}
