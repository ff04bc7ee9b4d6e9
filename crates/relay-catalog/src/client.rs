//! HTTP client for tenant product APIs

use relay_core::{AuthType, Product, ProductApiConfig};
use reqwest::{Client, RequestBuilder};
use tracing::{debug, info};

use crate::error::{CatalogError, Result};

/// Fetches product lists from a tenant's website
#[derive(Debug, Clone, Default)]
pub struct CatalogClient {
    client: Client,
}

impl CatalogClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse an existing HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// GET the configured product API and parse the product array
    pub async fn fetch(&self, config: &ProductApiConfig) -> Result<Vec<Product>> {
        if !config.is_active() {
            return Err(CatalogError::Configuration(
                "product API is disabled or has no URL".to_string(),
            ));
        }

        debug!(url = %config.url, auth = ?config.auth_type, "Fetching products");

        let request = apply_auth(self.client.get(&config.url), config);
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status { status, body });
        }

        let body = response.text().await?;
        let products: Vec<Product> = serde_json::from_str(&body)?;

        info!(url = %config.url, count = products.len(), "Fetched products from API");
        Ok(products)
    }
}

/// Attach the auth header for the configured auth type.
///
/// Incomplete credentials leave the request unauthenticated.
fn apply_auth(request: RequestBuilder, config: &ProductApiConfig) -> RequestBuilder {
    match config.auth_type {
        AuthType::None => request,
        AuthType::Bearer => match credential(&config.bearer_token) {
            Some(token) => request.bearer_auth(token),
            None => request,
        },
        AuthType::Basic => match (credential(&config.username), credential(&config.password)) {
            (Some(user), Some(pass)) => request.basic_auth(user, Some(pass)),
            _ => request,
        },
        AuthType::ApiKey => match (
            credential(&config.api_key_header),
            credential(&config.api_key_value),
        ) {
            (Some(header), Some(value)) => request.header(header, value),
            _ => request,
        },
    }
}

fn credential(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inactive_config_is_rejected() {
        let client = CatalogClient::new();
        let config = ProductApiConfig {
            enabled: true,
            url: "  ".into(),
            ..Default::default()
        };

        let err = client.fetch(&config).await.unwrap_err();
        assert!(matches!(err, CatalogError::Configuration(_)));
    }

    #[test]
    fn test_basic_auth_needs_both_fields() {
        let config = ProductApiConfig {
            auth_type: AuthType::Basic,
            username: Some("owner".into()),
            ..Default::default()
        };
        let request = apply_auth(Client::new().get("http://localhost/products"), &config)
            .build()
            .unwrap();
        assert!(request.headers().get("authorization").is_none());
    }
}
