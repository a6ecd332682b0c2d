//! Page data fetching.
//!
//! A thin layer over `reqwest` that maps transport and HTTP failures onto
//! [`FetchError`]. It never retries: a failed request is reported to the page
//! builder, which fails that page and moves on.

use crate::config::{ApiConfig, HttpMethod};
use crate::error::FetchError;
use futures::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// One request in a [`Fetcher::fetch_batch`] call.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub endpoint: String,
    pub method: HttpMethod,
    pub params: serde_json::Map<String, Value>,
}

/// JSON fetcher bound to one API configuration.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    base_url: String,
    timeout: Duration,
    headers: HeaderMap,
}

impl Fetcher {
    /// Create a fetcher from the `api` section of the site config.
    ///
    /// Keep-alive is disabled so that a dev server restart never leaves the
    /// next build talking to a dead pooled connection.
    pub fn new(api: &ApiConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &api.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| FetchError::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::Config(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: api.base_url.clone().unwrap_or_default(),
            timeout: Duration::from_millis(api.timeout_ms),
            headers,
        })
    }

    /// Fetch one endpoint and parse the body as JSON.
    ///
    /// GET sends `params` as the query string, POST as the JSON body.
    pub async fn fetch(
        &self,
        endpoint: &str,
        method: HttpMethod,
        params: &serde_json::Map<String, Value>,
    ) -> Result<Value, FetchError> {
        if self.base_url.is_empty() {
            return Err(FetchError::Config(
                "no API base URL configured".to_string(),
            ));
        }

        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, %method, "fetching page data");

        let request = match method {
            HttpMethod::Get => self.client.get(&url).query(&query_pairs(params)),
            HttpMethod::Post => self.client.post(&url).json(params),
        };

        let response = request
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string(),
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                classify(&url, e)
            } else {
                FetchError::Config(format!("response from {} is not valid JSON: {}", url, e))
            }
        })
    }

    /// Fetch several endpoints concurrently.
    ///
    /// Fails as a whole on the first error; results keep request order.
    pub async fn fetch_batch(&self, requests: &[FetchRequest]) -> Result<Vec<Value>, FetchError> {
        try_join_all(
            requests
                .iter()
                .map(|req| self.fetch(&req.endpoint, req.method, &req.params)),
        )
        .await
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::Config(err.to_string())
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: if err.is_timeout() {
                "request timed out".to_string()
            } else {
                err.to_string()
            },
        }
    }
}

/// Flatten params into query pairs; non-string scalars use their JSON text.
fn query_pairs(params: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_pairs_stringify_scalars() {
        let params = json!({ "page": 2, "q": "shoes", "draft": false });
        let pairs = query_pairs(params.as_object().unwrap());
        assert!(pairs.contains(&("page".to_string(), "2".to_string())));
        assert!(pairs.contains(&("q".to_string(), "shoes".to_string())));
        assert!(pairs.contains(&("draft".to_string(), "false".to_string())));
    }

    #[test]
    fn test_invalid_header_is_config_error() {
        let mut api = ApiConfig::default();
        api.headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(matches!(Fetcher::new(&api), Err(FetchError::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_base_url_is_config_error() {
        let fetcher = Fetcher::new(&ApiConfig::default()).unwrap();
        let result = fetcher
            .fetch("/api/home", HttpMethod::Get, &serde_json::Map::new())
            .await;
        assert!(matches!(result, Err(FetchError::Config(_))));
    }

    async fn mock_api() -> ApiConfig {
        use axum::{extract::Query, routing::get, Json, Router};
        use std::collections::HashMap;

        let app = Router::new()
            .route(
                "/echo",
                get(|Query(q): Query<HashMap<String, String>>| async move { Json(json!(q)) }),
            )
            .route(
                "/broken",
                get(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Json(json!({}))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ApiConfig {
            base_url: Some(format!("http://{}", addr)),
            timeout_ms: 200,
            ..ApiConfig::default()
        }
    }

    fn request(endpoint: &str, params: Value) -> FetchRequest {
        FetchRequest {
            endpoint: endpoint.to_string(),
            method: HttpMethod::Get,
            params: params.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let fetcher = Fetcher::new(&mock_api().await).unwrap();
        let result = fetcher
            .fetch("/broken", HttpMethod::Get, &serde_json::Map::new())
            .await;
        assert!(
            matches!(result, Err(FetchError::Api { status: 500, .. })),
            "{:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_slow_response_is_network_timeout() {
        let fetcher = Fetcher::new(&mock_api().await).unwrap();
        let result = fetcher
            .fetch("/slow", HttpMethod::Get, &serde_json::Map::new())
            .await;
        match result {
            Err(FetchError::Network { url, message }) => {
                assert!(url.ends_with("/slow"));
                assert_eq!(message, "request timed out");
            }
            other => panic!("expected a network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_keeps_request_order() {
        let fetcher = Fetcher::new(&mock_api().await).unwrap();
        let results = fetcher
            .fetch_batch(&[
                request("/echo", json!({ "n": "1" })),
                request("/echo", json!({ "n": "2" })),
            ])
            .await
            .unwrap();
        assert_eq!(results, vec![json!({ "n": "1" }), json!({ "n": "2" })]);
    }

    #[tokio::test]
    async fn test_batch_fails_as_a_whole() {
        let fetcher = Fetcher::new(&mock_api().await).unwrap();
        let result = fetcher
            .fetch_batch(&[
                request("/echo", json!({ "n": "1" })),
                request("/broken", json!({})),
                request("/slow", json!({})),
            ])
            .await;
        assert!(matches!(result, Err(FetchError::Api { status: 500, .. })));
    }
}
