//! Remote option sources.

use std::fmt;

use async_trait::async_trait;
use formwork_core::Value;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::error::FetchError;

/// Fetches option records from a remote endpoint.
///
/// `params` are sent as query parameters; implementations return the raw
/// records and leave label/value mapping to the caller.
#[async_trait]
pub trait OptionSource: Send + Sync {
    /// Issues `GET <target>?<params>`.
    async fn fetch(&self, target: &str, params: &[(String, String)]) -> Result<Vec<Value>, FetchError>;
}

/// [`OptionSource`] backed by `reqwest`.
///
/// Absolute targets are requested as is; relative ones are joined onto the
/// base URL.
#[derive(Clone)]
pub struct HttpOptionSource {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpOptionSource {
    /// Builds a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Internal`] if the HTTP client cannot be built.
    pub fn new(config: &RuntimeConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Internal(anyhow::Error::new(e).context("failed to build HTTP client")))?;
        Ok(Self {
            client,
            base_url: None,
        })
    }

    /// Resolves relative targets against `base_url`.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn url_for(&self, target: &str) -> Result<String, FetchError> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Ok(target.to_string());
        }
        match &self.base_url {
            Some(base) => Ok(format!(
                "{}/{}",
                base.trim_end_matches('/'),
                target.trim_start_matches('/')
            )),
            None => Err(FetchError::InvalidTarget {
                target: target.to_string(),
                reason: "relative target without a base URL".to_string(),
            }),
        }
    }
}

#[async_trait]
impl OptionSource for HttpOptionSource {
    async fn fetch(&self, target: &str, params: &[(String, String)]) -> Result<Vec<Value>, FetchError> {
        let url = self.url_for(target)?;
        debug!(%url, ?params, "fetching options");
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                target: target.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                target: target.to_string(),
                status: status.as_u16(),
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|source| FetchError::Decode {
            target: target.to_string(),
            source,
        })?;
        records_from_body(body).ok_or_else(|| FetchError::UnexpectedShape {
            target: target.to_string(),
        })
    }
}

impl fmt::Debug for HttpOptionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpOptionSource")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Accepts a bare array or an object wrapping the array in `data`.
fn records_from_body(body: serde_json::Value) -> Option<Vec<Value>> {
    let array = match body {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(serde_json::Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    array
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<Value>, _>>()
        .ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};

    use super::*;

    async fn cities(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
        let all = serde_json::json!([
            {"id": 1, "name": "Pune", "stateId": "mh"},
            {"id": 2, "name": "Mumbai", "stateId": "mh"},
            {"id": 3, "name": "Panaji", "stateId": "ga"}
        ]);
        let search = params.get("search").cloned().unwrap_or_default().to_lowercase();
        let state = params.get("stateId").cloned();
        let id = params.get("id").cloned();
        let filtered: Vec<_> = all
            .as_array()
            .expect("array literal")
            .iter()
            .filter(|c| state.as_deref().map_or(true, |s| c["stateId"] == s))
            .filter(|c| id.as_deref().map_or(true, |i| c["id"].to_string() == i))
            .filter(|c| {
                c["name"]
                    .as_str()
                    .is_some_and(|n| n.to_lowercase().contains(&search))
            })
            .cloned()
            .collect();
        Json(serde_json::Value::Array(filtered))
    }

    async fn wrapped() -> Json<serde_json::Value> {
        Json(serde_json::json!({"data": [{"label": "A", "value": "a"}]}))
    }

    async fn not_a_list() -> Json<serde_json::Value> {
        Json(serde_json::json!({"error": "nope"}))
    }

    async fn broken() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn serve() -> String {
        let app = Router::new()
            .route("/cities", get(cities))
            .route("/wrapped", get(wrapped))
            .route("/shape", get(not_a_list))
            .route("/broken", get(broken));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server runs");
        });
        format!("http://{addr}")
    }

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn fetches_with_search_and_parent_params() {
        let base = serve().await;
        let source = HttpOptionSource::new(&RuntimeConfig::default())
            .expect("client")
            .with_base_url(base);
        let records = source
            .fetch("/cities", &params(&[("search", "p"), ("stateId", "mh")]))
            .await
            .expect("fetch succeeds");
        assert_eq!(records.len(), 2);
        let records = source
            .fetch("/cities", &params(&[("search", ""), ("stateId", "ga")]))
            .await
            .expect("fetch succeeds");
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].as_map().and_then(|m| m.get("name")),
            Some(&Value::from("Panaji"))
        );
    }

    #[tokio::test]
    async fn accepts_wrapped_lists() {
        let base = serve().await;
        let source = HttpOptionSource::new(&RuntimeConfig::default()).expect("client");
        let records = source
            .fetch(&format!("{base}/wrapped"), &[])
            .await
            .expect("fetch succeeds");
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn reports_status_and_shape_errors() {
        let base = serve().await;
        let source = HttpOptionSource::new(&RuntimeConfig::default())
            .expect("client")
            .with_base_url(base);
        let err = source.fetch("/broken", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));
        let err = source.fetch("/shape", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::UnexpectedShape { .. }));
    }

    #[tokio::test]
    async fn relative_target_needs_a_base() {
        let source = HttpOptionSource::new(&RuntimeConfig::default()).expect("client");
        let err = source.fetch("/cities", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidTarget { .. }));
    }
}
