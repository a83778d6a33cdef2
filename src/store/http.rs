// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::FlowStore;
use crate::config::{self, Settings};
use crate::error::{ConfigError, FlowError, Result};
use crate::flow::{FlowDocument, FlowId, FlowRecord, SaveResponse};

/// REST client for the remote flow store
///
/// The base URL may be absent; requests then fail with a configuration
/// error instead of a transport error.
#[derive(Clone)]
pub struct HttpFlowStore {
    client: Client,
    base_url: Option<String>,
}

impl HttpFlowStore {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base_url = base_url
            .map(|raw| {
                config::parse_base_url(raw)
                    .map(|url| url.as_str().trim_end_matches('/').to_string())
            })
            .transpose()?;

        log::info!(
            "Flow store client: base_url={}",
            base_url.as_deref().unwrap_or("<unset>")
        );

        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.api_base_url.as_deref())
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some()
    }

    fn url(&self, path: &str) -> Result<String> {
        let base = self.base_url.as_ref().ok_or(ConfigError::MissingBaseUrl)?;
        Ok(format!("{}/{}", base, path))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&FlowDocument>,
    ) -> Result<T> {
        let url = self.url(path)?;
        log::debug!("Flow store request: {} {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json");

        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(FlowError::api(status.as_u16(), text));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl FlowStore for HttpFlowStore {
    async fn create(&self, document: &FlowDocument) -> Result<SaveResponse> {
        let resp: SaveResponse = self
            .request(Method::POST, "flows/save", Some(document))
            .await?;

        if resp.flow_id.is_none() {
            return Err(FlowError::invalid_response(
                "create response is missing flow_id",
            ));
        }
        Ok(resp)
    }

    async fn update(&self, flow_id: &FlowId, document: &FlowDocument) -> Result<SaveResponse> {
        self.request(Method::PUT, &format!("flows/{}", flow_id), Some(document))
            .await
    }

    async fn fetch(&self, flow_id: &FlowId) -> Result<FlowRecord> {
        let json: Value = self
            .request(Method::GET, &format!("flows/{}", flow_id), None)
            .await?;

        // Either the bare document or wrapped as {"flow": {...}}
        let record = match json {
            Value::Object(mut obj) if obj.get("flow").is_some_and(Value::is_object) => obj
                .remove("flow")
                .ok_or_else(|| FlowError::invalid_response("missing flow"))?,
            other => other,
        };

        let mut record: FlowRecord = serde_json::from_value(record)?;
        if record.flow_id.is_none() {
            record.flow_id = Some(flow_id.clone());
        }
        Ok(record)
    }

    fn target(&self, flow_id: Option<&FlowId>) -> String {
        let path = match flow_id {
            Some(id) => format!("flows/{}", id),
            None => "flows/save".to_string(),
        };
        self.url(&path)
            .unwrap_or_else(|_| format!("<{} unset>/{}", config::ENV_BASE_URL, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{CreatedFrom, FlowGraph, FlowMeta, FlowNode, Scenario};
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type Seen = Arc<Mutex<Vec<(String, Value)>>>;

    /// Start a fake flow store and return its base URL
    async fn fake_store(seen: Seen) -> String {
        async fn save(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
            seen.lock().await.push(("POST /flows/save".into(), body));
            Json(json!({"flow_id": "flow-123", "message": "saved"}))
        }

        async fn update(
            State(seen): State<Seen>,
            Path(id): Path<String>,
            Json(body): Json<Value>,
        ) -> (StatusCode, Json<Value>) {
            if id == "missing" {
                return (StatusCode::NOT_FOUND, Json(json!({"detail": "no such flow"})));
            }
            seen.lock().await.push((format!("PUT /flows/{}", id), body));
            (StatusCode::OK, Json(json!({"success": true})))
        }

        async fn fetch(Path(id): Path<String>) -> Json<Value> {
            Json(json!({
                "flow": {
                    "name": "Stored",
                    "flow_data": {"nodes": [{"id": "a"}], "edges": [], "scenario": {"name": "S"}}
                },
                "requested": id
            }))
        }

        let app = Router::new()
            .route("/api/flows/save", post(save))
            .route("/api/flows/{flow_id}", get(fetch).put(update))
            .with_state(seen);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/api/", addr)
    }

    fn document() -> FlowDocument {
        FlowDocument::new(
            "user-1",
            &FlowMeta::new("Demo Flow"),
            &FlowGraph::new(vec![FlowNode::new("a")], vec![]),
            &Scenario::new("Demo", ""),
            CreatedFrom::FlowEditor,
        )
    }

    #[tokio::test]
    async fn test_create_posts_document() {
        let seen: Seen = Arc::default();
        let base = fake_store(seen.clone()).await;
        let store = HttpFlowStore::new(Some(&base)).unwrap();

        let resp = store.create(&document()).await.unwrap();
        assert_eq!(resp.flow_id, Some(FlowId::from("flow-123")));

        let seen = seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "POST /flows/save");
        assert_eq!(seen[0].1["metadata"]["node_count"], 1);
    }

    #[tokio::test]
    async fn test_update_puts_to_flow_path() {
        let seen: Seen = Arc::default();
        let base = fake_store(seen.clone()).await;
        let store = HttpFlowStore::new(Some(&base)).unwrap();

        let resp = store
            .update(&FlowId::from("flow-9"), &document())
            .await
            .unwrap();
        assert!(resp.flow_id.is_none());
        assert_eq!(seen.lock().await[0].0, "PUT /flows/flow-9");
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let base = fake_store(Arc::default()).await;
        let store = HttpFlowStore::new(Some(&base)).unwrap();

        let err = store
            .update(&FlowId::from("missing"), &document())
            .await
            .unwrap_err();
        match err {
            FlowError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("no such flow"));
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_unwraps_envelope() {
        let base = fake_store(Arc::default()).await;
        let store = HttpFlowStore::new(Some(&base)).unwrap();

        let record = store.fetch(&FlowId::from("flow-5")).await.unwrap();
        assert_eq!(record.name, "Stored");
        assert_eq!(record.flow_id, Some(FlowId::from("flow-5")));
        assert_eq!(record.flow_data.graph.node_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_base_url_is_config_error() {
        let store = HttpFlowStore::new(None).unwrap();
        assert!(!store.is_configured());

        let err = store.create(&document()).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = HttpFlowStore::new(Some(&format!("http://{}", addr))).unwrap();
        let err = store.create(&document()).await.unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_target_urls() {
        let store = HttpFlowStore::new(Some("http://localhost:8000/api/")).unwrap();
        assert_eq!(store.target(None), "http://localhost:8000/api/flows/save");
        assert_eq!(
            store.target(Some(&FlowId::from("f1"))),
            "http://localhost:8000/api/flows/f1"
        );

        let unset = HttpFlowStore::new(None).unwrap();
        assert!(unset.target(None).contains("FLOW_API_BASE_URL"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(HttpFlowStore::new(Some("localhost:8000")).is_err());
    }
}
