// SPDX-License-Identifier: MIT

//! Remote flow store boundary
//!
//! The store is an external service; `FlowStore` is the seam the
//! coordinator talks through and `HttpFlowStore` is the REST client
//! used in production.

mod http;

pub use http::HttpFlowStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::flow::{FlowDocument, FlowId, FlowRecord, SaveResponse};

/// Create, update and fetch flow documents on a remote store
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Persist a new flow; the response must carry the assigned `flow_id`
    async fn create(&self, document: &FlowDocument) -> Result<SaveResponse>;

    /// Overwrite an existing flow
    async fn update(&self, flow_id: &FlowId, document: &FlowDocument) -> Result<SaveResponse>;

    /// Load a persisted flow
    async fn fetch(&self, flow_id: &FlowId) -> Result<FlowRecord>;

    /// Human-readable target of a create (`None`) or update, used in diagnostics
    fn target(&self, flow_id: Option<&FlowId>) -> String;
}
