// SPDX-License-Identifier: MIT

//! Persisted flow document and remote store payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use super::graph::{FlowGraph, Scenario};
use crate::error;

/// Name used by auto-saves when the scenario has none
pub const UNTITLED_FLOW: &str = "Untitled Flow";
/// Tag attached to every auto-saved document
pub const AUTO_SAVE_TAG: &str = "auto-saved";

/// Identifier assigned by the remote store on first create
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FlowId(String);

impl FlowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FlowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FlowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// Some store deployments hand out integer keys
impl<'de> Deserialize<'de> for FlowId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Ok(Self(s)),
            RawId::Int(n) => Ok(Self(n.to_string())),
        }
    }
}

/// What triggered the save that produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatedFrom {
    /// Explicit save from the editor
    FlowEditor,
    /// Debounced background save
    AutoSave,
}

/// Caller-supplied details for an explicit save
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct FlowMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl FlowMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

/// Graph snapshot plus scenario, the `flow_data` payload
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct FlowData {
    #[serde(flatten)]
    pub graph: FlowGraph,
    #[serde(default)]
    pub scenario: Scenario,
}

/// Derived metadata; counts always mirror `flow_data`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlowMetadata {
    pub node_count: usize,
    pub edge_count: usize,
    pub created_from: CreatedFrom,
    pub last_modified: DateTime<Utc>,
}

/// Body of create and update requests
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FlowDocument {
    pub user_id: String,
    pub name: String,
    pub description: String,
    pub is_public: bool,
    pub tags: BTreeSet<String>,
    pub flow_data: FlowData,
    pub metadata: FlowMetadata,
}

impl FlowDocument {
    /// Build a document from the current editing snapshot
    pub fn new(
        user_id: &str,
        meta: &FlowMeta,
        graph: &FlowGraph,
        scenario: &Scenario,
        created_from: CreatedFrom,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: meta.name.clone(),
            description: meta.description.clone(),
            is_public: meta.is_public,
            tags: meta.tags.clone(),
            flow_data: FlowData {
                graph: graph.clone(),
                scenario: scenario.clone(),
            },
            metadata: FlowMetadata {
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
                created_from,
                last_modified: Utc::now(),
            },
        }
    }

    /// Build the document written by a background save
    pub fn auto_save(user_id: &str, graph: &FlowGraph, scenario: &Scenario) -> Self {
        let name = if scenario.name.trim().is_empty() {
            UNTITLED_FLOW.to_string()
        } else {
            scenario.name.clone()
        };
        let meta = FlowMeta::new(name)
            .with_description(scenario.description.clone())
            .with_tags([AUTO_SAVE_TAG]);

        Self::new(user_id, &meta, graph, scenario, CreatedFrom::AutoSave)
    }
}

/// Response to a create or update call
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct SaveResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_id: Option<FlowId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A flow as returned by the store's fetch endpoint
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct FlowRecord {
    #[serde(default, alias = "id")]
    pub flow_id: Option<FlowId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub flow_data: FlowData,
}

/// Editor state saved to disk, loaded by the `save` command
///
/// YAML or JSON; JSON parses as YAML.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
pub struct FlowDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub scenario: Scenario,
    #[serde(flatten)]
    pub graph: FlowGraph,
}

impl FlowDraft {
    pub fn parse(content: &str) -> error::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn load(path: &Path) -> error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}
