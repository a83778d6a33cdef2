// SPDX-License-Identifier: MIT

//! Flow data model
//!
//! This module provides:
//! - `FlowGraph` - the editor's nodes and edges
//! - `FlowDocument` - the persisted shape sent to the remote store
//! - `FlowId` - identifier assigned by the store on first create

mod document;
mod graph;

pub use document::{
    CreatedFrom, FlowData, FlowDocument, FlowDraft, FlowId, FlowMeta, FlowMetadata, FlowRecord,
    SaveResponse, AUTO_SAVE_TAG, UNTITLED_FLOW,
};
pub use graph::{FlowEdge, FlowGraph, FlowNode, Position, Scenario};
