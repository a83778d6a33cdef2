// SPDX-License-Identifier: MIT

//! flowsync-rs - flow persistence and debounced auto-save for a
//! multi-agent flow editor.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod flow;
pub mod server;
pub mod store;

pub use coordinator::{AutoSaveOutcome, SaveCoordinator, SaveEvent, SaveReporter, SkipReason};
pub use error::{ConfigError, FlowError};
pub use store::{FlowStore, HttpFlowStore};
