// SPDX-License-Identifier: MIT

//! Bookkeeping owned by a single save coordinator

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::flow::{FlowGraph, FlowId, Scenario};

/// Read-only snapshot of coordinator state for status displays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveStatus {
    pub session_id: Uuid,
    pub flow_id: Option<FlowId>,
    pub auto_save_enabled: bool,
    pub last_saved: Option<DateTime<Utc>>,
    pub saving: bool,
}

/// What the editor currently shows
#[derive(Debug, Clone, Default)]
pub(crate) struct EditSession {
    pub user_id: Option<String>,
    pub graph: FlowGraph,
    pub scenario: Scenario,
}

#[derive(Debug, Clone)]
pub(crate) struct Bookkeeping {
    pub flow_id: Option<FlowId>,
    pub auto_save_enabled: bool,
    pub last_saved: Option<DateTime<Utc>>,
}

impl Bookkeeping {
    pub fn new(auto_save_enabled: bool) -> Self {
        Self {
            flow_id: None,
            auto_save_enabled,
            last_saved: None,
        }
    }

    /// Record a successful write. The id is only taken on first create.
    pub fn record_saved(&mut self, flow_id: &FlowId) {
        if self.flow_id.is_none() {
            self.flow_id = Some(flow_id.clone());
        }
        self.last_saved = Some(Utc::now());
    }
}

/// Holds the in-progress flag up for as long as it lives
pub(crate) struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    pub fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_is_assigned_once() {
        let mut book = Bookkeeping::new(true);
        book.record_saved(&FlowId::from("first"));
        let first_saved = book.last_saved;

        book.record_saved(&FlowId::from("second"));
        assert_eq!(book.flow_id, Some(FlowId::from("first")));
        assert!(book.last_saved >= first_saved);
    }

    #[test]
    fn test_in_flight_resets_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = InFlight::enter(&flag);
            assert!(flag.load(Ordering::SeqCst));
        }
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_in_flight_resets_on_early_return() {
        fn write(flag: &AtomicBool, fail: bool) -> Result<(), &'static str> {
            let _guard = InFlight::enter(flag);
            if fail {
                return Err("transport");
            }
            Ok(())
        }

        let flag = AtomicBool::new(false);
        assert!(write(&flag, true).is_err());
        assert!(!flag.load(Ordering::SeqCst));
        assert!(write(&flag, false).is_ok());
        assert!(!flag.load(Ordering::SeqCst));
    }
}
