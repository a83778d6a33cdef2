// SPDX-License-Identifier: MIT

//! Save coordinator - persists the editor's flow to the remote store
//!
//! This module provides:
//! - `SaveCoordinator` - explicit `save_flow` and debounced `auto_save_flow`
//! - `Debouncer` - cancellable delayed task driving auto-save
//! - `SaveReporter` - observer receiving log and decision events
//!
//! Explicit saves surface every failure to the caller. Auto-saves never
//! do: they log and move on so editing is not interrupted. Both paths go
//! through one single-flight lock, so an auto-save firing during an
//! explicit create waits and then updates the flow it created.

mod debounce;
mod report;
mod state;

pub use debounce::Debouncer;
pub use report::{
    BroadcastReporter, ChannelReporter, LogReporter, SaveEvent, SaveReporter, SYSTEM_SENDER,
};
pub use state::SaveStatus;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::config::{Settings, DEFAULT_DEBOUNCE_MS};
use crate::error::{FlowError, Result};
use crate::flow::{
    CreatedFrom, FlowDocument, FlowGraph, FlowId, FlowMeta, FlowRecord, SaveResponse, Scenario,
};
use crate::store::FlowStore;
use state::{Bookkeeping, EditSession, InFlight};

/// Why an auto-save did not reach the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    NoIdentity,
    EmptyGraph,
    StoreNotConfigured,
}

/// Result of one auto-save attempt. Never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum AutoSaveOutcome {
    Skipped(SkipReason),
    Created(FlowId),
    Updated(FlowId),
    Failed(String),
}

struct Inner {
    session_id: Uuid,
    store: Arc<dyn FlowStore>,
    reporter: Arc<dyn SaveReporter>,
    session: RwLock<EditSession>,
    book: RwLock<Bookkeeping>,
    saving: AtomicBool,
    save_lock: Mutex<()>,
    debouncer: Debouncer,
}

/// Handle to one editing session's persistence state
#[derive(Clone)]
pub struct SaveCoordinator {
    inner: Arc<Inner>,
}

impl SaveCoordinator {
    pub fn new(store: Arc<dyn FlowStore>, reporter: Arc<dyn SaveReporter>) -> Self {
        Self::with_debounce(store, reporter, Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    pub fn with_debounce(
        store: Arc<dyn FlowStore>,
        reporter: Arc<dyn SaveReporter>,
        debounce: Duration,
    ) -> Self {
        Self::build(store, reporter, debounce, true, None)
    }

    /// Debounce, initial auto-save flag and owning user taken from settings
    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn FlowStore>,
        reporter: Arc<dyn SaveReporter>,
    ) -> Self {
        Self::build(
            store,
            reporter,
            settings.debounce(),
            settings.auto_save,
            settings.user_id.clone(),
        )
    }

    fn build(
        store: Arc<dyn FlowStore>,
        reporter: Arc<dyn SaveReporter>,
        debounce: Duration,
        auto_save: bool,
        user_id: Option<String>,
    ) -> Self {
        let session_id = Uuid::new_v4();
        log::debug!(
            "Save coordinator {} created (debounce {:?}, auto-save {})",
            session_id,
            debounce,
            auto_save
        );

        Self {
            inner: Arc::new(Inner {
                session_id,
                store,
                reporter,
                session: RwLock::new(EditSession {
                    user_id,
                    ..Default::default()
                }),
                book: RwLock::new(Bookkeeping::new(auto_save)),
                saving: AtomicBool::new(false),
                save_lock: Mutex::new(()),
                debouncer: Debouncer::new(debounce),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub async fn status(&self) -> SaveStatus {
        let book = self.inner.book.read().await;
        SaveStatus {
            session_id: self.inner.session_id,
            flow_id: book.flow_id.clone(),
            auto_save_enabled: book.auto_save_enabled,
            last_saved: book.last_saved,
            saving: self.is_saving(),
        }
    }

    pub async fn flow_id(&self) -> Option<FlowId> {
        self.inner.book.read().await.flow_id.clone()
    }

    /// True only while a store call is outstanding
    pub fn is_saving(&self) -> bool {
        self.inner.saving.load(Ordering::SeqCst)
    }

    pub async fn graph(&self) -> FlowGraph {
        self.inner.session.read().await.graph.clone()
    }

    pub async fn scenario(&self) -> Scenario {
        self.inner.session.read().await.scenario.clone()
    }

    pub async fn set_user(&self, user_id: Option<String>) {
        self.inner.session.write().await.user_id = user_id;
    }

    pub async fn set_auto_save(&self, enabled: bool) {
        self.inner.book.write().await.auto_save_enabled = enabled;
        log::info!(
            "Auto-save {} for session {}",
            if enabled { "enabled" } else { "disabled" },
            self.inner.session_id
        );
    }

    /// Replace the graph and restart the auto-save timer
    pub async fn set_graph(&self, graph: FlowGraph) {
        self.inner.session.write().await.graph = graph;
        self.schedule_auto_save().await;
    }

    /// Replace the scenario and restart the auto-save timer
    pub async fn set_scenario(&self, scenario: Scenario) {
        self.inner.session.write().await.scenario = scenario;
        self.schedule_auto_save().await;
    }

    pub async fn has_pending_auto_save(&self) -> bool {
        self.inner.debouncer.is_pending().await
    }

    async fn schedule_auto_save(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .debouncer
            .schedule(async move {
                // Coordinator dropped while we waited
                if let Some(inner) = weak.upgrade() {
                    SaveCoordinator { inner }.auto_save_flow().await;
                }
            })
            .await;
    }

    /// Explicit save. Creates the flow on first call, updates it afterwards.
    ///
    /// Success and failure are both reported to the `SaveReporter`;
    /// failures are also returned to the caller.
    pub async fn save_flow(&self, meta: &FlowMeta) -> Result<SaveResponse> {
        let _single = self.inner.save_lock.lock().await;

        match self.persist_explicit(meta).await {
            Ok((resp, flow_id)) => {
                log::info!("Flow '{}' saved as {}", meta.name, flow_id);
                self.inner.reporter.report(SaveEvent::log(format!(
                    "Flow saved successfully: {} (ID: {})",
                    meta.name, flow_id
                )));
                self.inner.reporter.report(SaveEvent::system(format!(
                    "Flow \"{}\" saved (ID: {})",
                    meta.name, flow_id
                )));
                Ok(resp)
            }
            Err(e) => {
                log::error!("Failed to save flow '{}': {}", meta.name, e);
                self.inner
                    .reporter
                    .report(SaveEvent::log(format!("Failed to save flow: {}", e)));
                self.inner
                    .reporter
                    .report(SaveEvent::system(format!("Error saving flow: {}", e)));
                Err(e)
            }
        }
    }

    async fn persist_explicit(&self, meta: &FlowMeta) -> Result<(SaveResponse, FlowId)> {
        let document = {
            let session = self.inner.session.read().await;
            let user_id = session.user_id.as_deref().ok_or(FlowError::MissingIdentity)?;
            FlowDocument::new(
                user_id,
                meta,
                &session.graph,
                &session.scenario,
                CreatedFrom::FlowEditor,
            )
        };

        let held = self.flow_id().await;
        let (resp, flow_id, _) = self.write(held, &document).await?;
        self.inner.book.write().await.record_saved(&flow_id);
        Ok((resp, flow_id))
    }

    /// Background save fired by the debouncer. Failures are logged, not returned.
    pub async fn auto_save_flow(&self) -> AutoSaveOutcome {
        if !self.inner.book.read().await.auto_save_enabled {
            return AutoSaveOutcome::Skipped(SkipReason::Disabled);
        }

        let _single = self.inner.save_lock.lock().await;

        // The flag may have been cleared while we waited for the lock
        if !self.inner.book.read().await.auto_save_enabled {
            log::debug!("Auto-save skipped: disabled while waiting to save");
            return AutoSaveOutcome::Skipped(SkipReason::Disabled);
        }

        let document = {
            let session = self.inner.session.read().await;
            let Some(user_id) = session.user_id.as_deref() else {
                log::debug!("Auto-save skipped: no user identity");
                return AutoSaveOutcome::Skipped(SkipReason::NoIdentity);
            };
            if session.graph.is_empty() {
                log::debug!("Auto-save skipped: graph has no nodes");
                return AutoSaveOutcome::Skipped(SkipReason::EmptyGraph);
            }
            FlowDocument::auto_save(user_id, &session.graph, &session.scenario)
        };

        let held = self.flow_id().await;
        let target = self.inner.store.target(held.as_ref());

        match self.write(held, &document).await {
            Ok((_, flow_id, created)) => {
                self.inner.book.write().await.record_saved(&flow_id);
                log::info!(
                    "Auto-saved flow {} ({} nodes, {} edges)",
                    flow_id,
                    document.metadata.node_count,
                    document.metadata.edge_count
                );
                if created {
                    AutoSaveOutcome::Created(flow_id)
                } else {
                    AutoSaveOutcome::Updated(flow_id)
                }
            }
            Err(e) if e.is_config() => {
                log::warn!("Auto-save skipped: {}", e);
                AutoSaveOutcome::Skipped(SkipReason::StoreNotConfigured)
            }
            Err(e) => {
                log::warn!("Auto-save failed: {} (url: {})", e, target);
                AutoSaveOutcome::Failed(e.to_string())
            }
        }
    }

    /// Load a persisted flow into this session and adopt its id
    pub async fn open_flow(&self, flow_id: FlowId) -> Result<FlowRecord> {
        let _single = self.inner.save_lock.lock().await;

        let record = self.inner.store.fetch(&flow_id).await?;

        // A pending auto-save belongs to the graph being replaced
        self.inner.debouncer.cancel().await;

        {
            let mut session = self.inner.session.write().await;
            session.graph = record.flow_data.graph.clone();
            session.scenario = record.flow_data.scenario.clone();
        }
        {
            let mut book = self.inner.book.write().await;
            book.flow_id = Some(record.flow_id.clone().unwrap_or(flow_id));
            book.last_saved = None;
        }

        self.inner.reporter.report(SaveEvent::log(format!(
            "Loaded flow: {} ({} nodes)",
            record.name,
            record.flow_data.graph.node_count()
        )));
        Ok(record)
    }

    /// CREATE without a held id, UPDATE with one. Returns the id the
    /// write applies to and whether it was a create.
    async fn write(
        &self,
        held: Option<FlowId>,
        document: &FlowDocument,
    ) -> Result<(SaveResponse, FlowId, bool)> {
        let _in_flight = InFlight::enter(&self.inner.saving);

        match held {
            Some(flow_id) => {
                let resp = self.inner.store.update(&flow_id, document).await?;
                Ok((resp, flow_id, false))
            }
            None => {
                let resp = self.inner.store.create(document).await?;
                let flow_id = resp.flow_id.clone().ok_or_else(|| {
                    FlowError::invalid_response("create response is missing flow_id")
                })?;
                Ok((resp, flow_id, true))
            }
        }
    }
}
