// SPDX-License-Identifier: MIT

//! Status reporting from the coordinator to whoever drives the editor

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

/// Sender name used on decision records the coordinator emits
pub const SYSTEM_SENDER: &str = "System";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SaveEvent {
    /// Free-form line for the activity log
    Log(String),
    /// Entry for the decision/chat panel
    Decision {
        sender: String,
        text: String,
        is_system: bool,
    },
}

impl SaveEvent {
    pub fn log(text: impl Into<String>) -> Self {
        Self::Log(text.into())
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::Decision {
            sender: SYSTEM_SENDER.to_string(),
            text: text.into(),
            is_system: true,
        }
    }
}

/// Fire-and-forget observer for save notifications
pub trait SaveReporter: Send + Sync {
    fn report(&self, event: SaveEvent);
}

/// Writes events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl SaveReporter for LogReporter {
    fn report(&self, event: SaveEvent) {
        match event {
            SaveEvent::Log(text) => log::info!("{}", text),
            SaveEvent::Decision { sender, text, .. } => log::info!("[{}] {}", sender, text),
        }
    }
}

/// Forwards events into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<SaveEvent>,
}

impl ChannelReporter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SaveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SaveReporter for ChannelReporter {
    fn report(&self, event: SaveEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

/// Fans events out to any number of subscribers (server-sent events)
#[derive(Debug, Clone)]
pub struct BroadcastReporter {
    tx: broadcast::Sender<SaveEvent>,
}

impl BroadcastReporter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SaveEvent> {
        self.tx.subscribe()
    }
}

impl SaveReporter for BroadcastReporter {
    fn report(&self, event: SaveEvent) {
        log::debug!("Broadcasting save event to {} subscriber(s)", self.tx.receiver_count());
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_reporter_preserves_order() {
        let (reporter, mut rx) = ChannelReporter::new();
        reporter.report(SaveEvent::log("first"));
        reporter.report(SaveEvent::system("second"));

        assert_eq!(rx.try_recv().unwrap(), SaveEvent::Log("first".into()));
        assert_eq!(
            rx.try_recv().unwrap(),
            SaveEvent::Decision {
                sender: "System".into(),
                text: "second".into(),
                is_system: true,
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_reporter_survives_dropped_receiver() {
        let (reporter, rx) = ChannelReporter::new();
        drop(rx);
        reporter.report(SaveEvent::log("nobody listening"));
    }

    #[test]
    fn test_broadcast_reporter_fans_out() {
        let reporter = BroadcastReporter::new(8);
        let mut a = reporter.subscribe();
        let mut b = reporter.subscribe();

        reporter.report(SaveEvent::log("saved"));

        assert_eq!(a.try_recv().unwrap(), SaveEvent::Log("saved".into()));
        assert_eq!(b.try_recv().unwrap(), SaveEvent::Log("saved".into()));
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(SaveEvent::system("done")).unwrap();
        assert_eq!(json["Decision"]["sender"], "System");
        assert_eq!(json["Decision"]["is_system"], true);
    }
}
