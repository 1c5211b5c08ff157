//! Synchronous publish/subscribe event bus
//!
//! `publish` runs every handler subscribed to the event's topic, in
//! subscription order, on the caller's stack. There is no queue: when
//! `publish` returns, every handler has finished. The first handler that
//! fails stops the dispatch and its error is returned to the publisher
//! wrapped in [`TrackerError::HandlerFault`].
//!
//! Handlers may publish from inside a handler. The handler list is
//! snapshotted when a publish starts, so a handler subscribed during a
//! dispatch only sees later events.

use parking_lot::RwLock;
use sattrack_common::{SatelliteDataUpdate, SatelliteRef, Selection, Topic, ViewKind};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{Result, TrackerError};

/// An event together with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoadElements { path: PathBuf },
    ChangeView(ViewKind),
    LocationAvailable,
    LocationUpdated,
    SatelliteClicked(SatelliteRef),
    ForceUpdate,
    SatelliteDataUpdated(SatelliteDataUpdate),
    NewSatelliteSelected(Selection),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::LoadElements { .. } => Topic::LoadElements,
            Event::ChangeView(_) => Topic::ChangeView,
            Event::LocationAvailable => Topic::LocationAvailable,
            Event::LocationUpdated => Topic::LocationUpdated,
            Event::SatelliteClicked(_) => Topic::SatelliteClicked,
            Event::ForceUpdate => Topic::ForceUpdate,
            Event::SatelliteDataUpdated(_) => Topic::SatelliteDataUpdated,
            Event::NewSatelliteSelected(_) => Topic::NewSatelliteSelected,
        }
    }
}

pub type Handler = Arc<dyn Fn(&Event) -> Result<()> + Send + Sync>;

/// Cloning the bus yields another handle to the same subscriber table
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<Topic, Vec<Handler>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a topic. Handlers live as long as the bus.
    pub fn subscribe<F>(&self, topic: Topic, handler: F)
    where
        F: Fn(&Event) -> Result<()> + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write();
        let list = handlers.entry(topic).or_default();
        list.push(Arc::new(handler));
        tracing::debug!("Subscribed handler #{} to '{}'", list.len() - 1, topic);
    }

    /// Deliver an event to every handler of its topic
    pub fn publish(&self, event: Event) -> Result<()> {
        let topic = event.topic();
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        tracing::trace!("Publishing '{}' to {} handler(s)", topic, handlers.len());

        for (index, handler) in handlers.iter().enumerate() {
            handler(&event).map_err(|source| TrackerError::HandlerFault {
                topic,
                index,
                source: Box::new(source),
            })?;
        }

        Ok(())
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.handlers.read().get(&topic).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read();
        let counts: HashMap<&str, usize> = handlers
            .iter()
            .map(|(topic, list)| (topic.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
