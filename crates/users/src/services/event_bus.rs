//! Named lifecycle events with ordered, synchronous handlers.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::types::{EventContext, EventError, EventName, HandlerError};

pub type EventHandler =
    Arc<dyn Fn(EventName, &mut EventContext) -> Result<(), HandlerError> + Send + Sync>;

/// Handlers are registered while the bus is built; the built bus is shared
/// behind an `Arc` and only ever triggered.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: HashMap<EventName, Vec<EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, event: EventName, handler: F) -> &mut Self
    where
        F: Fn(EventName, &mut EventContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.handlers
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
        self
    }

    /// Registers one handler for every event name.
    pub fn on_all<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(EventName, &mut EventContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let handler: EventHandler = Arc::new(handler);
        for event in EventName::ALL {
            self.handlers
                .entry(event)
                .or_default()
                .push(handler.clone());
        }
        self
    }

    pub fn handler_count(&self, event: EventName) -> usize {
        self.handlers.get(&event).map_or(0, Vec::len)
    }

    /// Runs the handlers of `event` in registration order. The first failure
    /// stops the chain and is returned.
    pub fn trigger(&self, event: EventName, context: &mut EventContext) -> Result<(), EventError> {
        let Some(handlers) = self.handlers.get(&event) else {
            return Ok(());
        };
        debug!(%event, handlers = handlers.len(), subject = context.subject().kind(), "triggering event");
        for handler in handlers {
            handler(event, context).map_err(|source| EventError::new(event, source))?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<(EventName, usize)> = self
            .handlers
            .iter()
            .map(|(event, handlers)| (*event, handlers.len()))
            .collect();
        counts.sort();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
