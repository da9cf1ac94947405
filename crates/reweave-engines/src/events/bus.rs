use super::events::{SearchEvent, SearchEventKind};
use super::handlers::EventHandler;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type Subscriber = Arc<Mutex<dyn EventHandler>>;

/// Stamps events with a monotonic timestamp and dispatches them
/// synchronously, in subscription order, on the emitting thread. Cloned
/// buses share their subscribers and time origin, so IPF iteration events
/// published from worker threads interleave with the driver's level
/// events on one timeline.
#[derive(Clone)]
pub struct EventBus {
    handlers: Vec<Subscriber>,
    origin: Instant,
    enabled: bool,
}

impl EventBus {
    pub fn new(handlers: Vec<Subscriber>, enabled: bool) -> Self {
        EventBus {
            handlers,
            origin: Instant::now(),
            enabled,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.handlers.is_empty()
    }

    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }

    pub fn publish(&self, kind: SearchEventKind) {
        if !self.is_active() {
            return;
        }
        let event = SearchEvent {
            at: self.origin.elapsed(),
            kind,
        };
        for handler in &self.handlers {
            if let Ok(mut handler) = handler.lock() {
                handler.handle(&event);
            }
        }
    }
}
