use super::events::SearchEvent;

/// Receives progress events. Level events arrive on the driver thread,
/// but IPF iteration events may arrive from worker threads, so handlers
/// must be `Send`. Handlers should not block for long; the bus dispatches
/// synchronously on the emitting thread.
pub trait EventHandler: Send {
    fn handle(&mut self, event: &SearchEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&SearchEvent) + Send,
{
    fn handle(&mut self, event: &SearchEvent) {
        (self)(event)
    }
}

/// Buffers every event it sees; mostly useful in tests.
#[derive(Default)]
pub struct CollectingHandler {
    pub events: Vec<SearchEvent>,
}

impl EventHandler for CollectingHandler {
    fn handle(&mut self, event: &SearchEvent) {
        self.events.push(event.clone());
    }
}
