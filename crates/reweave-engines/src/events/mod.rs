mod bus;
mod events;
mod handlers;

pub use bus::EventBus;
pub use events::{SearchEvent, SearchEventKind};
pub use handlers::{CollectingHandler, EventHandler};
