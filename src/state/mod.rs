mod alert_timer;
mod client_store;
mod session_events;

pub use client_store::{ClientStore, Mutation, StoreOptions, SESSION_STORAGE_KEY};
pub use session_events::SessionEvents;
