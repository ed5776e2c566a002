pub mod errors;
pub mod filter;
pub mod handler;
pub mod inventory;
pub mod message;
pub mod service;

#[cfg(test)]
mod tests;

pub use errors::{RequestError, RequestResult};
pub use filter::{DataFilter, FilterItem};
pub use handler::{HandlerState, InventoryHandler};
pub use inventory::Inventory;
pub use message::SyncMessage;
pub use service::{InventoryService, RoundStats, SyncEvent};
