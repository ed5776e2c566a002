pub mod connection;

pub use connection::{CloseReason, ConnectionId, ConnectionRegistry, NetCommand, NetEvent};
