//! Realtime match updates over Socket.IO.

mod connection;
pub mod messages;
pub mod protocol;

pub use connection::ConnectionManager;
