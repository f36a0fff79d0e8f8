//! WebSocket stream client.
//!
//! The subscription/decode pipeline is exchange-specific glue, but its
//! dialer shares `dataminer-http`'s IP-pool pinning contract, so it lives
//! alongside the HTTP client rather than bolted onto an adapter.

mod client;
mod dial;
mod error;
mod frame;

pub use client::{StreamClient, StreamClientConfig};
pub use dial::connect_pinned;
pub use error::{WsError, WsProtocolError};
pub use frame::decode_frame;
