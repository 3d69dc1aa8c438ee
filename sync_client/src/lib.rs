//! Client half of the collaborative editing protocol.
//!
//! `Reconciler` holds the protocol state of one open file and never does IO,
//! which keeps it testable against a simulated server. `CollabClient` drives
//! it over a websocket and reconnects with exponential backoff.

mod backoff;
mod client;
mod config;
mod connection;
mod document;
mod errors;
mod events;
mod reconciler;
mod typing;

pub use backoff::Backoff;
pub use client::CollabClient;
pub use config::ClientConfig;
pub use connection::{ConnectionState, ConnectionTrigger, Membership};
pub use document::{ClientDocument, PendingState};
pub use errors::ClientError;
pub use events::ClientEvent;
pub use reconciler::{Output, Reconciler};
pub use typing::TypingIndicator;
