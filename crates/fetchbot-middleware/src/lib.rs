//! `fetchbot-middleware` – Transport & Event Plumbing
//!
//! Moves data in and out of the behavior core without interpreting it.
//!
//! # Modules
//!
//! - [`bus`] – [`EventBus`]: topic-based broadcast of behavior events
//!   (mode armed/cleared, turns, proximity breaches, faults) built on Tokio
//!   broadcast channels.
//! - [`transport`] – directive wire decoding ([`decode_payload`]) and a
//!   newline-delimited [`LineTransport`] that frames payloads and connection
//!   lifecycle events from any reader.

pub mod bus;
pub mod transport;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use transport::{LineTransport, TransportEvent, decode_payload};
