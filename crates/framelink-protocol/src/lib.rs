//! Framelink Protocol
//!
//! Wire types shared between the server, the browser peers, and the
//! bench simulator. All WebSocket traffic is JSON discriminated by a
//! `type` field.

pub mod messages;
pub mod types;

pub use messages::{ClientMessage, ServerMessage};
pub use types::{Detection, MetricsSample, MetricsSnapshot, Role, SignalTarget};
