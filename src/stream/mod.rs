//! FX Streaming — Push Channel with REST Failover
//!
//! The FX source is the only upstream offering a push channel. While it
//! is healthy it is the sole FX source; when it drops, a debounced
//! failover hands control back to the REST poller until the channel
//! recovers.

pub mod channel;
pub mod controller;

pub use channel::{ChannelEvent, FxStreamChannel};
pub use controller::{ActiveSource, ChannelState, FailoverController};
