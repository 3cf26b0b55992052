//! Core quote domain types.
//!
//! The canonical record shapes every upstream source is normalized into.
//! The inner ring of the hexagonal architecture — no transport, no
//! encoding, no scheduling concerns here.

pub mod quote;

pub use quote::{
    change_against, now_ms, CanonicalQuote, CryptoQuote, EquityQuote, FxQuote,
    InstrumentClass,
};
