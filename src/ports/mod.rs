//! Ports — trait boundaries between the core and its adapters.

pub mod source;

pub use source::QuoteSource;
