//! Format Parsers — Source-specific Payload Decoding
//!
//! Pure functions from raw response text to typed intermediate records.
//! No I/O, no shared state; every parser fails closed, returning a
//! `ParseError` the adapter logs and drops instead of forwarding a
//! partially-populated record.
//!
//! Encoding note: the two regional upstreams (delimited ticker and quote
//! center) respond in GBK, which `adapters::http` decodes before any of
//! these functions run. Prices are ASCII-safe either way; instrument
//! names are not.

pub mod delimited;
pub mod json_ticker;
pub mod quote_center;
pub mod rate_table;
