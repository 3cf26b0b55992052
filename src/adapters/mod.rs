//! Source Adapters — Upstream Endpoints to Canonical Records
//!
//! One adapter per upstream endpoint. Each builds its request through
//! the shared [`http::HttpFetcher`], hands the body to the matching
//! parser, applies its domain conversions (unit rescaling, symbol
//! mapping), and emits canonical records. Unparsable records are
//! dropped with a log line, never forwarded.

pub mod crypto;
pub mod equities;
pub mod fx;
pub mod http;
pub mod metals;
