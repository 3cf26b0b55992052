//! Quotewall — Library Root
//!
//! Re-exports all modules for integration tests.

pub mod adapters;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod parsers;
pub mod poller;
pub mod ports;
pub mod store;
pub mod stream;
