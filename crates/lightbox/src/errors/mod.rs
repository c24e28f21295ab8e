//! Error handling for the engine.
//!
//! Library code returns typed errors; the binary wraps them in `anyhow`
//! with context. Cache faults never appear here at all: the tier manager
//! downgrades them to misses and logged warnings.

pub mod types;

pub use types::{FetchError, FetchResult};
