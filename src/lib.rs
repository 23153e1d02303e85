//! Random color service
//!
//! Turns three random bytes from a downstream random service into an RGB
//! color, with a separate admin listener for probes, metrics and build info.

pub mod config;
pub mod random;
pub mod server;
