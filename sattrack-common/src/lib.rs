//! Shared data types for the satellite tracker.
//!
//! Everything a renderer or other consumer of tracker events needs to
//! understand lives here, so that it can depend on this crate alone.

pub mod types;

pub use types::*;
