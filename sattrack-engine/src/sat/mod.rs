//! Satellite element sets and propagation
//!
//! The scheduler only sees the two traits below; [`ElementCatalog`] is the
//! SGP4-backed implementation of both.

mod catalog;
pub mod geometry;

pub use catalog::{CatalogEntry, ElementCatalog};

use chrono::{DateTime, Utc};
use sattrack_common::{SatellitePosition, SatelliteRef, Selection};
use std::path::Path;

use crate::error::Result;
use crate::session::Observer;

/// Turns element sets into positions
pub trait PropagationEngine: Send + Sync {
    /// Positions of every selected satellite at `time`, as seen from
    /// `observer`. An empty selection yields an empty result.
    fn compute_all(
        &self,
        time: DateTime<Utc>,
        observer: &Observer,
        selection: &Selection,
    ) -> Result<Vec<SatellitePosition>>;
}

/// Loads element-set files and answers satellite lookups
pub trait ElementStore: Send + Sync {
    /// Replace the loaded satellites with the contents of `path`.
    /// Returns how many satellites were loaded.
    fn load(&self, path: &Path) -> Result<usize>;

    fn satellites(&self) -> Vec<SatelliteRef>;

    fn satellite(&self, index: usize) -> Option<SatelliteRef> {
        self.satellites().get(index).cloned()
    }
}
