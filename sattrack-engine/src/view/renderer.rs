use sattrack_common::ViewKind;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bus::Event;
use crate::error::Result;

/// Rendering capability bound to a view. Both hooks must tolerate being
/// called twice in a row.
pub trait Renderer: Send + Sync {
    fn start_rendering(&self);
    fn stop_rendering(&self);
}

/// Headless renderer that writes every satellite data update it receives
/// while active to the log
#[derive(Debug)]
pub struct TracingRenderer {
    kind: ViewKind,
    rendering: AtomicBool,
}

impl TracingRenderer {
    pub fn new(kind: ViewKind) -> Self {
        Self {
            kind,
            rendering: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn is_rendering(&self) -> bool {
        self.rendering.load(Ordering::Acquire)
    }

    /// Bus handler for `satellite-data-updated`
    pub fn on_update(&self, event: &Event) -> Result<()> {
        let Event::SatelliteDataUpdated(update) = event else {
            return Ok(());
        };
        if !self.is_rendering() {
            return Ok(());
        }

        if update.selection.is_empty() {
            tracing::info!("[{}] No satellite selected", self.kind);
        } else {
            for position in &update.positions {
                tracing::info!(
                    "[{}] {} az {:.1} el {:.1} range {:.0} km, sub-point {:.2}, {:.2} at {:.0} km ({})",
                    self.kind,
                    position.satellite,
                    position.azimuth,
                    position.elevation,
                    position.range_km,
                    position.latitude,
                    position.longitude,
                    position.altitude_km,
                    if position.is_visible() { "visible" } else { "below horizon" }
                );
            }
            if update.positions.is_empty() {
                if let Some(primary) = update.selection.primary() {
                    tracing::warn!("[{}] No data for {}", self.kind, primary);
                }
            } else if update.is_partial() {
                tracing::warn!(
                    "[{}] Only {} of {} selected satellites have data",
                    self.kind,
                    update.positions.len(),
                    update.selection.len()
                );
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            let json = serde_json::to_string(update).map_err(anyhow::Error::from)?;
            tracing::debug!("[{}] update {}: {}", self.kind, update.update_id, json);
        }

        Ok(())
    }
}

impl Renderer for TracingRenderer {
    fn start_rendering(&self) {
        if !self.rendering.swap(true, Ordering::AcqRel) {
            tracing::debug!("View '{}' started rendering", self.kind);
        }
    }

    fn stop_rendering(&self) {
        if self.rendering.swap(false, Ordering::AcqRel) {
            tracing::debug!("View '{}' stopped rendering", self.kind);
        }
    }
}
