use parking_lot::Mutex;
use sattrack_common::ViewKind;
use std::sync::Arc;

use super::Renderer;
use crate::error::{Result, TrackerError};
use crate::gate::InitGate;
use crate::scheduler::ForceRefresh;

/// A registered view
#[derive(Clone)]
pub struct ViewDescriptor {
    pub kind: ViewKind,
    /// Display order
    pub index: usize,
    pub active: bool,
    renderer: Arc<dyn Renderer>,
}

impl ViewDescriptor {
    pub fn renderer(&self) -> &Arc<dyn Renderer> {
        &self.renderer
    }
}

impl std::fmt::Debug for ViewDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewDescriptor")
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// The fixed set of views. At most one is active; only [`ViewRegistry::activate`]
/// changes which.
pub struct ViewRegistry {
    views: Mutex<Vec<ViewDescriptor>>,
    gate: Arc<InitGate>,
    refresher: Arc<dyn ForceRefresh>,
}

impl ViewRegistry {
    pub fn new(gate: Arc<InitGate>, refresher: Arc<dyn ForceRefresh>) -> Self {
        Self {
            views: Mutex::new(Vec::new()),
            gate,
            refresher,
        }
    }

    /// Add a view at startup. The view starts inactive.
    pub fn register_view(&self, kind: ViewKind, renderer: Arc<dyn Renderer>) -> Result<()> {
        let mut views = self.views.lock();
        if views.iter().any(|v| v.kind == kind) {
            return Err(TrackerError::DuplicateView(kind));
        }

        views.push(ViewDescriptor {
            kind,
            index: kind.tab_index(),
            active: false,
            renderer,
        });
        views.sort_by_key(|v| v.index);

        tracing::debug!("Registered view '{}' at tab {}", kind, kind.tab_index());
        Ok(())
    }

    /// Make `kind` the only active view. Stop hooks of the previously active
    /// view run before the start hook of the new one. Once the gate is open
    /// the switch is followed by a forced recompute.
    pub fn activate(&self, kind: ViewKind) -> Result<()> {
        let (stopping, starting) = {
            let mut views = self.views.lock();
            let Some(target) = views.iter().position(|v| v.kind == kind) else {
                return Err(TrackerError::UnknownView(kind));
            };

            let mut stopping = Vec::new();
            for view in views.iter_mut().filter(|v| v.active) {
                view.active = false;
                stopping.push(view.renderer.clone());
            }

            views[target].active = true;
            (stopping, views[target].renderer.clone())
        };

        // Hooks run outside the lock so a renderer may query the registry
        for renderer in stopping {
            renderer.stop_rendering();
        }
        starting.start_rendering();

        tracing::info!("Active view is now '{}'", kind);

        if self.gate.is_ready() {
            self.refresher.force_recompute()?;
        }
        Ok(())
    }

    pub fn active_view(&self) -> Option<ViewDescriptor> {
        self.views.lock().iter().find(|v| v.active).cloned()
    }

    /// Registered views in display order
    pub fn views(&self) -> Vec<ViewDescriptor> {
        self.views.lock().clone()
    }

    /// The registered view that should be shown first
    pub fn default_view(&self) -> Option<ViewKind> {
        self.views
            .lock()
            .iter()
            .map(|v| v.kind)
            .find(ViewKind::is_default_active)
    }
}
