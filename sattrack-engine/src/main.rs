use sattrack_engine::config::{self, TrackingSettings};
use sattrack_engine::sat::ElementCatalog;
use sattrack_engine::session::ConfiguredObserver;
use sattrack_engine::sky::LowPrecisionEphemeris;
use sattrack_engine::view::{Renderer, TracingRenderer};
use sattrack_engine::{Collaborators, Event, EventBus, Orchestrator};

use anyhow::{Context, Result};
use sattrack_common::{Selection, Topic, ViewKind};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration
    let config_source = config::read_config()?;
    let config = config::CONFIG
        .get()
        .context("Configuration was not loaded")?;

    // Initialize logging
    let _logging_guard = sattrack_engine::logging::init_logging(
        &config.log_dir,
        "sattrack",
        &config.log_level,
        config.log_retention_days,
    )?;

    tracing::info!("Satellite tracker starting...");
    match &config_source {
        Some(path) => tracing::info!("Configuration loaded from {}", path),
        None => tracing::info!("No configuration file found, using defaults"),
    }

    let bus = EventBus::new();
    let catalog = Arc::new(ElementCatalog::new());
    let observer_provider = Arc::new(ConfiguredObserver::new(config.observer.clone()));

    let tracker = Orchestrator::new(
        bus.clone(),
        Collaborators {
            propagator: catalog.clone(),
            elements: catalog.clone(),
            ephemeris: Arc::new(LowPrecisionEphemeris),
            observer_provider,
            settings: Arc::new(TrackingSettings::from(&config.tracking)),
        },
    );

    // One headless renderer per view; only the active one logs updates
    let mut renderers: Vec<(ViewKind, Arc<dyn Renderer>)> = Vec::new();
    for kind in ViewKind::ALL {
        let renderer = Arc::new(TracingRenderer::new(kind));
        let handler = renderer.clone();
        bus.subscribe(Topic::SatelliteDataUpdated, move |event| handler.on_update(event));
        renderers.push((kind, renderer as Arc<dyn Renderer>));
    }

    let initial_view = tracker.init(renderers).context("Failed to initialize tracker")?;
    tracing::info!("Initial view: {}", initial_view);

    if let Some(file) = &config.tracking.elements_file {
        let path = PathBuf::from(file);
        if let Err(e) = bus.publish(Event::LoadElements { path }) {
            tracing::error!("Failed to load element file {}: {}", file, e);
        }
    }

    if !config.tracking.initial_selection.is_empty() {
        let mut selected = Vec::new();
        for catalog_number in &config.tracking.initial_selection {
            match catalog.find(*catalog_number) {
                Some(satellite) => selected.push(satellite),
                None => tracing::warn!("Satellite {} is not in the element file", catalog_number),
            }
        }
        tracing::info!("{} satellite(s) selected at startup", selected.len());
        tracker.set_selected(Selection::from(selected));
    }

    // The configured observer already has its fix; announcing it opens the gate
    bus.publish(Event::LocationAvailable)
        .context("Failed to start tracking")?;

    let phase = tracker.moon_phase();
    tracing::info!(
        "Moon phase: {} ({:.0}% illuminated)",
        phase.name(),
        phase.illumination * 100.0
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");

    Ok(())
}
