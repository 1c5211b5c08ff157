//! Tracker orchestrator
//!
//! Builds the shared session, the gate, the sun/moon facade, the scheduler
//! and the view registry, and routes inbound bus events to them:
//!
//! | topic                 | effect                                              |
//! |-----------------------|-----------------------------------------------------|
//! | `load-elements`       | element store loads the file                        |
//! | `change-view`         | registry activates the view                         |
//! | `location-available`  | gate opens, calculation loop starts (needs a fix)   |
//! | `location-updated`    | same as `location-available`                        |
//! | `satellite-clicked`   | selection set, forced recompute, `new-satellite-selected` |
//! | `force-update`        | forced recompute                                    |
//!
//! The orchestrator is the only writer of the observer list and the
//! selection.

use sattrack_common::{
    CelestialPosition, GeoLocation, MoonPhase, SatellitePosition, SatelliteRef, Selection, Topic,
    ViewKind,
};
use std::path::Path;
use std::sync::Arc;

use crate::bus::{Event, EventBus};
use crate::config::TrackingSettings;
use crate::error::{Result, TrackerError};
use crate::gate::InitGate;
use crate::sat::{ElementStore, PropagationEngine};
use crate::scheduler::{CalculationScheduler, ForceRefresh};
use crate::session::{Observer, ObserverProvider, Session};
use crate::sky::{CelestialEphemeris, PositionFacade};
use crate::view::{Renderer, ViewDescriptor, ViewRegistry};

/// External engines the tracker depends on
pub struct Collaborators {
    pub propagator: Arc<dyn PropagationEngine>,
    pub elements: Arc<dyn ElementStore>,
    pub ephemeris: Arc<dyn CelestialEphemeris>,
    pub observer_provider: Arc<dyn ObserverProvider>,
    pub settings: Arc<TrackingSettings>,
}

pub struct Orchestrator {
    bus: EventBus,
    session: Arc<Session>,
    gate: Arc<InitGate>,
    facade: Arc<PositionFacade>,
    scheduler: Arc<CalculationScheduler>,
    registry: ViewRegistry,
    elements: Arc<dyn ElementStore>,
    observer_provider: Arc<dyn ObserverProvider>,
}

impl Orchestrator {
    pub fn new(bus: EventBus, collaborators: Collaborators) -> Arc<Self> {
        let session = Arc::new(Session::new());
        let gate = Arc::new(InitGate::new());
        let facade = Arc::new(PositionFacade::new(
            collaborators.ephemeris,
            session.clone(),
        ));
        let scheduler = CalculationScheduler::new(
            bus.clone(),
            session.clone(),
            facade.clone(),
            collaborators.propagator,
            collaborators.settings,
        );
        let registry = ViewRegistry::new(gate.clone(), scheduler.clone());

        Arc::new(Self {
            bus,
            session,
            gate,
            facade,
            scheduler,
            registry,
            elements: collaborators.elements,
            observer_provider: collaborators.observer_provider,
        })
    }

    /// Register the views, create the home observer, bind the event routes
    /// and activate the default view. Returns the view that was activated.
    pub fn init<I>(self: &Arc<Self>, renderers: I) -> Result<ViewKind>
    where
        I: IntoIterator<Item = (ViewKind, Arc<dyn Renderer>)>,
    {
        for (kind, renderer) in renderers {
            self.registry.register_view(kind, renderer)?;
        }

        let observer = self.observer_provider.init();
        tracing::info!("Home observer '{}' created", observer.name);
        self.session.set_home_observer(observer);

        self.bind(Topic::LoadElements, |this, event| match event {
            Event::LoadElements { path } => this.on_load_elements(path),
            _ => Ok(()),
        });
        self.bind(Topic::ChangeView, |this, event| match event {
            Event::ChangeView(kind) => this.registry.activate(*kind),
            _ => Ok(()),
        });
        self.bind(Topic::LocationAvailable, |this, _| this.on_location());
        self.bind(Topic::LocationUpdated, |this, _| this.on_location());
        self.bind(Topic::SatelliteClicked, |this, event| match event {
            Event::SatelliteClicked(satellite) => this.on_satellite_clicked(satellite),
            _ => Ok(()),
        });
        self.bind(Topic::ForceUpdate, |this, _| this.force_if_ready());

        let initial = self
            .registry
            .default_view()
            .or_else(|| self.registry.views().first().map(|v| v.kind))
            .ok_or_else(|| TrackerError::Other(anyhow::anyhow!("No views registered")))?;
        self.bus.publish(Event::ChangeView(initial))?;

        tracing::info!("Tracker initialized, initial view '{}'", initial);
        Ok(initial)
    }

    /// Subscribe a handler that holds the orchestrator weakly
    fn bind<F>(self: &Arc<Self>, topic: Topic, handler: F)
    where
        F: Fn(&Orchestrator, &Event) -> Result<()> + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(self);
        self.bus.subscribe(topic, move |event| match weak.upgrade() {
            Some(this) => handler(&this, event),
            None => Ok(()),
        });
    }

    fn on_load_elements(&self, path: &Path) -> Result<()> {
        let count = self.elements.load(path)?;
        tracing::info!("{} satellites available from {:?}", count, path);
        Ok(())
    }

    fn on_location(&self) -> Result<()> {
        if self.session.home_location().is_none() {
            tracing::warn!("Location event received but the home observer has no fix yet");
            return Ok(());
        }

        self.gate.open();
        self.scheduler.ensure_running()?;
        Ok(())
    }

    fn on_satellite_clicked(&self, satellite: &SatelliteRef) -> Result<()> {
        tracing::info!("Satellite {} selected", satellite);
        self.session.set_selection(Selection::single(satellite.clone()));
        self.force_if_ready()?;
        self.bus
            .publish(Event::NewSatelliteSelected(self.session.selection()))
    }

    /// Before the observer is known a forced recompute could only fail
    fn force_if_ready(&self) -> Result<()> {
        if self.gate.is_ready() {
            self.scheduler.force_recompute()
        } else {
            tracing::debug!("Observer location not known yet, recompute skipped");
            Ok(())
        }
    }

    /// Set the home observer's location and announce it on the bus:
    /// `location-available` the first time, `location-updated` afterwards
    pub fn update_home_location(&self, location: GeoLocation) -> Result<()> {
        let first = self.session.set_home_location(location);
        tracing::info!(
            "Home location set to {:.4}, {:.4}",
            location.latitude,
            location.longitude
        );

        if first {
            self.bus.publish(Event::LocationAvailable)
        } else {
            self.bus.publish(Event::LocationUpdated)
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn selected(&self) -> Selection {
        self.session.selection()
    }

    /// Replace the selection without recomputing; the next tick picks it up
    pub fn set_selected(&self, selection: Selection) {
        self.session.set_selection(selection);
    }

    pub fn satellites(&self) -> Vec<SatelliteRef> {
        self.elements.satellites()
    }

    pub fn satellite(&self, index: usize) -> Option<SatelliteRef> {
        self.elements.satellite(index)
    }

    pub fn observers(&self) -> Vec<Observer> {
        self.session.observers()
    }

    pub fn moon(&self) -> Result<CelestialPosition> {
        self.facade.current_moon()
    }

    pub fn sun(&self) -> Result<CelestialPosition> {
        self.facade.current_sun()
    }

    pub fn moon_phase(&self) -> MoonPhase {
        self.facade.moon_phase()
    }

    pub fn positions(&self) -> Vec<SatellitePosition> {
        self.session.positions()
    }

    pub fn active_view(&self) -> Option<ViewDescriptor> {
        self.registry.active_view()
    }

    pub fn views(&self) -> Vec<ViewDescriptor> {
        self.registry.views()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObserverConfig;
    use crate::sat::ElementCatalog;
    use crate::session::ConfiguredObserver;
    use crate::sky::LowPrecisionEphemeris;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const ISS_TLE: &str = "ISS (ZARYA)
1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927
2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537
";

    struct NullRenderer;

    impl Renderer for NullRenderer {
        fn start_rendering(&self) {}
        fn stop_rendering(&self) {}
    }

    struct HomeProvider;

    impl ObserverProvider for HomeProvider {
        fn init(&self) -> Observer {
            Observer::new("Home")
        }
    }

    /// Counts calls and returns nothing, so every tick is a successful
    /// empty computation
    #[derive(Default)]
    struct CountingPropagator {
        calls: AtomicUsize,
    }

    impl PropagationEngine for CountingPropagator {
        fn compute_all(
            &self,
            _time: DateTime<Utc>,
            observer: &Observer,
            _selection: &Selection,
        ) -> Result<Vec<SatellitePosition>> {
            observer.location.ok_or(TrackerError::NoObserver)?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct Fixture {
        tracker: Arc<Orchestrator>,
        propagator: Arc<CountingPropagator>,
        catalog: Arc<ElementCatalog>,
        updates: Arc<Mutex<Vec<Event>>>,
        selected: Arc<Mutex<Vec<Selection>>>,
    }

    fn fixture(views: &[ViewKind], throttle_interval: u32) -> Fixture {
        fixture_with(views, throttle_interval, Arc::new(HomeProvider))
    }

    fn fixture_with(
        views: &[ViewKind],
        throttle_interval: u32,
        observer_provider: Arc<dyn ObserverProvider>,
    ) -> Fixture {
        let bus = EventBus::new();
        let propagator = Arc::new(CountingPropagator::default());
        let catalog = Arc::new(ElementCatalog::new());

        let tracker = Orchestrator::new(
            bus.clone(),
            Collaborators {
                propagator: propagator.clone(),
                elements: catalog.clone(),
                ephemeris: Arc::new(LowPrecisionEphemeris),
                observer_provider,
                settings: Arc::new(TrackingSettings::new(1000, throttle_interval)),
            },
        );

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        bus.subscribe(Topic::SatelliteDataUpdated, move |event| {
            sink.lock().push(event.clone());
            Ok(())
        });
        let selected = Arc::new(Mutex::new(Vec::new()));
        let sink = selected.clone();
        bus.subscribe(Topic::NewSatelliteSelected, move |event| {
            if let Event::NewSatelliteSelected(selection) = event {
                sink.lock().push(selection.clone());
            }
            Ok(())
        });

        let renderers = views
            .iter()
            .map(|kind| (*kind, Arc::new(NullRenderer) as Arc<dyn Renderer>));
        tracker.init(renderers).unwrap();

        Fixture {
            tracker,
            propagator,
            catalog,
            updates,
            selected,
        }
    }

    fn iss() -> SatelliteRef {
        SatelliteRef::new(25544, "ISS (ZARYA)")
    }

    #[test]
    fn test_init_activates_timeline() {
        let f = fixture(
            &[
                ViewKind::List,
                ViewKind::ThreeD,
                ViewKind::Sky,
                ViewKind::Polar,
                ViewKind::Timeline,
                ViewKind::Options,
            ],
            1,
        );

        assert_eq!(f.tracker.active_view().unwrap().kind, ViewKind::Timeline);
        assert_eq!(f.tracker.views().iter().filter(|v| v.active).count(), 1);
        assert_eq!(f.tracker.observers().len(), 1);
        assert!(f.updates.lock().is_empty());
    }

    #[test]
    fn test_init_rejects_duplicate_views() {
        let tracker = Orchestrator::new(
            EventBus::new(),
            Collaborators {
                propagator: Arc::new(CountingPropagator::default()),
                elements: Arc::new(ElementCatalog::new()),
                ephemeris: Arc::new(LowPrecisionEphemeris),
                observer_provider: Arc::new(HomeProvider),
                settings: Arc::new(TrackingSettings::default()),
            },
        );
        let renderer: Arc<dyn Renderer> = Arc::new(NullRenderer);
        let err = tracker
            .init([(ViewKind::Sky, renderer.clone()), (ViewKind::Sky, renderer)])
            .unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateView(ViewKind::Sky)));
    }

    #[test]
    fn test_unknown_view_reaches_publisher() {
        let f = fixture(&[ViewKind::Timeline], 1);
        let err = f
            .tracker
            .bus()
            .publish(Event::ChangeView(ViewKind::Passes))
            .unwrap_err();
        assert!(matches!(err.root_cause(), TrackerError::UnknownView(ViewKind::Passes)));
        assert_eq!(f.tracker.active_view().unwrap().kind, ViewKind::Timeline);
    }

    #[test]
    fn test_sun_and_moon_gated_on_location() {
        let f = fixture(&ViewKind::ALL, 1);
        assert!(matches!(f.tracker.moon(), Err(TrackerError::NoObserver)));
        assert!(matches!(f.tracker.sun(), Err(TrackerError::NoObserver)));
    }

    #[tokio::test]
    async fn test_sun_and_moon_after_location() {
        let f = fixture(&ViewKind::ALL, 1);
        f.tracker
            .update_home_location(GeoLocation::new(51.4779, 0.0))
            .unwrap();

        assert!(f.tracker.is_ready());
        let moon = f.tracker.moon().unwrap();
        let sun = f.tracker.sun().unwrap();
        assert_eq!(moon.julian_date, sun.julian_date);
        assert!((0.0..=1.0).contains(&f.tracker.moon_phase().illumination));
    }

    #[test]
    fn test_satellite_clicked_before_location() {
        let f = fixture(&ViewKind::ALL, 1);

        f.tracker
            .bus()
            .publish(Event::SatelliteClicked(iss()))
            .unwrap();

        assert_eq!(f.tracker.selected(), Selection::single(iss()));
        assert_eq!(*f.selected.lock(), vec![Selection::single(iss())]);
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 0);
        assert!(f.updates.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_satellite_clicked_forces_recompute() {
        let f = fixture(&ViewKind::ALL, 10);
        f.tracker
            .update_home_location(GeoLocation::new(51.4779, 0.0))
            .unwrap();

        f.tracker
            .bus()
            .publish(Event::SatelliteClicked(iss()))
            .unwrap();

        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.updates.lock().len(), 1);
        assert_eq!(f.selected.lock().len(), 1);

        f.tracker.bus().publish(Event::ForceUpdate).unwrap();
        assert_eq!(f.updates.lock().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_event_without_fix_keeps_gate_closed() {
        let f = fixture(&ViewKind::ALL, 1);
        f.tracker.set_selected(Selection::single(iss()));

        f.tracker.bus().publish(Event::LocationAvailable).unwrap();
        assert!(!f.tracker.is_ready());
        assert!(matches!(f.tracker.moon(), Err(TrackerError::NoObserver)));

        f.tracker.bus().publish(Event::ForceUpdate).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 0);
        assert!(f.updates.lock().is_empty());

        f.tracker
            .update_home_location(GeoLocation::new(51.4779, 0.0))
            .unwrap();
        assert!(f.tracker.is_ready());
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_available_from_configured_observer() {
        let provider = ConfiguredObserver::new(ObserverConfig::default());
        let f = fixture_with(&ViewKind::ALL, 1, Arc::new(provider));
        f.tracker.set_selected(Selection::single(iss()));

        f.tracker
            .bus()
            .publish(Event::ChangeView(ViewKind::Sky))
            .unwrap();
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 0);

        f.tracker.bus().publish(Event::LocationAvailable).unwrap();
        assert!(f.tracker.is_ready());
        assert!(f.tracker.moon().is_ok());
        assert!(f.tracker.sun().is_ok());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.updates.lock().len(), 1);

        f.tracker.bus().publish(Event::ForceUpdate).unwrap();
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_starts_single_loop() {
        let f = fixture(&ViewKind::ALL, 1);
        f.tracker.set_selected(Selection::single(iss()));

        f.tracker
            .bus()
            .publish(Event::ChangeView(ViewKind::Sky))
            .unwrap();
        f.tracker
            .update_home_location(GeoLocation::new(51.4779, 0.0))
            .unwrap();
        f.tracker
            .update_home_location(GeoLocation::new(51.5, 0.0))
            .unwrap();
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(f.propagator.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_load_elements_event() {
        let f = fixture(&ViewKind::ALL, 1);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.txt");
        std::fs::write(&path, ISS_TLE).unwrap();

        f.tracker
            .bus()
            .publish(Event::LoadElements { path })
            .unwrap();

        assert_eq!(f.catalog.len(), 1);
        assert_eq!(f.tracker.satellites(), vec![iss()]);
        assert_eq!(f.tracker.satellite(0), Some(iss()));

        let missing = dir.path().join("missing.txt");
        assert!(f
            .tracker
            .bus()
            .publish(Event::LoadElements { path: missing })
            .is_err());
        assert_eq!(f.catalog.len(), 1);
    }
}
