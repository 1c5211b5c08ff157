//! Calculation scheduler
//!
//! One calculation tick recomputes the sun/moon pair, propagates the
//! selected satellites and, subject to throttling, publishes a
//! `satellite-data-updated` event. The repeating loop sleeps for the
//! configured refresh interval (read fresh every cycle) *after* each tick
//! completes, so tick spacing is the interval plus the tick's own runtime.

use chrono::{DateTime, Utc};
use sattrack_common::{SatelliteDataUpdate, SatellitePosition, Selection};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bus::{Event, EventBus};
use crate::config::TrackingSettings;
use crate::error::{Result, TrackerError};
use crate::sat::PropagationEngine;
use crate::session::Session;
use crate::sky::PositionFacade;

/// Runs one calculation immediately, bypassing the throttle
pub trait ForceRefresh: Send + Sync {
    fn force_recompute(&self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

pub struct CalculationScheduler {
    bus: EventBus,
    session: Arc<Session>,
    facade: Arc<PositionFacade>,
    propagator: Arc<dyn PropagationEngine>,
    settings: Arc<TrackingSettings>,
    running: AtomicBool,
}

impl CalculationScheduler {
    pub fn new(
        bus: EventBus,
        session: Arc<Session>,
        facade: Arc<PositionFacade>,
        propagator: Arc<dyn PropagationEngine>,
        settings: Arc<TrackingSettings>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bus,
            session,
            facade,
            propagator,
            settings,
            running: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> LoopState {
        if self.running.load(Ordering::Acquire) {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    /// Start the repeating loop unless it is already running. Returns `true`
    /// if this call started it. Must be called from inside a tokio runtime.
    pub fn ensure_running(self: &Arc<Self>) -> Result<bool> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| TrackerError::NoRuntime)?;

        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Calculation loop already running");
            return Ok(false);
        }

        let scheduler = Arc::clone(self);
        handle.spawn(async move {
            scheduler.run_loop().await;
        });

        tracing::info!(
            "Calculation loop started (refresh every {} ms, notify every {} tick(s))",
            self.settings.refresh_interval().as_millis(),
            self.settings.throttle_interval()
        );
        Ok(true)
    }

    async fn run_loop(self: Arc<Self>) {
        loop {
            tokio::time::sleep(self.settings.refresh_interval()).await;

            // A failed tick is logged; the loop keeps going
            if let Err(e) = self.calculate(false) {
                tracing::error!("Calculation tick failed: {}", e);
            }
        }
    }

    /// Run one calculation tick. Returns whether `satellite-data-updated`
    /// was published.
    pub fn calculate(&self, force: bool) -> Result<bool> {
        let now = Utc::now();
        self.facade.recompute_at(now)?;

        let selection = self.session.selection();
        if selection.is_empty() {
            self.session.store_positions(Vec::new());
            self.publish(now, selection, Vec::new())?;
            return Ok(true);
        }

        let observer = self
            .session
            .home_observer()
            .ok_or(TrackerError::NoObserver)?;

        match self.propagator.compute_all(now, &observer, &selection) {
            Ok(positions) => {
                self.session.store_positions(positions.clone());

                if !self
                    .session
                    .record_tick(self.settings.throttle_interval(), force)
                {
                    tracing::debug!(
                        "Computed {} position(s), notification throttled ({} tick(s) counted)",
                        positions.len(),
                        self.session.throttle_counter()
                    );
                    return Ok(false);
                }

                self.publish(now, selection, positions)?;
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(
                    "Propagation failed for {} selected satellite(s): {}",
                    selection.len(),
                    e
                );
                self.session.reset_throttle();
                self.session.store_positions(Vec::new());
                self.publish(now, selection, Vec::new())?;
                Ok(true)
            }
        }
    }

    fn publish(
        &self,
        computed_at: DateTime<Utc>,
        selection: Selection,
        positions: Vec<SatellitePosition>,
    ) -> Result<()> {
        let update = SatelliteDataUpdate::new(computed_at, selection, positions);
        tracing::debug!(
            "Publishing update {} with {} position(s)",
            update.update_id,
            update.positions.len()
        );
        self.bus.publish(Event::SatelliteDataUpdated(update))
    }
}

impl ForceRefresh for CalculationScheduler {
    fn force_recompute(&self) -> Result<()> {
        self.calculate(true).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Observer;
    use crate::sky::LowPrecisionEphemeris;
    use parking_lot::Mutex;
    use sattrack_common::{GeoLocation, SatelliteRef, Topic};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct FakePropagator {
        fail: AtomicBool,
        calls: AtomicUsize,
    }

    impl PropagationEngine for FakePropagator {
        fn compute_all(
            &self,
            time: DateTime<Utc>,
            _observer: &Observer,
            selection: &Selection,
        ) -> Result<Vec<SatellitePosition>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(TrackerError::Propagation {
                    satellite: "all".to_string(),
                    reason: "decayed".to_string(),
                });
            }

            Ok(selection
                .iter()
                .map(|satellite| SatellitePosition {
                    satellite: satellite.clone(),
                    computed_at: time,
                    teme_position_km: [6778.0, 0.0, 0.0],
                    teme_velocity_km_s: [0.0, 7.67, 0.0],
                    latitude: 0.0,
                    longitude: 0.0,
                    altitude_km: 400.0,
                    azimuth: 180.0,
                    elevation: 45.0,
                    range_km: 550.0,
                })
                .collect())
        }
    }

    struct Harness {
        scheduler: Arc<CalculationScheduler>,
        session: Arc<Session>,
        settings: Arc<TrackingSettings>,
        propagator: Arc<FakePropagator>,
        updates: Arc<Mutex<Vec<SatelliteDataUpdate>>>,
    }

    fn harness(refresh_interval_ms: u64, throttle_interval: u32) -> Harness {
        let bus = EventBus::new();
        let session = Arc::new(Session::new());
        session.set_home_observer(Observer::located("Home", GeoLocation::new(51.4779, 0.0)));

        let facade = Arc::new(PositionFacade::new(
            Arc::new(LowPrecisionEphemeris),
            session.clone(),
        ));
        let propagator = Arc::new(FakePropagator::default());
        let settings = Arc::new(TrackingSettings::new(refresh_interval_ms, throttle_interval));

        let updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        bus.subscribe(Topic::SatelliteDataUpdated, move |event| {
            if let Event::SatelliteDataUpdated(update) = event {
                sink.lock().push(update.clone());
            }
            Ok(())
        });

        let scheduler = CalculationScheduler::new(
            bus,
            session.clone(),
            facade,
            propagator.clone(),
            settings.clone(),
        );

        Harness {
            scheduler,
            session,
            settings,
            propagator,
            updates,
        }
    }

    fn select_iss(session: &Session) {
        session.set_selection(Selection::single(SatelliteRef::new(25544, "ISS (ZARYA)")));
    }

    #[test]
    fn test_throttle_publishes_every_third_tick() {
        let h = harness(1000, 3);
        select_iss(&h.session);

        let published: Vec<bool> = (0..7).map(|_| h.scheduler.calculate(false).unwrap()).collect();

        assert_eq!(published, vec![false, false, true, false, false, true, false]);
        assert_eq!(h.updates.lock().len(), 2);
        assert_eq!(h.session.throttle_counter(), 1);
        assert_eq!(h.propagator.calls.load(Ordering::SeqCst), 7);
        assert_eq!(h.session.positions().len(), 1);
    }

    #[test]
    fn test_force_bypasses_throttle() {
        let h = harness(1000, 10);
        select_iss(&h.session);

        assert!(!h.scheduler.calculate(false).unwrap());
        h.scheduler.force_recompute().unwrap();

        assert_eq!(h.updates.lock().len(), 1);
        assert_eq!(h.session.throttle_counter(), 0);
    }

    #[test]
    fn test_empty_selection_always_publishes() {
        let h = harness(1000, 5);

        assert!(h.scheduler.calculate(false).unwrap());

        let updates = h.updates.lock();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].selection.is_empty());
        assert_eq!(h.propagator.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_tick_refreshes_sun_and_moon() {
        let h = harness(1000, 1);
        assert!(h.scheduler.facade.cached().is_none());

        h.scheduler.calculate(false).unwrap();
        let pair = h.scheduler.facade.cached().unwrap();
        assert_eq!(pair.sun.julian_date, pair.moon.julian_date);
    }

    #[test]
    fn test_propagation_failure_still_publishes() {
        let h = harness(1000, 5);
        select_iss(&h.session);
        h.scheduler.calculate(false).unwrap();
        h.propagator.fail.store(true, Ordering::SeqCst);

        assert!(h.scheduler.calculate(false).unwrap());

        let updates = h.updates.lock();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].positions.is_empty());
        assert!(updates[0].is_partial());
        assert_eq!(h.session.throttle_counter(), 0);
    }

    #[test]
    fn test_start_needs_runtime() {
        let h = harness(1000, 1);
        assert!(matches!(h.scheduler.ensure_running(), Err(TrackerError::NoRuntime)));
        assert_eq!(h.scheduler.state(), LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ensure_running_is_idempotent() {
        let h = harness(1000, 1);

        assert!(h.scheduler.ensure_running().unwrap());
        assert!(!h.scheduler.ensure_running().unwrap());
        assert_eq!(h.scheduler.state(), LoopState::Running);

        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(h.updates.lock().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_to_next_cycle() {
        let h = harness(1000, 1);
        h.scheduler.ensure_running().unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(h.updates.lock().len(), 1);

        // The sleep already in progress still runs to t=2000
        h.settings.set_refresh_interval(Duration::from_millis(200));
        tokio::time::sleep(Duration::from_millis(1600)).await;
        assert_eq!(h.updates.lock().len(), 7);
    }
}
