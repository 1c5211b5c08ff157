//! Shared tracking session state
//!
//! One `Session` holds everything the orchestrator and the calculation
//! scheduler share. Writers are crate-private: the orchestrator owns the
//! observers and the selection, the scheduler owns the throttle counter and
//! the last computed positions. Locks are never held across a publish.

use parking_lot::{Mutex, RwLock};
use sattrack_common::{GeoLocation, SatellitePosition, Selection};

use crate::config::ObserverConfig;

/// A ground station the tracker computes look angles for
#[derive(Debug, Clone, PartialEq)]
pub struct Observer {
    pub name: String,
    /// `None` until the location provider reports a fix
    pub location: Option<GeoLocation>,
}

impl Observer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    pub fn located(name: impl Into<String>, location: GeoLocation) -> Self {
        Self {
            name: name.into(),
            location: Some(location),
        }
    }
}

/// Creates the home observer at startup
pub trait ObserverProvider: Send + Sync {
    fn init(&self) -> Observer;
}

/// Observer provider backed by the `[observer]` config section. The
/// configured location is the observer's fix from the start.
#[derive(Debug, Clone)]
pub struct ConfiguredObserver {
    config: ObserverConfig,
}

impl ConfiguredObserver {
    pub fn new(config: ObserverConfig) -> Self {
        Self { config }
    }

    pub fn location(&self) -> GeoLocation {
        self.config.location()
    }
}

impl ObserverProvider for ConfiguredObserver {
    fn init(&self) -> Observer {
        Observer::located(self.config.name.clone(), self.location())
    }
}

/// Counts computation ticks between notifications
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleState {
    counter: u32,
}

impl ThrottleState {
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Count one tick. Returns `true` when subscribers should be notified,
    /// in which case the counter is back at zero.
    pub fn record(&mut self, interval: u32, force: bool) -> bool {
        self.counter += 1;
        if self.counter >= interval || force {
            self.counter = 0;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

#[derive(Debug, Default)]
pub struct Session {
    observers: RwLock<Vec<Observer>>,
    selection: RwLock<Selection>,
    throttle: Mutex<ThrottleState>,
    positions: RwLock<Vec<SatellitePosition>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observers(&self) -> Vec<Observer> {
        self.observers.read().clone()
    }

    /// Only the first observer is used for computation
    pub fn home_observer(&self) -> Option<Observer> {
        self.observers.read().first().cloned()
    }

    pub fn home_location(&self) -> Option<GeoLocation> {
        self.observers.read().first().and_then(|o| o.location)
    }

    pub(crate) fn set_home_observer(&self, observer: Observer) {
        let mut observers = self.observers.write();
        if observers.is_empty() {
            observers.push(observer);
        } else {
            observers[0] = observer;
        }
    }

    /// Returns `true` if the home observer had no location before
    pub(crate) fn set_home_location(&self, location: GeoLocation) -> bool {
        let mut observers = self.observers.write();
        if observers.is_empty() {
            observers.push(Observer::new("Home"));
        }
        observers[0].location.replace(location).is_none()
    }

    pub fn selection(&self) -> Selection {
        self.selection.read().clone()
    }

    pub(crate) fn set_selection(&self, selection: Selection) {
        *self.selection.write() = selection;
    }

    pub fn throttle_counter(&self) -> u32 {
        self.throttle.lock().counter()
    }

    pub(crate) fn record_tick(&self, interval: u32, force: bool) -> bool {
        self.throttle.lock().record(interval, force)
    }

    pub(crate) fn reset_throttle(&self) {
        self.throttle.lock().reset();
    }

    /// Positions from the most recent computation, published or not
    pub fn positions(&self) -> Vec<SatellitePosition> {
        self.positions.read().clone()
    }

    pub(crate) fn store_positions(&self, positions: Vec<SatellitePosition>) {
        *self.positions.write() = positions;
    }
}
