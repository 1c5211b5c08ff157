//! Sun and moon positions for the home observer
//!
//! [`PositionFacade`] caches the last sun/moon pair. The pair is always
//! computed together from one Julian date, and the cache is only refreshed
//! when someone asks for a recompute; it does not expire on its own.

mod ephemeris;
mod julian;

pub use ephemeris::{CelestialEphemeris, LowPrecisionEphemeris};
pub use julian::{J2000, JulianDate};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sattrack_common::{CelestialPosition, MoonPhase};
use std::sync::Arc;

use crate::error::{Result, TrackerError};
use crate::session::Session;

/// Sun and moon computed for the same instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunMoon {
    pub sun: CelestialPosition,
    pub moon: CelestialPosition,
}

pub struct PositionFacade {
    ephemeris: Arc<dyn CelestialEphemeris>,
    session: Arc<Session>,
    cache: Mutex<Option<SunMoon>>,
}

impl PositionFacade {
    pub fn new(ephemeris: Arc<dyn CelestialEphemeris>, session: Arc<Session>) -> Self {
        Self {
            ephemeris,
            session,
            cache: Mutex::new(None),
        }
    }

    /// Cached moon position, computed on first access
    pub fn current_moon(&self) -> Result<CelestialPosition> {
        Ok(self.current()?.moon)
    }

    /// Cached sun position, computed on first access
    pub fn current_sun(&self) -> Result<CelestialPosition> {
        Ok(self.current()?.sun)
    }

    /// Phase for the present moment; not cached
    pub fn moon_phase(&self) -> MoonPhase {
        self.ephemeris.moon_phase(JulianDate::now())
    }

    pub fn cached(&self) -> Option<SunMoon> {
        *self.cache.lock()
    }

    /// Recompute the pair for the present moment and replace the cache
    pub fn recompute(&self) -> Result<SunMoon> {
        self.recompute_at(Utc::now())
    }

    pub fn recompute_at(&self, at: DateTime<Utc>) -> Result<SunMoon> {
        let observer = self.session.home_location().ok_or(TrackerError::NoObserver)?;
        let jd = JulianDate::from_datetime(at);

        let pair = SunMoon {
            sun: self.ephemeris.sun_position(jd, &observer),
            moon: self.ephemeris.moon_position(jd, &observer),
        };
        *self.cache.lock() = Some(pair);

        tracing::trace!(
            "Sun az {:.1} el {:.1}, moon az {:.1} el {:.1} (JD {:.5})",
            pair.sun.azimuth,
            pair.sun.elevation,
            pair.moon.azimuth,
            pair.moon.elevation,
            jd.value()
        );

        Ok(pair)
    }

    fn current(&self) -> Result<SunMoon> {
        if self.session.home_location().is_none() {
            return Err(TrackerError::NoObserver);
        }
        match self.cached() {
            Some(pair) => Ok(pair),
            None => self.recompute(),
        }
    }
}
