//! Julian dates and sidereal time

use chrono::{DateTime, Utc};

pub const J2000: f64 = 2_451_545.0;
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36_525.0;
const UNIX_EPOCH_JD: f64 = 2_440_587.5;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

const GMST_BASE_DEG: f64 = 280.460_618_37;
const GMST_ROTATION_PER_DAY: f64 = 360.985_647_366_29;
const GMST_CORRECTION: f64 = 0.000_387_933;

/// Continuous day count used by the astronomical calculations
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct JulianDate(pub f64);

impl JulianDate {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        JulianDate(at.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JD)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn days_since_j2000(&self) -> f64 {
        self.0 - J2000
    }

    pub fn centuries_since_j2000(&self) -> f64 {
        self.days_since_j2000() / DAYS_PER_JULIAN_CENTURY
    }

    /// Greenwich mean sidereal time, radians in `[0, 2π)`
    pub fn gmst(&self) -> f64 {
        let days = self.days_since_j2000();
        let t = self.centuries_since_j2000();
        let degrees = GMST_BASE_DEG + GMST_ROTATION_PER_DAY * days + GMST_CORRECTION * t * t
            - t * t * t / 38_710_000.0;
        degrees.rem_euclid(360.0).to_radians()
    }
}

impl From<DateTime<Utc>> for JulianDate {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(at)
    }
}
