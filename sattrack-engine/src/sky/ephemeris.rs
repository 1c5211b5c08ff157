//! Sun and moon ephemeris
//!
//! [`LowPrecisionEphemeris`] uses the short series from the Astronomical
//! Almanac: the sun is good to about 0.01°, the moon to a degree or so,
//! which is plenty for drawing them on a sky plot.

use sattrack_common::{CelestialPosition, GeoLocation, MoonPhase};
use std::f64::consts::TAU;

use super::julian::JulianDate;

const AU_KM: f64 = 149_597_870.7;

/// Computes sun and moon positions for an observer
pub trait CelestialEphemeris: Send + Sync {
    fn sun_position(&self, jd: JulianDate, observer: &GeoLocation) -> CelestialPosition;
    fn moon_position(&self, jd: JulianDate, observer: &GeoLocation) -> CelestialPosition;
    fn moon_phase(&self, jd: JulianDate) -> MoonPhase;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LowPrecisionEphemeris;

/// Geocentric ecliptic coordinates, radians and km
struct Ecliptic {
    longitude: f64,
    latitude: f64,
    distance_km: f64,
}

fn obliquity(jd: JulianDate) -> f64 {
    (23.439 - 0.000_000_4 * jd.days_since_j2000()).to_radians()
}

fn sun_ecliptic(jd: JulianDate) -> Ecliptic {
    let n = jd.days_since_j2000();
    let mean_longitude = 280.460 + 0.985_647_4 * n;
    let g = (357.528 + 0.985_600_3 * n).to_radians();
    let longitude = mean_longitude + 1.915 * g.sin() + 0.020 * (2.0 * g).sin();

    Ecliptic {
        longitude: longitude.rem_euclid(360.0).to_radians(),
        latitude: 0.0,
        distance_km: (1.000_14 - 0.016_71 * g.cos() - 0.000_14 * (2.0 * g).cos()) * AU_KM,
    }
}

fn moon_ecliptic(jd: JulianDate) -> Ecliptic {
    let n = jd.days_since_j2000();
    let mean_longitude = 218.316 + 13.176_396 * n;
    let mean_anomaly = (134.963 + 13.064_993 * n).to_radians();
    let argument_of_latitude = (93.272 + 13.229_350 * n).to_radians();

    Ecliptic {
        longitude: (mean_longitude + 6.289 * mean_anomaly.sin())
            .rem_euclid(360.0)
            .to_radians(),
        latitude: (5.128 * argument_of_latitude.sin()).to_radians(),
        distance_km: 385_001.0 - 20_905.0 * mean_anomaly.cos(),
    }
}

fn locate(body: Ecliptic, jd: JulianDate, observer: &GeoLocation) -> CelestialPosition {
    let eps = obliquity(jd);
    let (lon, lat) = (body.longitude, body.latitude);

    let ra = (lon.sin() * eps.cos() - lat.tan() * eps.sin()).atan2(lon.cos());
    let dec = (lat.sin() * eps.cos() + lat.cos() * eps.sin() * lon.sin())
        .clamp(-1.0, 1.0)
        .asin();

    let phi = observer.latitude.to_radians();
    let hour_angle = jd.gmst() + observer.longitude.to_radians() - ra;

    let elevation = (phi.sin() * dec.sin() + phi.cos() * dec.cos() * hour_angle.cos())
        .clamp(-1.0, 1.0)
        .asin();
    let azimuth = (-hour_angle.sin() * dec.cos())
        .atan2(dec.sin() * phi.cos() - dec.cos() * phi.sin() * hour_angle.cos());

    CelestialPosition {
        azimuth: azimuth.to_degrees().rem_euclid(360.0),
        elevation: elevation.to_degrees(),
        right_ascension: ra.to_degrees().rem_euclid(360.0),
        declination: dec.to_degrees(),
        distance_km: body.distance_km,
        julian_date: jd.value(),
    }
}

impl CelestialEphemeris for LowPrecisionEphemeris {
    fn sun_position(&self, jd: JulianDate, observer: &GeoLocation) -> CelestialPosition {
        locate(sun_ecliptic(jd), jd, observer)
    }

    fn moon_position(&self, jd: JulianDate, observer: &GeoLocation) -> CelestialPosition {
        locate(moon_ecliptic(jd), jd, observer)
    }

    fn moon_phase(&self, jd: JulianDate) -> MoonPhase {
        let elongation = (moon_ecliptic(jd).longitude - sun_ecliptic(jd).longitude).rem_euclid(TAU);
        MoonPhase {
            phase: elongation / TAU,
            illumination: (1.0 - elongation.cos()) / 2.0,
        }
    }
}
