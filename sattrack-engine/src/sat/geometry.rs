//! Frame conversions for propagated satellite states
//!
//! TEME is treated as pseudo-Earth-fixed after a rotation by GMST; polar
//! motion and the equation of the equinoxes are ignored.

use sattrack_common::GeoLocation;
use std::f64::consts::PI;

/// WGS84 equatorial radius, km
pub const EARTH_RADIUS_KM: f64 = 6378.137;
/// WGS84 flattening
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;
const E2: f64 = FLATTENING * (2.0 - FLATTENING);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    /// Degrees
    pub latitude: f64,
    /// Degrees in `[-180, 180)`
    pub longitude: f64,
    pub altitude_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    /// Degrees from north, eastward
    pub azimuth: f64,
    pub elevation: f64,
    pub range_km: f64,
}

/// Rotate a TEME vector into the Earth-fixed frame
pub fn teme_to_ecef(teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_t, cos_t) = gmst.sin_cos();
    [
        teme[0] * cos_t + teme[1] * sin_t,
        -teme[0] * sin_t + teme[1] * cos_t,
        teme[2],
    ]
}

/// Sub-satellite point of an Earth-fixed position
pub fn ecef_to_geodetic(ecef: [f64; 3]) -> Geodetic {
    let [x, y, z] = ecef;
    let r = (x * x + y * y).sqrt();
    let longitude = y.atan2(x);

    let mut latitude = z.atan2(r);
    let mut c = 1.0;
    for _ in 0..10 {
        let previous = latitude;
        c = 1.0 / (1.0 - E2 * latitude.sin().powi(2)).sqrt();
        latitude = (z + EARTH_RADIUS_KM * c * E2 * latitude.sin()).atan2(r);
        if (latitude - previous).abs() < 1e-10 {
            break;
        }
    }

    let altitude_km = if latitude.cos().abs() > 1e-9 {
        r / latitude.cos() - EARTH_RADIUS_KM * c
    } else {
        z.abs() - EARTH_RADIUS_KM * (1.0 - FLATTENING)
    };

    Geodetic {
        latitude: latitude.to_degrees(),
        longitude: wrap_longitude(longitude).to_degrees(),
        altitude_km,
    }
}

pub fn geodetic_to_ecef(location: &GeoLocation) -> [f64; 3] {
    let lat = location.latitude.to_radians();
    let lon = location.longitude.to_radians();
    let alt = location.elevation_km();
    let n = EARTH_RADIUS_KM / (1.0 - E2 * lat.sin().powi(2)).sqrt();

    [
        (n + alt) * lat.cos() * lon.cos(),
        (n + alt) * lat.cos() * lon.sin(),
        ((1.0 - E2) * n + alt) * lat.sin(),
    ]
}

/// Azimuth, elevation and range of an Earth-fixed target from an observer
pub fn look_angles(observer: &GeoLocation, target_ecef: [f64; 3]) -> LookAngles {
    let site = geodetic_to_ecef(observer);
    let (rx, ry, rz) = (
        target_ecef[0] - site[0],
        target_ecef[1] - site[1],
        target_ecef[2] - site[2],
    );

    let (sin_lat, cos_lat) = observer.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = observer.longitude.to_radians().sin_cos();

    let south = sin_lat * cos_lon * rx + sin_lat * sin_lon * ry - cos_lat * rz;
    let east = -sin_lon * rx + cos_lon * ry;
    let zenith = cos_lat * cos_lon * rx + cos_lat * sin_lon * ry + sin_lat * rz;

    let range_km = (south * south + east * east + zenith * zenith).sqrt();
    let elevation = (zenith / range_km).clamp(-1.0, 1.0).asin();
    let azimuth = east.atan2(-south);

    LookAngles {
        azimuth: azimuth.to_degrees().rem_euclid(360.0),
        elevation: elevation.to_degrees(),
        range_km,
    }
}

fn wrap_longitude(radians: f64) -> f64 {
    (radians + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_above_equator() {
        let geo = ecef_to_geodetic([EARTH_RADIUS_KM + 400.0, 0.0, 0.0]);
        assert!(geo.latitude.abs() < 1e-6);
        assert!(geo.longitude.abs() < 1e-6);
        assert!((geo.altitude_km - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_gmst_rotation_moves_longitude_west() {
        let ecef = teme_to_ecef([EARTH_RADIUS_KM + 400.0, 0.0, 0.0], 90f64.to_radians());
        let geo = ecef_to_geodetic(ecef);
        assert!((geo.longitude + 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_geodetic_round_trip() {
        let site = GeoLocation::new(51.4779, -0.0015).with_elevation(46.0);
        let geo = ecef_to_geodetic(geodetic_to_ecef(&site));
        assert!((geo.latitude - site.latitude).abs() < 1e-6);
        assert!((geo.longitude - site.longitude).abs() < 1e-6);
        assert!((geo.altitude_km - 0.046).abs() < 1e-6);
    }

    #[test]
    fn test_look_angles_overhead_and_north() {
        let site = GeoLocation::new(0.0, 0.0);

        let overhead = look_angles(&site, [EARTH_RADIUS_KM + 400.0, 0.0, 0.0]);
        assert!((overhead.elevation - 90.0).abs() < 1e-6);
        assert!((overhead.range_km - 400.0).abs() < 1e-6);

        let north = look_angles(&site, [EARTH_RADIUS_KM, 0.0, 1000.0]);
        assert!(north.azimuth < 1e-6 || north.azimuth > 360.0 - 1e-6);
        assert!(north.elevation.abs() < 1e-6);

        let east = look_angles(&site, [EARTH_RADIUS_KM, 1000.0, 0.0]);
        assert!((east.azimuth - 90.0).abs() < 1e-6);
    }
}
