use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sattrack_common::{GeoLocation, SatellitePosition, SatelliteRef, Selection};
use sgp4::Constants;
use std::path::Path;

use super::geometry::{ecef_to_geodetic, look_angles, teme_to_ecef};
use super::{ElementStore, PropagationEngine};
use crate::error::{Result, TrackerError};
use crate::session::Observer;
use crate::sky::JulianDate;

/// One satellite with its initialized SGP4 model
pub struct CatalogEntry {
    pub satellite: SatelliteRef,
    elements: sgp4::Elements,
    constants: Constants,
}

impl CatalogEntry {
    pub fn from_elements(elements: sgp4::Elements) -> std::result::Result<Self, String> {
        let constants = Constants::from_elements(&elements).map_err(|e| e.to_string())?;
        let name = elements
            .object_name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", elements.norad_id));

        Ok(Self {
            satellite: SatelliteRef::new(elements.norad_id, name),
            elements,
            constants,
        })
    }

    /// Element set epoch
    pub fn epoch(&self) -> DateTime<Utc> {
        self.elements.datetime.and_utc()
    }

    pub fn position_at(
        &self,
        time: DateTime<Utc>,
        observer: &GeoLocation,
        gmst: f64,
    ) -> Result<SatellitePosition> {
        let minutes_since_epoch =
            (time.naive_utc() - self.elements.datetime).num_milliseconds() as f64 / 60_000.0;

        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes_since_epoch))
            .map_err(|e| TrackerError::Propagation {
                satellite: self.satellite.to_string(),
                reason: e.to_string(),
            })?;

        let ecef = teme_to_ecef(prediction.position, gmst);
        let subpoint = ecef_to_geodetic(ecef);
        let look = look_angles(observer, ecef);

        Ok(SatellitePosition {
            satellite: self.satellite.clone(),
            computed_at: time,
            teme_position_km: prediction.position,
            teme_velocity_km_s: prediction.velocity,
            latitude: subpoint.latitude,
            longitude: subpoint.longitude,
            altitude_km: subpoint.altitude_km,
            azimuth: look.azimuth,
            elevation: look.elevation,
            range_km: look.range_km,
        })
    }
}

/// The currently loaded element set
#[derive(Default)]
pub struct ElementCatalog {
    entries: RwLock<Vec<CatalogEntry>>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse three-line element sets. Returns the usable entries and the
    /// number of element sets that had to be skipped.
    pub fn parse(text: &str) -> (Vec<CatalogEntry>, usize) {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        let mut entries = Vec::new();
        let mut skipped = 0;

        let mut i = 0;
        while i + 2 < lines.len() {
            let (name_line, line1, line2) = (lines[i], lines[i + 1], lines[i + 2]);

            if !line1.starts_with('1') || !line2.starts_with('2') {
                i += 1;
                continue;
            }

            let name = name_line.strip_prefix("0 ").unwrap_or(name_line);
            let tle = format!("{}\n{}\n{}", name, line1, line2);

            match sgp4::parse_3les(&tle) {
                Ok(elements_vec) => {
                    for elements in elements_vec {
                        match CatalogEntry::from_elements(elements) {
                            Ok(entry) => entries.push(entry),
                            Err(e) => {
                                tracing::warn!("Skipping element set for {}: {}", name, e);
                                skipped += 1;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping malformed element set for {}: {}", name, e);
                    skipped += 1;
                }
            }

            i += 3;
        }

        (entries, skipped)
    }

    /// Replace the catalog with the element sets in `text`
    pub fn load_str(&self, text: &str, origin: &Path) -> Result<usize> {
        let (entries, skipped) = Self::parse(text);

        if entries.is_empty() {
            return Err(TrackerError::ElementSet {
                path: origin.to_path_buf(),
                reason: "no valid element sets found".to_string(),
            });
        }

        let count = entries.len();
        *self.entries.write() = entries;

        tracing::info!(
            "Loaded {} satellites from {:?} ({} skipped)",
            count,
            origin,
            skipped
        );
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn find(&self, catalog_number: u64) -> Option<SatelliteRef> {
        self.entries
            .read()
            .iter()
            .find(|e| e.satellite.catalog_number == catalog_number)
            .map(|e| e.satellite.clone())
    }
}

impl ElementStore for ElementCatalog {
    fn load(&self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)?;
        self.load_str(&text, path)
    }

    fn satellites(&self) -> Vec<SatelliteRef> {
        self.entries
            .read()
            .iter()
            .map(|e| e.satellite.clone())
            .collect()
    }
}

impl PropagationEngine for ElementCatalog {
    fn compute_all(
        &self,
        time: DateTime<Utc>,
        observer: &Observer,
        selection: &Selection,
    ) -> Result<Vec<SatellitePosition>> {
        if selection.is_empty() {
            return Ok(Vec::new());
        }

        let location = observer.location.ok_or(TrackerError::NoObserver)?;
        let gmst = JulianDate::from_datetime(time).gmst();
        let entries = self.entries.read();

        let mut positions = Vec::with_capacity(selection.len());
        let mut last_error = None;

        for satellite in selection.iter() {
            let result = entries
                .iter()
                .find(|e| e.satellite.catalog_number == satellite.catalog_number)
                .ok_or_else(|| TrackerError::Propagation {
                    satellite: satellite.to_string(),
                    reason: "not in the loaded element set".to_string(),
                })
                .and_then(|entry| entry.position_at(time, &location, gmst));

            match result {
                Ok(position) => positions.push(position),
                Err(e) => {
                    tracing::warn!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if positions.is_empty() => Err(e),
            _ => Ok(positions),
        }
    }
}
