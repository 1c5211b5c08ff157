use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display views of the tracker, one per UI tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViewKind {
    #[serde(rename = "list")]
    List,
    #[serde(rename = "3d")]
    ThreeD,
    #[serde(rename = "passes")]
    Passes,
    #[serde(rename = "polar")]
    Polar,
    #[serde(rename = "sky")]
    Sky,
    #[serde(rename = "timeline")]
    Timeline,
    #[serde(rename = "options")]
    Options,
}

impl ViewKind {
    /// All views in tab order
    pub const ALL: [ViewKind; 7] = [
        ViewKind::List,
        ViewKind::ThreeD,
        ViewKind::Passes,
        ViewKind::Polar,
        ViewKind::Sky,
        ViewKind::Timeline,
        ViewKind::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::List => "list",
            ViewKind::ThreeD => "3d",
            ViewKind::Passes => "passes",
            ViewKind::Polar => "polar",
            ViewKind::Sky => "sky",
            ViewKind::Timeline => "timeline",
            ViewKind::Options => "options",
        }
    }

    /// Position of the view's tab in the UI
    pub fn tab_index(&self) -> usize {
        match self {
            ViewKind::List => 0,
            ViewKind::ThreeD => 1,
            ViewKind::Passes => 2,
            ViewKind::Polar => 3,
            ViewKind::Sky => 4,
            ViewKind::Timeline => 5,
            ViewKind::Options => 6,
        }
    }

    /// Whether this view is the one shown when the tracker starts
    pub fn is_default_active(&self) -> bool {
        matches!(self, ViewKind::Timeline)
    }
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "list" => Ok(ViewKind::List),
            "3d" | "threed" => Ok(ViewKind::ThreeD),
            "passes" => Ok(ViewKind::Passes),
            "polar" => Ok(ViewKind::Polar),
            "sky" => Ok(ViewKind::Sky),
            "timeline" => Ok(ViewKind::Timeline),
            "options" => Ok(ViewKind::Options),
            _ => Err(format!("Unknown view: {}", s)),
        }
    }
}

/// Event bus topics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    LoadElements,
    ChangeView,
    LocationAvailable,
    LocationUpdated,
    SatelliteClicked,
    ForceUpdate,
    SatelliteDataUpdated,
    NewSatelliteSelected,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::LoadElements => "load-elements",
            Topic::ChangeView => "change-view",
            Topic::LocationAvailable => "location-available",
            Topic::LocationUpdated => "location-updated",
            Topic::SatelliteClicked => "satellite-clicked",
            Topic::ForceUpdate => "force-update",
            Topic::SatelliteDataUpdated => "satellite-data-updated",
            Topic::NewSatelliteSelected => "new-satellite-selected",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Geodetic location of a ground observer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Metres above the WGS84 ellipsoid
    #[serde(default)]
    pub elevation_m: Option<f64>,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation_m: None,
        }
    }

    pub fn with_elevation(mut self, elevation_m: f64) -> Self {
        self.elevation_m = Some(elevation_m);
        self
    }

    pub fn elevation_km(&self) -> f64 {
        self.elevation_m.unwrap_or(0.0) / 1000.0
    }
}

/// Identifies one satellite from a loaded element set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SatelliteRef {
    /// NORAD catalog number
    pub catalog_number: u64,
    pub name: String,
}

impl SatelliteRef {
    pub fn new(catalog_number: u64, name: impl Into<String>) -> Self {
        Self {
            catalog_number,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for SatelliteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.catalog_number)
    }
}

/// The satellites the user currently has selected
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub satellites: Vec<SatelliteRef>,
}

impl Selection {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(satellite: SatelliteRef) -> Self {
        Self {
            satellites: vec![satellite],
        }
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    /// The first selected satellite, the one the UI highlights
    pub fn primary(&self) -> Option<&SatelliteRef> {
        self.satellites.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SatelliteRef> {
        self.satellites.iter()
    }
}

impl From<Vec<SatelliteRef>> for Selection {
    fn from(satellites: Vec<SatelliteRef>) -> Self {
        Self { satellites }
    }
}

/// Propagated state of one satellite at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatellitePosition {
    pub satellite: SatelliteRef,
    pub computed_at: DateTime<Utc>,
    /// TEME frame, km
    pub teme_position_km: [f64; 3],
    /// TEME frame, km/s
    pub teme_velocity_km_s: [f64; 3],
    /// Sub-satellite point, degrees
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
    /// Look angles from the home observer, degrees
    pub azimuth: f64,
    pub elevation: f64,
    pub range_km: f64,
}

impl SatellitePosition {
    pub fn is_visible(&self) -> bool {
        self.elevation > 0.0
    }
}

/// Sun or moon position seen from the observer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CelestialPosition {
    /// Degrees from north, eastward
    pub azimuth: f64,
    /// Degrees above the horizon
    pub elevation: f64,
    /// Degrees
    pub right_ascension: f64,
    /// Degrees
    pub declination: f64,
    pub distance_km: f64,
    /// Julian date the position was computed for
    pub julian_date: f64,
}

/// Lunar phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoonPhase {
    /// Fraction of the synodic cycle: 0 new, 0.5 full
    pub phase: f64,
    /// Illuminated fraction of the disc, 0..=1
    pub illumination: f64,
}

impl MoonPhase {
    pub fn name(&self) -> &'static str {
        let p = self.phase.rem_euclid(1.0);
        match p {
            p if p < 0.0625 || p >= 0.9375 => "New Moon",
            p if p < 0.1875 => "Waxing Crescent",
            p if p < 0.3125 => "First Quarter",
            p if p < 0.4375 => "Waxing Gibbous",
            p if p < 0.5625 => "Full Moon",
            p if p < 0.6875 => "Waning Gibbous",
            p if p < 0.8125 => "Last Quarter",
            _ => "Waning Crescent",
        }
    }
}

/// Payload of the `satellite-data-updated` topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteDataUpdate {
    pub update_id: Uuid,
    pub computed_at: DateTime<Utc>,
    pub selection: Selection,
    /// May be shorter than the selection when propagation failed
    pub positions: Vec<SatellitePosition>,
}

impl SatelliteDataUpdate {
    pub fn new(
        computed_at: DateTime<Utc>,
        selection: Selection,
        positions: Vec<SatellitePosition>,
    ) -> Self {
        Self {
            update_id: Uuid::now_v7(),
            computed_at,
            selection,
            positions,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.positions.len() < self.selection.len()
    }
}
