// ── Map coordinates ──

use serde::{Deserialize, Serialize};

/// A map position. Treated as planar for geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Shift both axes by `delta`.
    pub fn offset(self, delta: f64) -> Self {
        Self::new(self.lat + delta, self.lng + delta)
    }

    pub fn is_finite(self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    /// `[lat, lng]` as the inventory wire format expects.
    pub fn to_coord(self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    pub fn from_coord(coord: [f64; 2]) -> Self {
        Self::new(coord[0], coord[1])
    }
}

impl From<(f64, f64)> for Point {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}
