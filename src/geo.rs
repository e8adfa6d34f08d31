//! Fixed centroid table for NYC boroughs and well-known areas.
//!
//! Used by adapters to fill in coordinates when the upstream record carries a
//! borough but no geocoding. Absence of a match is fine; coordinates stay
//! `None`.

use crate::event::normalize_place;

const CENTROIDS: &[(&str, f64, f64)] = &[
    ("manhattan", 40.7831, -73.9712),
    ("brooklyn", 40.6782, -73.9442),
    ("queens", 40.7282, -73.7949),
    ("bronx", 40.8448, -73.8648),
    ("staten island", 40.5795, -74.1502),
    ("central park", 40.7829, -73.9654),
    ("times square", 40.7580, -73.9855),
    ("williamsburg", 40.7081, -73.9571),
    ("soho", 40.7230, -73.9991),
    ("greenwich village", 40.7335, -73.9976),
];

/// Look up a `(lat, lon)` centroid for a borough or neighborhood name.
pub fn centroid(name: &str) -> Option<(f64, f64)> {
    let norm = normalize_place(name);
    if norm.is_empty() {
        return None;
    }
    CENTROIDS
        .iter()
        .find(|(k, _, _)| *k == norm || norm == format!("the {k}"))
        .map(|&(_, lat, lon)| (lat, lon))
}
