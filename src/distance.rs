//! Great-circle distance and display helpers.
//!
//! Pure functions used by the renderer: haversine distance in miles,
//! distance labels and star-rating descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GeofacetError, Result};

/// Mean Earth radius in miles.
///
/// The Earth is an oblate spheroid, so distances are approximate.
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Number of glyphs in a star rating.
pub const MAX_STARS: u8 = 5;

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90).
    pub lat: f64,
    /// Longitude in degrees (-180 to 180).
    pub lng: f64,
}

impl GeoPoint {
    /// Create a new point, validating the coordinate ranges.
    pub fn new(lat: f64, lng: f64) -> Result<Self> {
        let point = GeoPoint { lat, lng };
        if !point.is_valid() {
            return Err(GeofacetError::invalid_argument(format!(
                "Coordinates out of range: {lat},{lng}"
            )));
        }
        Ok(point)
    }

    /// Whether both coordinates are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Distance to another point in miles.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance(*self, *other)
    }

    /// Parse a `"lat,lng"` pair.
    pub fn parse(value: &str) -> Result<Self> {
        let (lat, lng) = value.split_once(',').ok_or_else(|| {
            GeofacetError::invalid_argument(format!("Expected \"lat,lng\", got {value:?}"))
        })?;
        let lat = lat.trim().parse::<f64>().map_err(|e| {
            GeofacetError::invalid_argument(format!("Invalid latitude {lat:?}: {e}"))
        })?;
        let lng = lng.trim().parse::<f64>().map_err(|e| {
            GeofacetError::invalid_argument(format!("Invalid longitude {lng:?}: {e}"))
        })?;
        GeoPoint::new(lat, lng)
    }
}

impl fmt::Display for GeoPoint {
    /// Formats as `lat,lng`, the `aroundLatLng` wire form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Haversine distance between two points, in miles.
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1_rad = a.lat.to_radians();
    let lat2_rad = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_MILES * c
}

/// Format a distance for display.
///
/// One decimal place below ten miles, a rounded integer from ten up.
pub fn format_distance(miles: f64) -> String {
    if miles < 10.0 {
        format!("{miles:.1} mi")
    } else {
        format!("{} mi", miles.round())
    }
}

/// A single glyph of a star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StarGlyph {
    Full,
    Half,
    Empty,
}

/// Star glyph descriptor for a rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarRating {
    /// The rating as given, before rounding.
    pub rating: f64,
    /// The rating rounded to the nearest half star.
    pub rounded: f64,
    pub full: u8,
    pub half: u8,
    pub empty: u8,
}

impl StarRating {
    /// Accessible label, e.g. `"3.5 stars"`.
    pub fn label(&self) -> String {
        format!("{} stars", self.rating)
    }

    /// Glyphs in display order: full, then half, then empty.
    pub fn glyphs(&self) -> impl Iterator<Item = StarGlyph> + '_ {
        std::iter::repeat_n(StarGlyph::Full, self.full as usize)
            .chain(std::iter::repeat_n(StarGlyph::Half, self.half as usize))
            .chain(std::iter::repeat_n(StarGlyph::Empty, self.empty as usize))
    }
}

impl fmt::Display for StarRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for glyph in self.glyphs() {
            let c = match glyph {
                StarGlyph::Full => '★',
                StarGlyph::Half => '⯪',
                StarGlyph::Empty => '☆',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Convert a rating into full, half and empty star counts summing to five.
///
/// The rating is rounded to the nearest 0.5 first. Ratings outside `[0, 5]`
/// are clamped so the counts always add up.
pub fn rating_to_stars(rating: f64) -> StarRating {
    let clamped = if rating.is_nan() {
        0.0
    } else {
        rating.clamp(0.0, f64::from(MAX_STARS))
    };
    let rounded = (clamped * 2.0).round() / 2.0;
    let full = rounded.floor() as u8;
    let empty = (f64::from(MAX_STARS) - rounded).floor() as u8;
    let half = MAX_STARS - full - empty;

    StarRating {
        rating,
        rounded,
        full,
        half,
        empty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nyc() -> GeoPoint {
        GeoPoint::new(40.7127281, -74.0060152).unwrap()
    }

    fn sf() -> GeoPoint {
        GeoPoint::new(37.7749, -122.4194).unwrap()
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance(nyc(), nyc()), 0.0);
        assert_eq!(distance(sf(), sf()), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let points = [
            nyc(),
            sf(),
            GeoPoint::new(-33.8688, 151.2093).unwrap(),
            GeoPoint::new(0.0, 0.0).unwrap(),
        ];
        for a in points {
            for b in points {
                assert!((distance(a, b) - distance(b, a)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_distance_nyc_to_sf() {
        let miles = nyc().distance_to(&sf());
        assert!((2560.0..2580.0).contains(&miles), "got {miles}");
    }

    #[test]
    fn test_format_distance_boundaries() {
        assert_eq!(format_distance(3.42), "3.4 mi");
        assert_eq!(format_distance(9.999), "10.0 mi");
        assert_eq!(format_distance(10.0), "10 mi");
        assert_eq!(format_distance(41.6), "42 mi");
        assert_eq!(format_distance(0.0), "0.0 mi");
    }

    #[test]
    fn test_rating_to_stars_rounding() {
        let stars = rating_to_stars(3.2);
        assert_eq!((stars.full, stars.half, stars.empty), (3, 0, 2));
        assert_eq!(stars.rounded, 3.0);

        let stars = rating_to_stars(3.3);
        assert_eq!((stars.full, stars.half, stars.empty), (3, 1, 1));
        assert_eq!(stars.rounded, 3.5);

        let stars = rating_to_stars(5.0);
        assert_eq!((stars.full, stars.half, stars.empty), (5, 0, 0));
    }

    #[test]
    fn test_rating_to_stars_always_sums_to_five() {
        let mut rating = 0.0;
        while rating <= 5.0 {
            let stars = rating_to_stars(rating);
            assert_eq!(stars.full + stars.half + stars.empty, MAX_STARS, "rating {rating}");
            assert_eq!(stars.glyphs().count(), MAX_STARS as usize);
            rating += 0.05;
        }
        let stars = rating_to_stars(7.5);
        assert_eq!(stars.full + stars.half + stars.empty, MAX_STARS);
    }

    #[test]
    fn test_star_label_keeps_original_rating() {
        assert_eq!(rating_to_stars(4.0).label(), "4 stars");
        assert_eq!(rating_to_stars(3.3).label(), "3.3 stars");
        assert_eq!(rating_to_stars(2.5).to_string(), "★★⯪☆☆");
    }

    #[test]
    fn test_geo_point_parse_and_display() {
        let point = GeoPoint::parse("40.5, -73.25").unwrap();
        assert_eq!(point, GeoPoint { lat: 40.5, lng: -73.25 });
        assert_eq!(point.to_string(), "40.5,-73.25");
        assert!(GeoPoint::parse("91,0").is_err());
        assert!(GeoPoint::parse("north").is_err());
    }
}
