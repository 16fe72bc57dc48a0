/// Great-circle distance utilities for the nearby-events filter
///
/// Distances are computed with the Haversine formula on a spherical earth
/// with mean radius 6371 km. Good to well under 1% error, which is more than
/// enough for a "what's on near me" radius query.
///
/// # Example
///
/// ```
/// use gatherly_shared::geo::{distance_km, is_within_radius};
///
/// let stuttgart = (48.7755, 9.1827);
/// let mannheim = (49.4836, 8.4630);
///
/// let d = distance_km(stuttgart.0, stuttgart.1, mannheim.0, mannheim.1);
/// assert!(d > 94.0 && d < 95.0);
/// assert!(is_within_radius(stuttgart.0, stuttgart.1, mannheim.0, mannheim.1, 100.0));
/// ```

use serde::{Deserialize, Serialize};

/// Mean earth radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A validated latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees, -90..=90
    pub latitude: f64,

    /// Longitude in degrees, -180..=180
    pub longitude: f64,
}

impl Coordinates {
    /// Creates coordinates, returning `None` when either component is out of
    /// range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
        })
    }

    /// Distance to another point in kilometers
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

/// Calculates the distance between two geographic coordinates in kilometers
/// using the Haversine formula.
///
/// Inputs are degrees. The result is symmetric and zero for coincident
/// points.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Checks whether a point is within `radius_km` of another point.
///
/// The boundary is inclusive: a point exactly `radius_km` away is "within".
pub fn is_within_radius(lat1: f64, lon1: f64, lat2: f64, lon2: f64, radius_km: f64) -> bool {
    distance_km(lat1, lon1, lat2, lon2) <= radius_km
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_coincident_points() {
        assert_eq!(distance_km(0.0, 0.0, 0.0, 0.0), 0.0);
        assert_eq!(distance_km(-25.0, 55.0, -25.0, 55.0), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let d1 = distance_km(48.7755, 9.1827, 49.4836, 8.4630);
        let d2 = distance_km(49.4836, 8.4630, 48.7755, 9.1827);
        assert_eq!(d1, d2);
    }

    #[test]
    fn known_distances() {
        // Stuttgart -> Mannheim, roughly 95 km
        let d = distance_km(48.7755, 9.1827, 49.4836, 8.4630);
        assert!(d > 94.0 && d < 96.0, "got {}", d);

        // New York -> Sydney, roughly 15,990 km
        let d = distance_km(40.714268, -74.005974, -33.867138, 151.207108);
        assert!(d > 15_900.0 && d < 16_100.0, "got {}", d);

        // One degree of latitude/longitude at the equator is ~111 km, so
        // (1,1) is ~157 km from the origin.
        let d = distance_km(0.0, 0.0, 1.0, 1.0);
        assert!(d > 155.0 && d < 159.0, "got {}", d);
    }

    #[test]
    fn antimeridian_is_a_short_hop() {
        let d = distance_km(-15.0, -180.0, -15.0, 180.0);
        assert!(d < 0.001, "got {}", d);
    }

    #[test]
    fn radius_zero_matches_only_coincident_points() {
        assert!(is_within_radius(0.0, 0.0, 0.0, 0.0, 0.0));
        assert!(!is_within_radius(0.0, 0.0, 1.0, 1.0, 0.0));
    }

    #[test]
    fn radius_membership() {
        // (1,1) is ~157 km from the origin: outside 10 km, inside 200 km
        assert!(!is_within_radius(0.0, 0.0, 1.0, 1.0, 10.0));
        assert!(is_within_radius(0.0, 0.0, 1.0, 1.0, 200.0));
    }

    #[test]
    fn coordinates_validation() {
        assert!(Coordinates::new(0.0, 0.0).is_some());
        assert!(Coordinates::new(90.0, 180.0).is_some());
        assert!(Coordinates::new(-90.0, -180.0).is_some());
        assert!(Coordinates::new(90.000001, 0.0).is_none());
        assert!(Coordinates::new(0.0, -180.000001).is_none());
        assert!(Coordinates::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn coordinates_distance_to() {
        let a = Coordinates::new(0.0, 0.0).unwrap();
        let b = Coordinates::new(1.0, 1.0).unwrap();
        assert_eq!(a.distance_to(&b), b.distance_to(&a));
        assert_eq!(a.distance_to(&a), 0.0);
    }
}
