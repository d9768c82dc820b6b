use crate::models::Location;

pub const EARTH_RADIUS_MILES: f64 = 3959.0;
pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn haversine(a: &Location, b: &Location, radius: f64) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.latitude.to_radians().cos() * b.latitude.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    radius * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Great-circle distance in miles.
pub fn haversine_miles(a: &Location, b: &Location) -> f64 {
    haversine(a, b, EARTH_RADIUS_MILES)
}

pub fn haversine_km(a: &Location, b: &Location) -> f64 {
    haversine(a, b, EARTH_RADIUS_KM)
}

/// Miles between two optional locations. `None` means unknown, not zero.
pub fn distance_between(a: Option<&Location>, b: Option<&Location>) -> Option<f64> {
    Some(haversine_miles(a?, b?))
}

/// Whether `to` is within `max_miles` of `from`. Fails open: no limit
/// (absent or zero) or a missing location never excludes.
pub fn is_within_distance(from: Option<&Location>, to: Option<&Location>, max_miles: Option<f64>) -> bool {
    let Some(max) = max_miles.filter(|m| *m > 0.0) else {
        return true;
    };
    distance_between(from, to).map_or(true, |d| d <= max)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SF: Location = Location { latitude: 37.7749, longitude: -122.4194 };
    const LA: Location = Location { latitude: 34.0522, longitude: -118.2437 };

    #[test]
    fn sf_to_la() {
        let miles = haversine_miles(&SF, &LA);
        assert!((miles - 347.4).abs() < 3.0, "got {miles}");
        let km = haversine_km(&SF, &LA);
        assert!((km - 559.1).abs() < 5.0, "got {km}");
    }

    #[test]
    fn same_point_is_zero() {
        assert_eq!(haversine_miles(&SF, &SF), 0.0);
    }

    #[test]
    fn unknown_location_has_no_distance() {
        assert_eq!(distance_between(Some(&SF), None), None);
        assert_eq!(distance_between(None, Some(&SF)), None);
    }

    #[test]
    fn within_distance_fails_open() {
        assert!(is_within_distance(Some(&SF), Some(&LA), None));
        assert!(is_within_distance(Some(&SF), Some(&LA), Some(0.0)));
        assert!(is_within_distance(None, Some(&LA), Some(1.0)));
        assert!(is_within_distance(Some(&SF), None, Some(1.0)));
        assert!(!is_within_distance(Some(&SF), Some(&LA), Some(100.0)));
        assert!(is_within_distance(Some(&SF), Some(&LA), Some(400.0)));
    }
}
