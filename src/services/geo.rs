/// Earth radius in kilometers, used by the haversine formula
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers between two coordinate pairs
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Human-readable distance label: metres under 1 km, otherwise kilometres
/// with one decimal (e.g. "650 m", "2.4km").
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else {
        format!("{:.1}km", km)
    }
}

/// Whether the pair is a plausible WGS84 coordinate
pub fn is_valid_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        assert_eq!(distance_km(40.7128, -74.0060, 40.7128, -74.0060), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = distance_km(40.7128, -74.0060, 34.0522, -118.2437);
        let ba = distance_km(34.0522, -118.2437, 40.7128, -74.0060);
        assert!((ab - ba).abs() < 1e-9);
    }

    #[test]
    fn test_one_degree_of_latitude_is_about_111_km() {
        let d = distance_km(40.0, -74.0, 41.0, -74.0);
        assert!((d - 111.0).abs() / 111.0 < 0.01, "got {}", d);
    }

    #[test]
    fn test_format_distance_under_one_km_uses_metres() {
        assert_eq!(format_distance(0.65), "650 m");
        assert_eq!(format_distance(0.0), "0 m");
    }

    #[test]
    fn test_format_distance_over_one_km_uses_km() {
        assert_eq!(format_distance(2.35), "2.3km");
        assert_eq!(format_distance(1.0), "1.0km");
    }

    #[test]
    fn test_is_valid_coordinates_bounds() {
        assert!(is_valid_coordinates(90.0, 180.0));
        assert!(is_valid_coordinates(-90.0, -180.0));
        assert!(!is_valid_coordinates(90.1, 0.0));
        assert!(!is_valid_coordinates(0.0, -180.5));
    }
}
