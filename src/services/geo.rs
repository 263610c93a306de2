use crate::database::models::{PunchProof, Site};

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters between two (lat, lng) points in degrees.
pub fn haversine_meters(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lng2) = (to.0.to_radians(), to.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = lng2 - lng1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Distance from the site and whether the punch fell inside its radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceCheck {
    pub distance_m: f64,
    pub in_range: bool,
}

/// `None` when the punch has no coordinates.
pub fn check_geofence(site: &Site, proof: &PunchProof) -> Option<GeofenceCheck> {
    let point = proof.coordinates()?;
    let distance_m = haversine_meters(point, (site.latitude, site.longitude));

    Some(GeofenceCheck {
        distance_m: (distance_m * 100.0).round() / 100.0,
        in_range: distance_m <= site.radius_meters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn makati_office() -> Site {
        Site {
            id: Uuid::new_v4(),
            name: "Makati".to_string(),
            latitude: 14.5547,
            longitude: 121.0244,
            radius_meters: 150.0,
        }
    }

    fn proof(latitude: f64, longitude: f64) -> PunchProof {
        PunchProof {
            photo_ref: None,
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    #[test]
    fn same_point_is_zero_distance() {
        assert_eq!(haversine_meters((14.5, 121.0), (14.5, 121.0)), 0.0);
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = haversine_meters((0.0, 0.0), (1.0, 0.0));
        assert!((distance - 111_195.0).abs() < 10.0);
    }

    #[test]
    fn nearby_punch_is_in_range() {
        let check = check_geofence(&makati_office(), &proof(14.5550, 121.0245)).unwrap();
        assert!(check.in_range);
        assert!(check.distance_m < 150.0);
    }

    #[test]
    fn distant_punch_is_flagged_with_distance() {
        let check = check_geofence(&makati_office(), &proof(14.6760, 121.0437)).unwrap();
        assert!(!check.in_range);
        assert!(check.distance_m > 10_000.0);
    }

    #[test]
    fn punch_without_coordinates_is_not_checked() {
        assert_eq!(check_geofence(&makati_office(), &PunchProof::default()), None);
    }
}
