// Great-circle distance between cities

use crate::{error::RecommendError, models::Coordinate, registry::CityRegistry};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Haversine distance in kilometres, unrounded.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();

    let a = ((d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

// Distance rounded to the nearest whole kilometre.
pub fn distance_km(from: Coordinate, to: Coordinate) -> u32 {
    haversine_km(from, to).round() as u32
}

// Distance from a named origin city to a coordinate. The origin must be
// known to the registry and carry a coordinate.
pub fn distance_from_city(
    registry: &CityRegistry,
    origin_city: &str,
    to: Coordinate,
) -> Result<u32, RecommendError> {
    registry
        .coordinate_of(origin_city)
        .map(|from| distance_km(from, to))
        .ok_or_else(|| RecommendError::CoordinateUnavailable {
            city: origin_city.to_string(),
        })
}
