use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().atan2((1.0 - haversine).sqrt());

    EARTH_RADIUS_KM * central_angle
}

/// Orders candidates ascending by distance from `origin`. Equal distances
/// keep their input order (first-listed candidate wins), so the claim loop
/// has a deterministic tie-break.
pub fn rank_by_distance<T>(origin: &GeoPoint, candidates: Vec<(T, GeoPoint)>) -> Vec<(T, f64)> {
    let mut ranked: Vec<(T, f64)> = candidates
        .into_iter()
        .map(|(item, point)| {
            let distance = haversine_km(origin, &point);
            (item, distance)
        })
        .collect();

    // sort_by is stable, which is what makes the tie-break hold.
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}
