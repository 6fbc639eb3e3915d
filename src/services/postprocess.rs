use crate::models::Recommendation;
use crate::services::geo;

/// Enriches raw recommendations with distance data and applies the radius.
///
/// For each candidate: compute the great-circle distance from the query
/// origin, round it to one decimal place and attach a formatted label. Items
/// farther than `radius_km` are dropped, the rest sorted ascending by
/// distance. The only pipeline stage with no model involvement.
pub fn post_process(
    recommendations: Vec<Recommendation>,
    latitude: f64,
    longitude: f64,
    radius_km: f64,
) -> Vec<Recommendation> {
    let mut enriched: Vec<Recommendation> = recommendations
        .into_iter()
        .map(|mut rec| {
            let distance = geo::distance_km(latitude, longitude, rec.latitude, rec.longitude);
            rec.distance = Some((distance * 10.0).round() / 10.0);
            rec.formatted_distance = Some(geo::format_distance(distance));
            rec
        })
        .filter(|rec| rec.distance.unwrap_or(f64::MAX) <= radius_km)
        .collect();

    enriched.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    enriched
}
