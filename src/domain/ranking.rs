//! Facility ranking: hard filters, then an additive score, best first.
//!
//! Pure function of `(facilities, request)`. No I/O.

use super::disposition::specialties_for;
use super::entities::{Category, Coordinates, Facility, RankedFacility, RankingRequest};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Results returned per ranking call.
pub const MAX_RESULTS: usize = 10;

/// Weights for the additive score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Per kilometre. Negative: closer is better.
    pub distance: f64,
    pub specialty_match: f64,
    pub amenity_match: f64,
    /// Only applied for HIGH/CRITICAL requests.
    pub emergency_ready: f64,
    /// Multiplied by rating / 5.
    pub rating: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            distance: -0.5,
            specialty_match: 5.0,
            amenity_match: 2.0,
            emergency_ready: 4.0,
            rating: 2.0,
        }
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

fn passes_filters(facility: &Facility, request: &RankingRequest) -> bool {
    let f = &request.filters;
    if let Some(specialty) = f.specialty.as_deref() {
        if !facility.has_specialty(specialty) {
            return false;
        }
    }
    if let Some(amenity) = f.amenity.as_deref() {
        if !facility.has_amenity(amenity) {
            return false;
        }
    }
    if let Some(is_public) = f.is_public {
        if facility.is_public != is_public {
            return false;
        }
    }
    if let Some(min) = f.min_rating {
        match facility.rating {
            Some(r) if r >= min => {}
            _ => return false,
        }
    }
    true
}

/// Facility specialties mention the category code or one of its recommended specialties.
fn matches_category(facility: &Facility, category: Category) -> bool {
    facility.has_specialty(category.code())
        || specialties_for(category)
            .iter()
            .any(|s| facility.has_specialty(s))
}

fn score(
    facility: &Facility,
    distance_km: Option<f64>,
    request: &RankingRequest,
    weights: &RankingWeights,
) -> f64 {
    let mut total = 0.0;
    if let Some(km) = distance_km {
        total += weights.distance * km;
    }
    if let Some(category) = request.category {
        if matches_category(facility, category) {
            total += weights.specialty_match;
        }
    }
    if let Some(amenity) = request.filters.amenity.as_deref() {
        if facility.has_amenity(amenity) {
            total += weights.amenity_match;
        }
    }
    if request.severity.is_some_and(|s| s.is_urgent()) && facility.emergency_ready {
        total += weights.emergency_ready;
    }
    if let Some(rating) = facility.rating {
        total += weights.rating * (rating / 5.0);
    }
    total
}

/// Rank with explicit weights. Stable: equal scores keep input order.
pub fn rank_with(
    facilities: &[Facility],
    request: &RankingRequest,
    weights: &RankingWeights,
) -> Vec<RankedFacility> {
    let mut ranked: Vec<RankedFacility> = facilities
        .iter()
        .filter(|f| passes_filters(f, request))
        .map(|f| {
            let distance_km = request.origin.map(|o| haversine_km(o, f.location));
            RankedFacility {
                facility: f.clone(),
                distance_km,
                score: score(f, distance_km, request, weights),
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(MAX_RESULTS);
    ranked
}

/// Rank with the default weights.
pub fn rank(facilities: &[Facility], request: &RankingRequest) -> Vec<RankedFacility> {
    rank_with(facilities, request, &RankingWeights::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{RankingFilters, Severity};

    fn facility(id: &str, lat: f64, lng: f64) -> Facility {
        Facility {
            id: id.to_string(),
            name: format!("Facility {}", id),
            location: Coordinates { lat, lng },
            is_public: true,
            is_24h: false,
            emergency_ready: false,
            rating: Some(4.0),
            specialties: vec![],
            amenities: vec![],
        }
    }

    fn origin() -> Coordinates {
        Coordinates {
            lat: 43.2389,
            lng: 76.8897,
        }
    }

    fn ids(ranked: &[RankedFacility]) -> Vec<&str> {
        ranked.iter().map(|r| r.facility.id.as_str()).collect()
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert!(haversine_km(origin(), origin()).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is ~111.19 km.
        let a = Coordinates { lat: 0.0, lng: 0.0 };
        let b = Coordinates { lat: 1.0, lng: 0.0 };
        assert!((haversine_km(a, b) - 111.19).abs() < 0.01);
    }

    #[test]
    fn test_closer_facility_ranks_first() {
        let o = origin();
        // 0.1 km and 40 km due north.
        let near = facility("near", o.lat + 0.1 / 111.19, o.lng);
        let far = facility("far", o.lat + 40.0 / 111.19, o.lng);
        let request = RankingRequest {
            origin: Some(o),
            category: Some(Category::Eye),
            ..Default::default()
        };
        let ranked = rank(&[far, near], &request);
        assert_eq!(ids(&ranked), vec!["near", "far"]);
        assert!((ranked[0].distance_km.unwrap() - 0.1).abs() < 0.01);
        assert!((ranked[1].distance_km.unwrap() - 40.0).abs() < 0.1);
    }

    #[test]
    fn test_no_origin_means_no_distance() {
        let ranked = rank(&[facility("a", 10.0, 10.0)], &RankingRequest::default());
        assert_eq!(ranked[0].distance_km, None);
        assert!((ranked[0].score - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_results_are_capped() {
        let many: Vec<Facility> = (0..25)
            .map(|i| facility(&i.to_string(), 43.0 + i as f64 * 0.01, 76.0))
            .collect();
        assert_eq!(rank(&many, &RankingRequest::default()).len(), MAX_RESULTS);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let list: Vec<Facility> = ["c", "a", "b"].iter().map(|id| facility(id, 1.0, 1.0)).collect();
        let ranked = rank(&list, &RankingRequest::default());
        assert_eq!(ids(&ranked), vec!["c", "a", "b"]);
        assert_eq!(ids(&rank(&list, &RankingRequest::default())), ids(&ranked));
    }

    #[test]
    fn test_specialty_match_by_code_or_name() {
        let mut cardio = facility("cardio", 1.0, 1.0);
        cardio.specialties = vec!["cardiology".into()];
        let mut coded = facility("coded", 1.0, 1.0);
        coded.specialties = vec!["CHEST".into()];
        let plain = facility("plain", 1.0, 1.0);
        let request = RankingRequest {
            category: Some(Category::Chest),
            ..Default::default()
        };
        let ranked = rank(&[plain, cardio, coded], &request);
        assert_eq!(ids(&ranked), vec!["cardio", "coded", "plain"]);
    }

    #[test]
    fn test_emergency_bonus_only_when_urgent() {
        let mut er = facility("er", 1.0, 1.0);
        er.emergency_ready = true;
        er.rating = Some(3.0);
        let clinic = facility("clinic", 1.0, 1.0);
        let list = [clinic, er];

        let calm = RankingRequest {
            severity: Some(Severity::Medium),
            ..Default::default()
        };
        assert_eq!(ids(&rank(&list, &calm)), vec!["clinic", "er"]);

        let urgent = RankingRequest {
            severity: Some(Severity::Critical),
            ..Default::default()
        };
        assert_eq!(ids(&rank(&list, &urgent)), vec!["er", "clinic"]);
    }

    #[test]
    fn test_hard_filters() {
        let mut a = facility("a", 1.0, 1.0);
        a.specialties = vec!["Pediatrics".into()];
        a.amenities = vec!["Parking".into()];
        let mut b = facility("b", 1.0, 1.0);
        b.is_public = false;
        b.rating = None;
        let mut c = facility("c", 1.0, 1.0);
        c.rating = Some(2.5);
        let list = [a, b, c];

        let by = |filters: RankingFilters| {
            let request = RankingRequest {
                filters,
                ..Default::default()
            };
            ids(&rank(&list, &request))
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            by(RankingFilters {
                specialty: Some("pediatrics".into()),
                ..Default::default()
            }),
            vec!["a"]
        );
        assert_eq!(
            by(RankingFilters {
                amenity: Some("parking".into()),
                ..Default::default()
            }),
            vec!["a"]
        );
        assert_eq!(
            by(RankingFilters {
                is_public: Some(false),
                ..Default::default()
            }),
            vec!["b"]
        );
        // Unrated facilities never satisfy a minimum rating.
        assert_eq!(
            by(RankingFilters {
                min_rating: Some(0.0),
                ..Default::default()
            }),
            vec!["a", "c"]
        );
        assert_eq!(
            by(RankingFilters {
                min_rating: Some(3.0),
                ..Default::default()
            }),
            vec!["a"]
        );
    }

    #[test]
    fn test_relaxing_specialty_filter_never_shrinks_candidates() {
        let list: Vec<Facility> = (0..6)
            .map(|i| {
                let mut f = facility(&i.to_string(), 1.0, 1.0 + i as f64);
                if i % 2 == 0 {
                    f.specialties = vec!["Dermatology".into()];
                }
                f
            })
            .collect();
        let strict = RankingRequest {
            filters: RankingFilters {
                specialty: Some("Dermatology".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let relaxed = RankingRequest::default();
        let strict_len = rank(&list, &strict).len();
        let relaxed_len = rank(&list, &relaxed).len();
        assert_eq!(strict_len, 3);
        assert!(relaxed_len >= strict_len);
        assert!(relaxed_len <= MAX_RESULTS);
    }

    #[test]
    fn test_amenity_filter_adds_bonus() {
        let mut a = facility("a", 1.0, 1.0);
        a.amenities = vec!["Wheelchair".into()];
        let request = RankingRequest {
            filters: RankingFilters {
                amenity: Some("wheelchair".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let ranked = rank(&[a], &request);
        assert!((ranked[0].score - (2.0 + 1.6)).abs() < 1e-9);
    }
}
