//! Facility search use case: snapshot the catalog, then rank against the request.

use crate::domain::ranking::{RankingWeights, rank_with};
use crate::domain::{Consultation, DomainError, RankedFacility, RankingRequest};
use crate::ports::FacilityCatalog;
use std::sync::Arc;
use tracing::info;

/// Ranks catalog facilities for a request. Stateless apart from the catalog handle.
pub struct FacilityService {
    catalog: Arc<dyn FacilityCatalog>,
    weights: RankingWeights,
}

impl FacilityService {
    pub fn new(catalog: Arc<dyn FacilityCatalog>) -> Self {
        Self::with_weights(catalog, RankingWeights::default())
    }

    pub fn with_weights(catalog: Arc<dyn FacilityCatalog>, weights: RankingWeights) -> Self {
        Self { catalog, weights }
    }

    /// Rank the current catalog snapshot. Best first, at most 10 results.
    pub async fn rank_facilities(
        &self,
        request: &RankingRequest,
    ) -> Result<Vec<RankedFacility>, DomainError> {
        validate(request)?;
        let facilities = self.catalog.facilities().await?;
        let ranked = rank_with(&facilities, request, &self.weights);
        info!(
            candidates = facilities.len(),
            returned = ranked.len(),
            category = request.category.map(|c| c.code()).unwrap_or("-"),
            severity = request.severity.map(|s| s.code()).unwrap_or("-"),
            "facilities ranked"
        );
        Ok(ranked)
    }

    /// Rank using the category and severity a consultation produced.
    pub async fn rank_for_consultation(
        &self,
        consultation: &Consultation,
        mut request: RankingRequest,
    ) -> Result<Vec<RankedFacility>, DomainError> {
        request.category = request.category.or(consultation.category);
        request.severity = request.severity.or(consultation.severity());
        self.rank_facilities(&request).await
    }
}

fn validate(request: &RankingRequest) -> Result<(), DomainError> {
    if let Some(min) = request.filters.min_rating {
        if !(0.0..=5.0).contains(&min) {
            return Err(DomainError::Validation(format!(
                "minimum rating must be within 0-5, got {}",
                min
            )));
        }
    }
    if let Some(origin) = request.origin {
        crate::domain::Coordinates::new(origin.lat, origin.lng)?;
    }
    Ok(())
}
