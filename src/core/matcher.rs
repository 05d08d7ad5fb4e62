use std::cmp::Ordering;
use std::collections::HashSet;

use crate::core::{
    filters::matches_filters,
    scoring::{calculate_match_score, ScoringContext},
};
use crate::models::{DiscoverFilters, LawyerProfile, ScoredLawyer, ScoringWeights};

const DEFAULT_PRICE_CEILING: u32 = 1000;

/// One ranking pass over a candidate pool
#[derive(Debug, Clone, Copy)]
pub struct RankRequest<'a> {
    pub filters: &'a DiscoverFilters,
    /// Specialties used for scoring; may differ from the hard filter
    pub wanted_specialties: &'a [String],
    /// Lawyers the client has already swiped on
    pub exclude_ids: &'a HashSet<String>,
    pub offset: usize,
    pub limit: usize,
}

/// Result of the ranking process
#[derive(Debug)]
pub struct RankResult {
    pub lawyers: Vec<ScoredLawyer>,
    pub total_candidates: usize,
    pub total_eligible: usize,
    pub next_offset: Option<usize>,
}

/// Ranks lawyers for a client
///
/// # Pipeline Stages
/// 1. Drop lawyers the client already swiped on
/// 2. Hard filters (location, rate range, specialties)
/// 3. Scoring
/// 4. Ordering: score desc, rating desc, lawyer id asc
/// 5. Offset pagination
#[derive(Debug, Clone)]
pub struct Matcher {
    weights: ScoringWeights,
    default_max_rate: u32,
}

impl Matcher {
    pub fn new(weights: ScoringWeights, default_max_rate: u32) -> Self {
        Self {
            weights,
            default_max_rate,
        }
    }

    pub fn with_default_weights() -> Self {
        Self::new(ScoringWeights::default(), DEFAULT_PRICE_CEILING)
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    pub fn rank(&self, candidates: Vec<LawyerProfile>, request: &RankRequest<'_>) -> RankResult {
        let total_candidates = candidates.len();

        let price_ceiling = request
            .filters
            .max_rate
            .map(|rate| rate.max(0) as f64)
            .unwrap_or(self.default_max_rate as f64);

        let context = ScoringContext {
            wanted_specialties: request.wanted_specialties,
            price_ceiling,
        };

        let mut scored: Vec<ScoredLawyer> = candidates
            .into_iter()
            .filter(|lawyer| !request.exclude_ids.contains(&lawyer.lawyer_id))
            .filter(|lawyer| matches_filters(lawyer, request.filters))
            .map(|lawyer| {
                let (match_score, breakdown, shared_specialties) =
                    calculate_match_score(&lawyer, &context, &self.weights);
                ScoredLawyer {
                    profile: lawyer,
                    match_score,
                    breakdown,
                    shared_specialties,
                }
            })
            .collect();

        scored.sort_by(compare_ranked);

        let total_eligible = scored.len();
        let lawyers: Vec<ScoredLawyer> = scored
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .collect();

        let consumed = request.offset + lawyers.len();
        let next_offset = (lawyers.len() == request.limit && consumed < total_eligible).then_some(consumed);

        RankResult {
            lawyers,
            total_candidates,
            total_eligible,
            next_offset,
        }
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::with_default_weights()
    }
}

fn compare_ranked(a: &ScoredLawyer, b: &ScoredLawyer) -> Ordering {
    b.match_score
        .partial_cmp(&a.match_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| {
            b.profile
                .rating
                .partial_cmp(&a.profile.rating)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.profile.lawyer_id.cmp(&b.profile.lawyer_id))
}

/// Cursors are opaque to clients but are plain offsets here
pub fn encode_cursor(offset: usize) -> String {
    offset.to_string()
}

pub fn decode_cursor(cursor: &str) -> Option<usize> {
    cursor.trim().parse().ok()
}
