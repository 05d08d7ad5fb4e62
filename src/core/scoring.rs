use crate::core::filters::shared_specialties;
use crate::models::{LawyerProfile, ScoreBreakdown, ScoringWeights};

const MAX_RATING: f64 = 5.0;
const EXPERIENCE_CAP_YEARS: f64 = 20.0;
const POPULARITY_SATURATION: f64 = 100.0;

/// What the client is looking for when a lawyer is scored
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub wanted_specialties: &'a [String],
    /// Hourly rate at which the price component reaches zero
    pub price_ceiling: f64,
}

/// Calculate a match score (0-100) for a lawyer
///
/// Scoring formula:
/// score = (
///     specialty_score * 0.40 +     # Share of wanted specialties covered
///     rating_score * 0.25 +        # rating / 5
///     experience_score * 0.15 +    # Years of practice, capped at 20
///     price_score * 0.10 +         # Cheaper relative to the ceiling = higher
///     popularity_score * 0.10      # Log-scaled match count
/// ) * 100
pub fn calculate_match_score(
    lawyer: &LawyerProfile,
    context: &ScoringContext<'_>,
    weights: &ScoringWeights,
) -> (f64, ScoreBreakdown, Vec<String>) {
    let shared = shared_specialties(lawyer, context.wanted_specialties);

    let breakdown = ScoreBreakdown {
        specialty: calculate_specialty_score(shared.len(), context.wanted_specialties.len()),
        rating: calculate_rating_score(lawyer.rating),
        experience: calculate_experience_score(lawyer.years_of_experience),
        price: calculate_price_score(lawyer.hourly_rate, context.price_ceiling),
        popularity: calculate_popularity_score(lawyer.matches_count),
    };

    let total_score = (breakdown.specialty * weights.specialty
        + breakdown.rating * weights.rating
        + breakdown.experience * weights.experience
        + breakdown.price * weights.price
        + breakdown.popularity * weights.popularity)
        * 100.0;

    (total_score.clamp(0.0, 100.0), breakdown, shared)
}

/// Fraction of wanted specialties the lawyer covers; neutral when nothing is wanted
#[inline]
fn calculate_specialty_score(shared: usize, wanted: usize) -> f64 {
    if wanted == 0 {
        return 1.0;
    }
    (shared as f64 / wanted as f64).min(1.0)
}

#[inline]
fn calculate_rating_score(rating: f64) -> f64 {
    (rating / MAX_RATING).clamp(0.0, 1.0)
}

#[inline]
fn calculate_experience_score(years: i32) -> f64 {
    (years.max(0) as f64).min(EXPERIENCE_CAP_YEARS) / EXPERIENCE_CAP_YEARS
}

/// Linear falloff from free (1.0) to the ceiling (0.0)
#[inline]
fn calculate_price_score(hourly_rate: i32, ceiling: f64) -> f64 {
    if ceiling <= 0.0 {
        return if hourly_rate <= 0 { 1.0 } else { 0.0 };
    }
    1.0 - (hourly_rate.max(0) as f64 / ceiling).min(1.0)
}

/// Logarithmic so the first few matches count the most
#[inline]
fn calculate_popularity_score(matches_count: i32) -> f64 {
    let matches = matches_count.max(0) as f64;
    ((1.0 + matches).ln() / (1.0 + POPULARITY_SATURATION).ln()).min(1.0)
}
