//! LegalTendr - client/lawyer matching service
//!
//! Clients describe their legal cases and swipe through lawyer profiles
//! ranked by specialty coverage, rating, experience, price and popularity.
//! A right swipe is a match and opens a conversation with the lawyer.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::config::Settings;
pub use crate::core::{Matcher, RankRequest, RankResult};
pub use crate::models::{
    Case, DiscoverFilters, DiscoverResponse, LawyerProfile, ScoredLawyer, ScoringWeights, Swipe, SwipeDirection,
    UserType,
};
pub use crate::routes::{configure_routes, AppState};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matcher = Matcher::default();
        assert_eq!(matcher.weights().specialty, ScoringWeights::default().specialty);
    }
}
