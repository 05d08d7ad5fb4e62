// Core algorithm exports
pub mod filters;
pub mod identity;
pub mod matcher;
pub mod scoring;

pub use filters::{matches_filters, shared_specialties};
pub use identity::{capitalize_words, generate_user_id};
pub use matcher::{decode_cursor, encode_cursor, Matcher, RankRequest, RankResult};
pub use scoring::{calculate_match_score, ScoringContext};
