// Service exports
pub mod accounts;
pub mod auth;
pub mod cache;
pub mod cases;
pub mod lawyers;
pub mod messaging;
pub mod postgres;
pub mod supabase;
pub mod swipes;

pub use accounts::NewAccount;
pub use auth::{AuthError, AuthService, Claims};
pub use cache::{CacheError, CacheKey, CacheManager, CacheStats};
pub use cases::{can_view_case, check_case_update};
pub use postgres::{PostgresClient, PostgresError};
pub use supabase::{SupabaseClient, SupabaseError};
pub use swipes::{RecordedSwipe, UndoneSwipe};
