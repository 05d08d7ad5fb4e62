use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{ClientProfile, Conversation, LawyerProfile, Message, ScoredLawyer, Swipe, User};

/// Returned by sign-up and sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: User,
}

/// Current account with its role-specific profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lawyer: Option<LawyerProfile>,
}

/// Response for the discover endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub lawyers: Vec<ScoredLawyer>,
    pub next_cursor: Option<String>,
    pub total_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub swipe: Swipe,
    pub conversation_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoSwipeResponse {
    pub swipe: Swipe,
    pub conversation_removed: bool,
}

/// A conversation together with the message that opened it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationStartedResponse {
    pub conversation: Conversation,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub database: bool,
    pub cache: CacheHealth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheHealth {
    pub redis: bool,
    pub l1_entries: u64,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
