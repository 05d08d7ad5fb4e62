use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_type", rename_all = "lowercase")]
pub enum UserType {
    Client,
    Lawyer,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Client => "client",
            UserType::Lawyer => "lawyer",
            UserType::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account record shared by every role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub province_id: Option<String>,
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user together with the stored password hash; never serialized
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    pub client_id: String,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Taxonomy tag attached to lawyers and cases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    pub specialty_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Lawyer card as shown in discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawyerProfile {
    pub lawyer_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub province_id: Option<String>,
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub matches_count: i32,
    pub rating: f64,
    pub reviews: i32,
    pub hourly_rate: i32,
    pub years_of_experience: i32,
    #[serde(default)]
    pub specialties: Vec<Specialty>,
}

impl LawyerProfile {
    pub fn has_specialty(&self, specialty_id: &str) -> bool {
        self.specialties.iter().any(|s| s.specialty_id == specialty_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "case_status", rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    InProgress,
    Closed,
}

impl CaseStatus {
    /// Closed cases are terminal; every other move between distinct states is allowed
    pub fn can_transition_to(self, next: CaseStatus) -> bool {
        match (self, next) {
            (CaseStatus::Closed, _) => false,
            (current, next) => current != next,
        }
    }
}

/// Client-authored description of a legal need
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: Uuid,
    pub client_id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub hired_lawyer_id: Option<String>,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub specialties: Vec<Specialty>,
}

impl Case {
    pub fn specialty_ids(&self) -> Vec<String> {
        self.specialties.iter().map(|s| s.specialty_id.clone()).collect()
    }

    pub fn share_text(&self) -> String {
        format!("I'd like to discuss my case: \"{}\" - {}", self.title, self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn is_match(self) -> bool {
        matches!(self, SwipeDirection::Right)
    }
}

/// Recorded swipe; `matched` is true for right swipes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Swipe {
    pub swipe_id: Uuid,
    pub client_id: String,
    pub lawyer_id: String,
    pub matched: bool,
    pub created_at: DateTime<Utc>,
}

/// A right swipe, as listed to either party
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub match_id: Uuid,
    pub client_id: String,
    pub lawyer_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<Swipe> for Match {
    fn from(swipe: Swipe) -> Self {
        Self {
            match_id: swipe.swipe_id,
            client_id: swipe.client_id,
            lawyer_id: swipe.lawyer_id,
            created_at: swipe.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeStats {
    pub client_id: String,
    pub total: i64,
    pub matched: i64,
    pub passed: i64,
    pub last_swipe_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub conversation_id: Uuid,
    pub client_id: String,
    pub lawyer_id: String,
    #[serde(default)]
    pub match_id: Option<Uuid>,
    #[serde(default)]
    pub latest_message_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.client_id == user_id || self.lawyer_id == user_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterpart {
    pub user_id: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestMessage {
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

/// Inbox row: conversation plus what the caller needs to render it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub counterpart: Option<Counterpart>,
    pub latest_message: Option<LatestMessage>,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_read: bool,
}

/// Administrative level of a geographic code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoLevel {
    Prov,
    City,
    Mun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoCode {
    pub id: String,
    pub name: String,
    pub geo_level: GeoLevel,
}

/// Hard filters applied to discovery candidates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverFilters {
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub min_rate: Option<i32>,
    #[serde(default)]
    pub max_rate: Option<i32>,
    #[serde(default)]
    pub province_id: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
}

/// Per-component scores, each in 0..=1
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub specialty: f64,
    pub rating: f64,
    pub experience: f64,
    pub price: f64,
    pub popularity: f64,
}

/// Ranked discovery result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredLawyer {
    #[serde(flatten)]
    pub profile: LawyerProfile,
    pub match_score: f64,
    pub breakdown: ScoreBreakdown,
    pub shared_specialties: Vec<String>,
}

/// Scoring weights
#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub specialty: f64,
    pub rating: f64,
    pub experience: f64,
    pub price: f64,
    pub popularity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            specialty: 0.40,
            rating: 0.25,
            experience: 0.15,
            price: 0.10,
            popularity: 0.10,
        }
    }
}
