use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::domain::{CaseStatus, SwipeDirection, UserType};

/// Registration payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub user_type: UserType,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 32))]
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
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub hourly_rate: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, max = 80))]
    pub years_of_experience: Option<i32>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub admin_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Partial account update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
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
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateLawyerRequest {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub hourly_rate: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0, max = 80))]
    pub years_of_experience: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSpecialtiesRequest {
    pub specialties: Vec<String>,
}

/// Query string of the discover endpoint
///
/// `specialties` is a comma-separated list of specialty ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverQuery {
    #[serde(default)]
    pub specialties: Option<String>,
    #[serde(default)]
    pub min_rate: Option<i32>,
    #[serde(default)]
    pub max_rate: Option<i32>,
    #[serde(default)]
    pub province_id: Option<String>,
    #[serde(default)]
    pub city_id: Option<String>,
    #[serde(default)]
    pub case_id: Option<Uuid>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub limit: Option<u16>,
}

impl DiscoverQuery {
    pub fn specialty_ids(&self) -> Vec<String> {
        self.specialties
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[validate(length(min = 1))]
    pub lawyer_id: String,
    pub direction: SwipeDirection,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCaseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    #[serde(default)]
    pub specialties: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCaseRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 5000))]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<CaseStatus>,
    /// Replaces the hire; there is no way to clear it
    #[serde(default)]
    pub hired_lawyer_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseListQuery {
    #[serde(default)]
    pub status: Option<CaseStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareCaseRequest {
    pub conversation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[validate(length(min = 1))]
    pub lawyer_id: String,
    #[validate(length(min = 1, max = 5000))]
    pub initial_message: String,
    #[serde(default)]
    pub match_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub since: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    pub message_ids: Vec<Uuid>,
}
