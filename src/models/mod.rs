// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Case, CaseStatus, ClientProfile, Conversation, ConversationSummary, Counterpart, DiscoverFilters, GeoCode,
    GeoLevel, LatestMessage, LawyerProfile, Match, Message, ScoreBreakdown, ScoredLawyer, ScoringWeights, Specialty,
    Swipe, SwipeDirection, SwipeStats, User, UserCredentials, UserType,
};
pub use requests::{
    CaseListQuery, CreateCaseRequest, CreateConversationRequest, DiscoverQuery, MarkReadRequest, MessagesQuery,
    SendMessageRequest, SetSpecialtiesRequest, ShareCaseRequest, SignInRequest, SignUpRequest, SwipeRequest,
    UpdateAccountRequest, UpdateCaseRequest, UpdateLawyerRequest,
};
pub use responses::{
    AccountResponse, AuthResponse, CacheHealth, ConversationStartedResponse, CountResponse, DiscoverResponse, ErrorResponse, HealthResponse,
    SwipeResponse, UndoSwipeResponse,
};
