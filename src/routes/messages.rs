use actix_web::{web, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    ConversationStartedResponse, CountResponse, CreateConversationRequest, MarkReadRequest, MessagesQuery, SendMessageRequest, UserType,
};
use crate::routes::error::require_non_blank;
use crate::routes::{ApiError, AppState, Identity};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/conversations", web::get().to(list_conversations))
        .route("/conversations", web::post().to(create_conversation))
        .route("/conversations/{conversation_id}", web::get().to(get_conversation))
        .route("/conversations/{conversation_id}/messages", web::get().to(list_messages))
        .route("/conversations/{conversation_id}/messages", web::post().to(send_message))
        .route("/messages/read", web::post().to(mark_read));
}

/// GET /api/v1/conversations
async fn list_conversations(state: web::Data<AppState>, identity: Identity) -> Result<HttpResponse, ApiError> {
    let conversations = state.postgres.list_conversations(&identity.user_id).await?;

    tracing::debug!("{} conversations for {}", conversations.len(), identity.user_id);

    Ok(HttpResponse::Ok().json(conversations))
}

/// POST /api/v1/conversations
///
/// Reuses the pair's conversation when one already exists.
async fn create_conversation(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<CreateConversationRequest>,
) -> Result<HttpResponse, ApiError> {
    identity.require(UserType::Client)?;
    req.validate()?;
    require_non_blank("initial_message", &req.initial_message)?;

    let (conversation, message) = state
        .postgres
        .start_conversation(&identity.user_id, &req.lawyer_id, req.initial_message.trim(), req.match_id)
        .await?;

    Ok(HttpResponse::Created().json(ConversationStartedResponse { conversation, message }))
}

/// GET /api/v1/conversations/{conversation_id}
async fn get_conversation(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let conversation = state
        .postgres
        .get_conversation_for(path.into_inner(), &identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(conversation))
}

/// GET /api/v1/conversations/{conversation_id}/messages
async fn list_messages(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, ApiError> {
    let conversation = state
        .postgres
        .get_conversation_for(path.into_inner(), &identity.user_id)
        .await?;

    let messages = state
        .postgres
        .list_messages(conversation.conversation_id, query.since)
        .await?;

    Ok(HttpResponse::Ok().json(messages))
}

/// POST /api/v1/conversations/{conversation_id}/messages
async fn send_message(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    req: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;
    require_non_blank("content", &req.content)?;

    let message = state
        .postgres
        .send_message(path.into_inner(), &identity.user_id, req.content.trim())
        .await?;

    Ok(HttpResponse::Created().json(message))
}

/// POST /api/v1/messages/read
async fn mark_read(
    state: web::Data<AppState>,
    identity: Identity,
    req: web::Json<MarkReadRequest>,
) -> Result<HttpResponse, ApiError> {
    let count = state.postgres.mark_read(&identity.user_id, &req.message_ids).await?;

    Ok(HttpResponse::Ok().json(CountResponse { count }))
}

#[cfg(test)]
mod tests {
    use crate::models::{CountResponse, UserType};
    use crate::routes::test_support::{bearer, state, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;

    #[actix_web::test]
    async fn test_blank_message_rejected() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::post()
            .uri(&format!("/api/v1/conversations/{}/messages", uuid::Uuid::new_v4()))
            .insert_header(bearer(&state, "client-1", UserType::Client))
            .set_json(serde_json::json!({"content": "   "}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_lawyers_cannot_open_conversations() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/conversations")
            .insert_header(bearer(&state, "lawyer-1", UserType::Lawyer))
            .set_json(serde_json::json!({"lawyer_id": "lawyer-2", "initial_message": "Hello"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_mark_read_with_no_ids_is_zero() {
        let state = state("http://127.0.0.1:1");
        let app = test_app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/v1/messages/read")
            .insert_header(bearer(&state, "client-1", UserType::Client))
            .set_json(serde_json::json!({"message_ids": []}))
            .to_request();
        let body: CountResponse = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.count, 0);
    }
}
