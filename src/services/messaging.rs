use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::models::{Conversation, ConversationSummary, Counterpart, LatestMessage, Message, UserType};
use crate::services::postgres::{PostgresClient, PostgresError};

const CONVERSATION_COLUMNS: &str =
    "conversation_id, client_id, lawyer_id, match_id, latest_message_id, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "message_id, conversation_id, sender_id, content, timestamp, is_read";

fn conversation_from_row(row: &PgRow) -> Result<Conversation, sqlx::Error> {
    Ok(Conversation {
        conversation_id: row.try_get("conversation_id")?,
        client_id: row.try_get("client_id")?,
        lawyer_id: row.try_get("lawyer_id")?,
        match_id: row.try_get("match_id")?,
        latest_message_id: row.try_get("latest_message_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<Message, sqlx::Error> {
    Ok(Message {
        message_id: row.try_get("message_id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
        is_read: row.try_get("is_read")?,
    })
}

fn summary_from_row(row: &PgRow) -> Result<ConversationSummary, sqlx::Error> {
    let counterpart = match row.try_get::<Option<String>, _>("cp_user_id")? {
        Some(user_id) => Some(Counterpart {
            user_id,
            user_type: row.try_get::<UserType, _>("cp_user_type")?,
            first_name: row.try_get("cp_first_name")?,
            last_name: row.try_get("cp_last_name")?,
            profile_picture_url: row.try_get("cp_profile_picture_url")?,
        }),
        None => None,
    };

    let latest_message = match row.try_get::<Option<String>, _>("lm_content")? {
        Some(content) => Some(LatestMessage {
            content,
            timestamp: row.try_get("lm_timestamp")?,
            is_read: row.try_get("lm_is_read")?,
        }),
        None => None,
    };

    Ok(ConversationSummary {
        conversation: conversation_from_row(row)?,
        counterpart,
        latest_message,
        unread_count: row.try_get("unread_count")?,
    })
}

impl PostgresClient {
    pub async fn get_conversation(&self, conversation_id: Uuid) -> Result<Conversation, PostgresError> {
        let query = format!("SELECT {} FROM conversations WHERE conversation_id = $1", CONVERSATION_COLUMNS);

        let row = sqlx::query(&query)
            .bind(conversation_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("conversation {}", conversation_id)))?;

        Ok(conversation_from_row(&row)?)
    }

    /// Load a conversation the caller takes part in
    pub async fn get_conversation_for(
        &self,
        conversation_id: Uuid,
        user_id: &str,
    ) -> Result<Conversation, PostgresError> {
        let conversation = self.get_conversation(conversation_id).await?;

        if !conversation.has_participant(user_id) {
            return Err(PostgresError::Forbidden(format!(
                "not a participant of conversation {}",
                conversation_id
            )));
        }

        Ok(conversation)
    }

    /// Inbox for a user of either role, most recently active first
    pub async fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationSummary>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT
                c.conversation_id, c.client_id, c.lawyer_id, c.match_id, c.latest_message_id,
                c.created_at, c.updated_at,
                cp.user_id AS cp_user_id,
                cp.user_type AS cp_user_type,
                cp.first_name AS cp_first_name,
                cp.last_name AS cp_last_name,
                cp.profile_picture_url AS cp_profile_picture_url,
                lm.content AS lm_content,
                lm.timestamp AS lm_timestamp,
                lm.is_read AS lm_is_read,
                (
                    SELECT COUNT(*) FROM messages um
                    WHERE um.conversation_id = c.conversation_id
                      AND um.sender_id <> $1
                      AND NOT um.is_read
                ) AS unread_count
            FROM conversations c
            LEFT JOIN users cp
                ON cp.user_id = CASE WHEN c.client_id = $1 THEN c.lawyer_id ELSE c.client_id END
            LEFT JOIN messages lm ON lm.message_id = c.latest_message_id
            WHERE c.client_id = $1 OR c.lawyer_id = $1
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(summary_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Open (or reuse) the client/lawyer conversation and post the first message
    pub async fn start_conversation(
        &self,
        client_id: &str,
        lawyer_id: &str,
        initial_message: &str,
        match_id: Option<Uuid>,
    ) -> Result<(Conversation, Message), PostgresError> {
        let mut tx = self.begin().await?;

        let lawyer = sqlx::query("SELECT 1 FROM lawyers WHERE lawyer_id = $1")
            .bind(lawyer_id)
            .fetch_optional(&mut *tx)
            .await?;
        if lawyer.is_none() {
            return Err(PostgresError::NotFound(format!("lawyer {}", lawyer_id)));
        }

        if let Some(match_id) = match_id {
            let linked = sqlx::query(
                "SELECT 1 FROM swipes WHERE swipe_id = $1 AND client_id = $2 AND lawyer_id = $3 AND matched",
            )
            .bind(match_id)
            .bind(client_id)
            .bind(lawyer_id)
            .fetch_optional(&mut *tx)
            .await?;
            if linked.is_none() {
                return Err(PostgresError::InvalidInput(format!(
                    "match {} does not belong to this client and lawyer",
                    match_id
                )));
            }
        }

        let query = format!(
            r#"
            INSERT INTO conversations (conversation_id, client_id, lawyer_id, match_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (client_id, lawyer_id) DO UPDATE
                SET match_id = COALESCE(conversations.match_id, EXCLUDED.match_id)
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(client_id)
            .bind(lawyer_id)
            .bind(match_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut conversation = conversation_from_row(&row)?;
        let message = Self::insert_message(&mut *tx, conversation.conversation_id, client_id, initial_message).await?;

        tx.commit().await?;

        conversation.latest_message_id = Some(message.message_id);
        conversation.updated_at = message.timestamp;

        tracing::info!(
            "Conversation {} started between client {} and lawyer {}",
            conversation.conversation_id,
            client_id,
            lawyer_id
        );

        Ok((conversation, message))
    }

    /// Post a message as a participant of the conversation
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!(
            "SELECT {} FROM conversations WHERE conversation_id = $1 FOR UPDATE",
            CONVERSATION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(conversation_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("conversation {}", conversation_id)))?;

        let conversation = conversation_from_row(&row)?;
        if !conversation.has_participant(sender_id) {
            return Err(PostgresError::Forbidden(format!(
                "not a participant of conversation {}",
                conversation_id
            )));
        }

        let message = Self::insert_message(&mut *tx, conversation_id, sender_id, content).await?;

        tx.commit().await?;

        tracing::debug!("Message {} posted to conversation {}", message.message_id, conversation_id);

        Ok(message)
    }

    /// Messages oldest first; `since` keeps only strictly newer ones
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Message>, PostgresError> {
        let query = format!(
            r#"
            SELECT {} FROM messages
            WHERE conversation_id = $1 AND ($2::timestamptz IS NULL OR timestamp > $2)
            ORDER BY timestamp ASC, message_id ASC
            "#,
            MESSAGE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(conversation_id)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(message_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Mark messages read on behalf of `reader_id`
    ///
    /// Only messages addressed to the reader count: they must sit in one of
    /// the reader's conversations and have been sent by someone else.
    pub async fn mark_read(&self, reader_id: &str, message_ids: &[Uuid]) -> Result<u64, PostgresError> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE messages m SET is_read = TRUE
            FROM conversations c
            WHERE m.conversation_id = c.conversation_id
              AND m.message_id = ANY($2)
              AND m.sender_id <> $1
              AND NOT m.is_read
              AND (c.client_id = $1 OR c.lawyer_id = $1)
            "#,
        )
        .bind(reader_id)
        .bind(message_ids)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Callers must hold the conversation row lock. The timestamp is read
    /// after the lock, so within a conversation it follows commit order and
    /// `since` polling never skips a message.
    async fn insert_message(
        conn: &mut PgConnection,
        conversation_id: Uuid,
        sender_id: &str,
        content: &str,
    ) -> Result<Message, PostgresError> {
        let query = format!(
            r#"
            INSERT INTO messages (message_id, conversation_id, sender_id, content, timestamp, is_read)
            VALUES ($1, $2, $3, $4, clock_timestamp(), FALSE)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(conversation_id)
            .bind(sender_id)
            .bind(content)
            .fetch_one(&mut *conn)
            .await?;

        let message = message_from_row(&row)?;

        sqlx::query(
            "UPDATE conversations SET latest_message_id = $2, updated_at = $3 WHERE conversation_id = $1",
        )
        .bind(conversation_id)
        .bind(message.message_id)
        .bind(message.timestamp)
        .execute(&mut *conn)
        .await?;

        Ok(message)
    }
}
