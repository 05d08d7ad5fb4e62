use std::collections::HashSet;

use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::models::{Match, Swipe, SwipeDirection, SwipeStats};
use crate::services::postgres::{PostgresClient, PostgresError};

const SWIPE_COLUMNS: &str = "swipe_id, client_id, lawyer_id, matched, created_at";

fn swipe_from_row(row: &PgRow) -> Result<Swipe, sqlx::Error> {
    Ok(Swipe {
        swipe_id: row.try_get("swipe_id")?,
        client_id: row.try_get("client_id")?,
        lawyer_id: row.try_get("lawyer_id")?,
        matched: row.try_get("matched")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Outcome of recording a swipe
#[derive(Debug, Clone)]
pub struct RecordedSwipe {
    pub swipe: Swipe,
    /// Set for right swipes: the conversation opened (or reused) for the pair
    pub conversation_id: Option<Uuid>,
}

/// Outcome of undoing the latest swipe
#[derive(Debug, Clone)]
pub struct UndoneSwipe {
    pub swipe: Swipe,
    pub conversation_removed: bool,
}

impl PostgresClient {
    /// Every lawyer the client has swiped on, in either direction
    pub async fn swiped_lawyer_ids(&self, client_id: &str) -> Result<HashSet<String>, PostgresError> {
        let rows = sqlx::query("SELECT lawyer_id FROM swipes WHERE client_id = $1")
            .bind(client_id)
            .fetch_all(&self.pool)
            .await?;

        let mut ids = HashSet::with_capacity(rows.len());
        for row in &rows {
            ids.insert(row.try_get::<String, _>("lawyer_id")?);
        }

        Ok(ids)
    }

    /// Record a swipe
    ///
    /// A right swipe also bumps the lawyer's match counter and opens the
    /// pair's conversation, all in one transaction. An existing conversation
    /// between the pair is reused and linked to the match if it had none.
    pub async fn record_swipe(
        &self,
        client_id: &str,
        lawyer_id: &str,
        direction: SwipeDirection,
    ) -> Result<RecordedSwipe, PostgresError> {
        let mut tx = self.begin().await?;

        let lawyer = sqlx::query("SELECT 1 FROM lawyers WHERE lawyer_id = $1")
            .bind(lawyer_id)
            .fetch_optional(&mut *tx)
            .await?;
        if lawyer.is_none() {
            return Err(PostgresError::NotFound(format!("lawyer {}", lawyer_id)));
        }

        let query = format!(
            r#"
            INSERT INTO swipes (swipe_id, client_id, lawyer_id, matched)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SWIPE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(client_id)
            .bind(lawyer_id)
            .bind(direction.is_match())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PostgresError::conflict_on_unique(e, format!("already swiped on lawyer {}", lawyer_id)))?;

        let swipe = swipe_from_row(&row)?;
        let mut conversation_id = None;

        if swipe.matched {
            sqlx::query("UPDATE lawyers SET matches_count = matches_count + 1, updated_at = NOW() WHERE lawyer_id = $1")
                .bind(lawyer_id)
                .execute(&mut *tx)
                .await?;

            let row = sqlx::query(
                r#"
                INSERT INTO conversations (conversation_id, client_id, lawyer_id, match_id)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (client_id, lawyer_id) DO UPDATE
                    SET match_id = COALESCE(conversations.match_id, EXCLUDED.match_id)
                RETURNING conversation_id
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(client_id)
            .bind(lawyer_id)
            .bind(swipe.swipe_id)
            .fetch_one(&mut *tx)
            .await?;

            conversation_id = Some(row.try_get("conversation_id")?);
        }

        tx.commit().await?;

        tracing::info!(
            "Client {} swiped {:?} on lawyer {}",
            client_id,
            direction,
            lawyer_id
        );

        Ok(RecordedSwipe { swipe, conversation_id })
    }

    /// Revert the client's most recent swipe
    ///
    /// For a match, the conversation it opened is removed only while it is
    /// still empty, and the lawyer's counter is decremented (floored at zero).
    pub async fn undo_last_swipe(&self, client_id: &str) -> Result<UndoneSwipe, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!(
            r#"
            SELECT {} FROM swipes
            WHERE client_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
            SWIPE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PostgresError::NotFound("no swipe to undo".to_string()))?;

        let swipe = swipe_from_row(&row)?;
        let mut conversation_removed = false;

        if swipe.matched {
            // Must run before the swipe delete, which nulls match_id
            let removed = sqlx::query(
                r#"
                DELETE FROM conversations c
                WHERE c.match_id = $1
                  AND NOT EXISTS (SELECT 1 FROM messages m WHERE m.conversation_id = c.conversation_id)
                "#,
            )
            .bind(swipe.swipe_id)
            .execute(&mut *tx)
            .await?;
            conversation_removed = removed.rows_affected() > 0;

            sqlx::query(
                "UPDATE lawyers SET matches_count = GREATEST(matches_count - 1, 0), updated_at = NOW() WHERE lawyer_id = $1",
            )
            .bind(&swipe.lawyer_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM swipes WHERE swipe_id = $1")
            .bind(swipe.swipe_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Client {} undid swipe on lawyer {}", client_id, swipe.lawyer_id);

        Ok(UndoneSwipe {
            swipe,
            conversation_removed,
        })
    }

    /// Forget passed lawyers so they show up in discovery again; matches stay
    pub async fn reset_passed_swipes(&self, client_id: &str) -> Result<u64, PostgresError> {
        let result = sqlx::query("DELETE FROM swipes WHERE client_id = $1 AND NOT matched")
            .bind(client_id)
            .execute(&self.pool)
            .await?;

        tracing::info!("Reset {} passed swipes for client {}", result.rows_affected(), client_id);

        Ok(result.rows_affected())
    }

    pub async fn swipe_stats(&self, client_id: &str) -> Result<SwipeStats, PostgresError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE matched) AS matched,
                COUNT(*) FILTER (WHERE NOT matched) AS passed,
                MAX(created_at) AS last_swipe_at
            FROM swipes
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(SwipeStats {
            client_id: client_id.to_string(),
            total: row.try_get("total")?,
            matched: row.try_get("matched")?,
            passed: row.try_get("passed")?,
            last_swipe_at: row.try_get("last_swipe_at")?,
        })
    }

    /// Matches as seen by a client, newest first
    pub async fn list_matches_for_client(&self, client_id: &str) -> Result<Vec<Match>, PostgresError> {
        let query = format!(
            "SELECT {} FROM swipes WHERE client_id = $1 AND matched ORDER BY created_at DESC",
            SWIPE_COLUMNS
        );
        self.fetch_matches(&query, client_id).await
    }

    /// Matches as seen by a lawyer, newest first
    pub async fn list_matches_for_lawyer(&self, lawyer_id: &str) -> Result<Vec<Match>, PostgresError> {
        let query = format!(
            "SELECT {} FROM swipes WHERE lawyer_id = $1 AND matched ORDER BY created_at DESC",
            SWIPE_COLUMNS
        );
        self.fetch_matches(&query, lawyer_id).await
    }

    async fn fetch_matches(&self, query: &str, user_id: &str) -> Result<Vec<Match>, PostgresError> {
        let rows = sqlx::query(query).bind(user_id).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| swipe_from_row(row).map(Match::from).map_err(PostgresError::from))
            .collect()
    }
}
