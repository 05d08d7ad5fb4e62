use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use uuid::Uuid;

use crate::models::{Case, CaseStatus, Specialty, UpdateCaseRequest};
use crate::services::lawyers::{dedup_ids, specialty_from_row};
use crate::services::postgres::{PostgresClient, PostgresError};

const CASE_COLUMNS: &str = "case_id, client_id, title, description, hired_lawyer_id, status, created_at, updated_at";

fn case_from_row(row: &PgRow) -> Result<Case, sqlx::Error> {
    Ok(Case {
        case_id: row.try_get("case_id")?,
        client_id: row.try_get("client_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        hired_lawyer_id: row.try_get("hired_lawyer_id")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        specialties: Vec::new(),
    })
}

/// Who may look at a case
pub fn can_view_case(case: &Case, user_id: &str) -> bool {
    case.client_id == user_id || case.hired_lawyer_id.as_deref() == Some(user_id)
}

/// Validate an update against the current case state
///
/// Only the owner may edit, and closed cases are frozen.
pub fn check_case_update(case: &Case, user_id: &str, changes: &UpdateCaseRequest) -> Result<(), PostgresError> {
    if case.client_id != user_id {
        return Err(PostgresError::Forbidden("only the case owner can modify it".to_string()));
    }

    if case.status == CaseStatus::Closed {
        return Err(PostgresError::Conflict("closed cases cannot be modified".to_string()));
    }

    if let Some(next) = changes.status {
        if next != case.status && !case.status.can_transition_to(next) {
            return Err(PostgresError::Conflict(format!(
                "cannot move case from {:?} to {:?}",
                case.status, next
            )));
        }
    }

    Ok(())
}

impl PostgresClient {
    pub async fn create_case(
        &self,
        client_id: &str,
        title: &str,
        description: &str,
        specialty_ids: &[String],
    ) -> Result<Case, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!(
            r#"
            INSERT INTO cases (case_id, client_id, title, description, status)
            VALUES ($1, $2, $3, $4, 'open')
            RETURNING {}
            "#,
            CASE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(client_id)
            .bind(title)
            .bind(description)
            .fetch_one(&mut *tx)
            .await?;

        let mut case = case_from_row(&row)?;

        Self::replace_case_specialties(&mut *tx, case.case_id, specialty_ids).await?;
        case.specialties = Self::case_specialties(&mut *tx, case.case_id).await?;

        tx.commit().await?;

        tracing::info!("Client {} opened case {}", client_id, case.case_id);

        Ok(case)
    }

    /// Cases a user owns or was hired on, newest first
    pub async fn list_cases(&self, user_id: &str, status: Option<CaseStatus>) -> Result<Vec<Case>, PostgresError> {
        let query = format!(
            r#"
            SELECT {} FROM cases
            WHERE (client_id = $1 OR hired_lawyer_id = $1)
              AND ($2::case_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            CASE_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        let mut cases = rows.iter().map(case_from_row).collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<Uuid> = cases.iter().map(|c| c.case_id).collect();
        let mut specialties = self.specialties_for_cases(&ids).await?;
        for case in &mut cases {
            if let Some(list) = specialties.remove(&case.case_id) {
                case.specialties = list;
            }
        }

        Ok(cases)
    }

    pub async fn get_case(&self, case_id: Uuid) -> Result<Case, PostgresError> {
        let query = format!("SELECT {} FROM cases WHERE case_id = $1", CASE_COLUMNS);

        let row = sqlx::query(&query)
            .bind(case_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("case {}", case_id)))?;

        let mut case = case_from_row(&row)?;
        let mut conn = self.pool.acquire().await?;
        case.specialties = Self::case_specialties(&mut *conn, case_id).await?;

        Ok(case)
    }

    /// Apply an owner's edit, locking the row for the duration
    ///
    /// Absent fields keep their value, so a hired lawyer can be replaced
    /// but never cleared.
    pub async fn update_case(
        &self,
        case_id: Uuid,
        user_id: &str,
        changes: &UpdateCaseRequest,
    ) -> Result<Case, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!("SELECT {} FROM cases WHERE case_id = $1 FOR UPDATE", CASE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(case_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("case {}", case_id)))?;

        let current = case_from_row(&row)?;
        check_case_update(&current, user_id, changes)?;

        if let Some(lawyer_id) = &changes.hired_lawyer_id {
            let hired = sqlx::query("SELECT 1 FROM lawyers WHERE lawyer_id = $1")
                .bind(lawyer_id)
                .fetch_optional(&mut *tx)
                .await?;
            if hired.is_none() {
                return Err(PostgresError::InvalidInput(format!("lawyer {} does not exist", lawyer_id)));
            }
        }

        let query = format!(
            r#"
            UPDATE cases SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                hired_lawyer_id = COALESCE($5, hired_lawyer_id),
                updated_at = NOW()
            WHERE case_id = $1
            RETURNING {}
            "#,
            CASE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(case_id)
            .bind(changes.title.as_deref().map(str::trim))
            .bind(changes.description.as_deref().map(str::trim))
            .bind(changes.status)
            .bind(&changes.hired_lawyer_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut case = case_from_row(&row)?;
        case.specialties = Self::case_specialties(&mut *tx, case_id).await?;

        tx.commit().await?;

        tracing::debug!("Updated case {} (status {:?})", case_id, case.status);

        Ok(case)
    }

    pub async fn set_case_specialties(
        &self,
        case_id: Uuid,
        user_id: &str,
        specialty_ids: &[String],
    ) -> Result<Case, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!("SELECT {} FROM cases WHERE case_id = $1 FOR UPDATE", CASE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(case_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("case {}", case_id)))?;

        let mut case = case_from_row(&row)?;
        check_case_update(&case, user_id, &UpdateCaseRequest::default())?;

        Self::replace_case_specialties(&mut *tx, case_id, specialty_ids).await?;

        sqlx::query("UPDATE cases SET updated_at = NOW() WHERE case_id = $1")
            .bind(case_id)
            .execute(&mut *tx)
            .await?;

        case.specialties = Self::case_specialties(&mut *tx, case_id).await?;

        tx.commit().await?;

        Ok(case)
    }

    async fn replace_case_specialties(
        conn: &mut PgConnection,
        case_id: Uuid,
        specialty_ids: &[String],
    ) -> Result<(), PostgresError> {
        let ids = dedup_ids(specialty_ids);
        Self::ensure_specialties_exist(&mut *conn, &ids).await?;

        sqlx::query("DELETE FROM case_categories WHERE case_id = $1")
            .bind(case_id)
            .execute(&mut *conn)
            .await?;

        if !ids.is_empty() {
            sqlx::query("INSERT INTO case_categories (case_id, specialty_id) SELECT $1, unnest($2::text[])")
                .bind(case_id)
                .bind(&ids)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    async fn case_specialties(conn: &mut PgConnection, case_id: Uuid) -> Result<Vec<Specialty>, PostgresError> {
        let rows = sqlx::query(
            r#"
            SELECT s.specialty_id, s.name, s.description
            FROM case_categories cc
            JOIN specialties s ON s.specialty_id = cc.specialty_id
            WHERE cc.case_id = $1
            ORDER BY s.name
            "#,
        )
        .bind(case_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.iter().map(specialty_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn specialties_for_cases(&self, case_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Specialty>>, PostgresError> {
        let mut by_case: HashMap<Uuid, Vec<Specialty>> = HashMap::new();
        if case_ids.is_empty() {
            return Ok(by_case);
        }

        let rows = sqlx::query(
            r#"
            SELECT cc.case_id, s.specialty_id, s.name, s.description
            FROM case_categories cc
            JOIN specialties s ON s.specialty_id = cc.specialty_id
            WHERE cc.case_id = ANY($1)
            ORDER BY s.name
            "#,
        )
        .bind(case_ids)
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let case_id: Uuid = row.try_get("case_id")?;
            by_case.entry(case_id).or_default().push(specialty_from_row(row)?);
        }

        Ok(by_case)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_case(status: CaseStatus) -> Case {
        let now = Utc::now();
        Case {
            case_id: Uuid::new_v4(),
            client_id: "client-1".to_string(),
            title: "Custody".to_string(),
            description: "Shared custody arrangement".to_string(),
            hired_lawyer_id: Some("lawyer-1".to_string()),
            status,
            created_at: now,
            updated_at: now,
            specialties: Vec::new(),
        }
    }

    #[test]
    fn test_case_visibility() {
        let case = sample_case(CaseStatus::Open);
        assert!(can_view_case(&case, "client-1"));
        assert!(can_view_case(&case, "lawyer-1"));
        assert!(!can_view_case(&case, "lawyer-2"));
    }

    #[test]
    fn test_only_owner_updates() {
        let case = sample_case(CaseStatus::Open);
        let err = check_case_update(&case, "lawyer-1", &UpdateCaseRequest::default()).unwrap_err();
        assert!(matches!(err, PostgresError::Forbidden(_)));
    }

    #[test]
    fn test_closed_case_is_frozen() {
        let case = sample_case(CaseStatus::Closed);
        let changes = UpdateCaseRequest {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let err = check_case_update(&case, "client-1", &changes).unwrap_err();
        assert!(matches!(err, PostgresError::Conflict(_)));
    }

    #[test]
    fn test_status_change_allowed() {
        let case = sample_case(CaseStatus::Open);
        let changes = UpdateCaseRequest {
            status: Some(CaseStatus::InProgress),
            ..Default::default()
        };
        assert!(check_case_update(&case, "client-1", &changes).is_ok());
    }
}
