use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};

use crate::models::{DiscoverFilters, LawyerProfile, Specialty, UpdateLawyerRequest};
use crate::services::postgres::{PostgresClient, PostgresError};

const LAWYER_SELECT: &str = r#"
    SELECT
        l.lawyer_id, u.email, u.first_name, u.last_name, u.profile_picture_url,
        u.province_id, u.province_name, u.city_id, u.city_name,
        l.bio, l.matches_count, l.rating, l.reviews, l.hourly_rate, l.years_of_experience
    FROM lawyers l
    JOIN users u ON u.user_id = l.lawyer_id
"#;

fn lawyer_from_row(row: &PgRow) -> Result<LawyerProfile, sqlx::Error> {
    Ok(LawyerProfile {
        lawyer_id: row.try_get("lawyer_id")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        profile_picture_url: row.try_get("profile_picture_url")?,
        province_id: row.try_get("province_id")?,
        province_name: row.try_get("province_name")?,
        city_id: row.try_get("city_id")?,
        city_name: row.try_get("city_name")?,
        bio: row.try_get("bio")?,
        matches_count: row.try_get("matches_count")?,
        rating: row.try_get("rating")?,
        reviews: row.try_get("reviews")?,
        hourly_rate: row.try_get("hourly_rate")?,
        years_of_experience: row.try_get("years_of_experience")?,
        specialties: Vec::new(),
    })
}

pub(crate) fn specialty_from_row(row: &PgRow) -> Result<Specialty, sqlx::Error> {
    Ok(Specialty {
        specialty_id: row.try_get("specialty_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
    })
}

/// Drop duplicates while keeping first-seen order
pub(crate) fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

impl PostgresClient {
    /// Discovery candidate pool
    ///
    /// Location and rate filters are pushed into SQL; specialty matching is
    /// "any of" and only applied when the filter is non-empty.
    pub async fn list_lawyers(&self, filters: &DiscoverFilters) -> Result<Vec<LawyerProfile>, PostgresError> {
        let query = format!(
            r#"
            {}
            WHERE ($1::text IS NULL OR u.province_id = $1)
              AND ($2::text IS NULL OR u.city_id = $2)
              AND ($3::int IS NULL OR l.hourly_rate >= $3)
              AND ($4::int IS NULL OR l.hourly_rate <= $4)
              AND (
                cardinality($5::text[]) = 0
                OR EXISTS (
                    SELECT 1 FROM lawyer_specialties ls
                    WHERE ls.lawyer_id = l.lawyer_id AND ls.specialty_id = ANY($5)
                )
              )
            "#,
            LAWYER_SELECT
        );

        let rows = sqlx::query(&query)
            .bind(&filters.province_id)
            .bind(&filters.city_id)
            .bind(filters.min_rate)
            .bind(filters.max_rate)
            .bind(&filters.specialties)
            .fetch_all(&self.pool)
            .await?;

        let lawyers = rows.iter().map(lawyer_from_row).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} discovery candidates", lawyers.len());

        self.attach_specialties(lawyers).await
    }

    pub async fn get_lawyer(&self, lawyer_id: &str) -> Result<LawyerProfile, PostgresError> {
        let query = format!("{} WHERE l.lawyer_id = $1", LAWYER_SELECT);

        let row = sqlx::query(&query)
            .bind(lawyer_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("lawyer {}", lawyer_id)))?;

        let lawyer = lawyer_from_row(&row)?;
        let mut lawyers = self.attach_specialties(vec![lawyer]).await?;

        lawyers
            .pop()
            .ok_or_else(|| PostgresError::NotFound(format!("lawyer {}", lawyer_id)))
    }

    pub async fn update_lawyer(
        &self,
        lawyer_id: &str,
        changes: &UpdateLawyerRequest,
    ) -> Result<LawyerProfile, PostgresError> {
        let result = sqlx::query(
            r#"
            UPDATE lawyers SET
                bio = COALESCE($2, bio),
                hourly_rate = COALESCE($3, hourly_rate),
                years_of_experience = COALESCE($4, years_of_experience),
                updated_at = NOW()
            WHERE lawyer_id = $1
            "#,
        )
        .bind(lawyer_id)
        .bind(&changes.bio)
        .bind(changes.hourly_rate)
        .bind(changes.years_of_experience)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PostgresError::NotFound(format!("lawyer {}", lawyer_id)));
        }

        self.get_lawyer(lawyer_id).await
    }

    /// Replace a lawyer's specialty set
    pub async fn set_lawyer_specialties(
        &self,
        lawyer_id: &str,
        specialty_ids: &[String],
    ) -> Result<LawyerProfile, PostgresError> {
        let mut tx = self.begin().await?;

        let exists = sqlx::query("SELECT 1 FROM lawyers WHERE lawyer_id = $1 FOR UPDATE")
            .bind(lawyer_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(PostgresError::NotFound(format!("lawyer {}", lawyer_id)));
        }

        Self::replace_lawyer_specialties(&mut *tx, lawyer_id, specialty_ids).await?;

        tx.commit().await?;

        self.get_lawyer(lawyer_id).await
    }

    pub(crate) async fn replace_lawyer_specialties(
        conn: &mut PgConnection,
        lawyer_id: &str,
        specialty_ids: &[String],
    ) -> Result<(), PostgresError> {
        let ids = dedup_ids(specialty_ids);
        Self::ensure_specialties_exist(&mut *conn, &ids).await?;

        sqlx::query("DELETE FROM lawyer_specialties WHERE lawyer_id = $1")
            .bind(lawyer_id)
            .execute(&mut *conn)
            .await?;

        if !ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO lawyer_specialties (lawyer_id, specialty_id)
                SELECT $1, unnest($2::text[])
                "#,
            )
            .bind(lawyer_id)
            .bind(&ids)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Reject unknown specialty ids with `InvalidInput`
    pub(crate) async fn ensure_specialties_exist(
        conn: &mut PgConnection,
        specialty_ids: &[String],
    ) -> Result<(), PostgresError> {
        if specialty_ids.is_empty() {
            return Ok(());
        }

        let rows = sqlx::query("SELECT specialty_id FROM specialties WHERE specialty_id = ANY($1)")
            .bind(specialty_ids)
            .fetch_all(&mut *conn)
            .await?;

        let known: Vec<String> = rows
            .iter()
            .map(|row| row.try_get::<String, _>("specialty_id"))
            .collect::<Result<_, _>>()?;

        let unknown: Vec<&str> = specialty_ids
            .iter()
            .filter(|id| !known.contains(id))
            .map(String::as_str)
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(PostgresError::InvalidInput(format!(
                "unknown specialties: {}",
                unknown.join(", ")
            )))
        }
    }

    pub async fn list_specialties(&self) -> Result<Vec<Specialty>, PostgresError> {
        let rows = sqlx::query("SELECT specialty_id, name, description FROM specialties ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(specialty_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn attach_specialties(&self, mut lawyers: Vec<LawyerProfile>) -> Result<Vec<LawyerProfile>, PostgresError> {
        if lawyers.is_empty() {
            return Ok(lawyers);
        }

        let ids: Vec<String> = lawyers.iter().map(|l| l.lawyer_id.clone()).collect();

        let rows = sqlx::query(
            r#"
            SELECT ls.lawyer_id, s.specialty_id, s.name, s.description
            FROM lawyer_specialties ls
            JOIN specialties s ON s.specialty_id = ls.specialty_id
            WHERE ls.lawyer_id = ANY($1)
            ORDER BY s.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_lawyer: HashMap<String, Vec<Specialty>> = HashMap::new();
        for row in &rows {
            let lawyer_id: String = row.try_get("lawyer_id")?;
            by_lawyer.entry(lawyer_id).or_default().push(specialty_from_row(row)?);
        }

        for lawyer in &mut lawyers {
            if let Some(specialties) = by_lawyer.remove(&lawyer.lawyer_id) {
                lawyer.specialties = specialties;
            }
        }

        Ok(lawyers)
    }
}
