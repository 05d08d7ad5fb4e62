use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::models::{ClientProfile, UpdateAccountRequest, User, UserCredentials, UserType};
use crate::services::postgres::{PostgresClient, PostgresError};

const USER_COLUMNS: &str = r#"
    user_id, email, user_type, first_name, last_name, phone_number, profile_picture_url,
    province_id, province_name, city_id, city_name, created_at, updated_at
"#;

/// Everything needed to register an account of any role
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
    pub province_id: Option<String>,
    pub province_name: Option<String>,
    pub city_id: Option<String>,
    pub city_name: Option<String>,
    pub bio: Option<String>,
    pub hourly_rate: i32,
    pub years_of_experience: i32,
    pub specialties: Vec<String>,
}

pub(crate) fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        user_id: row.try_get("user_id")?,
        email: row.try_get("email")?,
        user_type: row.try_get("user_type")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        phone_number: row.try_get("phone_number")?,
        profile_picture_url: row.try_get("profile_picture_url")?,
        province_id: row.try_get("province_id")?,
        province_name: row.try_get("province_name")?,
        city_id: row.try_get("city_id")?,
        city_name: row.try_get("city_name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl PostgresClient {
    /// Register a user and its role row in one transaction
    ///
    /// Lawyers start with zero matches, rating and reviews. Unknown specialty
    /// ids reject the whole registration.
    pub async fn create_account(&self, account: NewAccount) -> Result<User, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!(
            r#"
            INSERT INTO users (
                user_id, email, password_hash, user_type, first_name, last_name, phone_number,
                profile_picture_url, province_id, province_name, city_id, city_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&account.user_id)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(account.user_type)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(&account.phone_number)
            .bind(&account.profile_picture_url)
            .bind(&account.province_id)
            .bind(&account.province_name)
            .bind(&account.city_id)
            .bind(&account.city_name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PostgresError::conflict_on_unique(e, "an account with this email already exists"))?;

        let user = user_from_row(&row)?;

        match account.user_type {
            UserType::Client => {
                sqlx::query("INSERT INTO clients (client_id, bio) VALUES ($1, $2)")
                    .bind(&account.user_id)
                    .bind(&account.bio)
                    .execute(&mut *tx)
                    .await?;
            }
            UserType::Lawyer => {
                sqlx::query(
                    r#"
                    INSERT INTO lawyers (lawyer_id, bio, matches_count, rating, reviews, hourly_rate, years_of_experience)
                    VALUES ($1, $2, 0, 0, 0, $3, $4)
                    "#,
                )
                .bind(&account.user_id)
                .bind(&account.bio)
                .bind(account.hourly_rate)
                .bind(account.years_of_experience)
                .execute(&mut *tx)
                .await?;

                Self::replace_lawyer_specialties(&mut *tx, &account.user_id, &account.specialties).await?;
            }
            UserType::Admin => {}
        }

        tx.commit().await?;

        tracing::info!("Registered {} account {}", user.user_type, user.user_id);

        Ok(user)
    }

    /// Look up a user and password hash by email (case-insensitive)
    pub async fn get_credentials_by_email(&self, email: &str) -> Result<Option<UserCredentials>, PostgresError> {
        let query = format!(
            "SELECT {}, password_hash FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );

        let row = sqlx::query(&query).bind(email).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(UserCredentials {
                user: user_from_row(&row)?,
                password_hash: row.try_get("password_hash")?,
            })),
            None => Ok(None),
        }
    }

    pub async fn get_user(&self, user_id: &str) -> Result<User, PostgresError> {
        let query = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("user {}", user_id)))?;

        Ok(user_from_row(&row)?)
    }

    pub async fn get_client_profile(&self, client_id: &str) -> Result<Option<ClientProfile>, PostgresError> {
        let row = sqlx::query("SELECT client_id, bio FROM clients WHERE client_id = $1")
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(row) => Some(ClientProfile {
                client_id: row.try_get("client_id")?,
                bio: row.try_get("bio")?,
            }),
            None => None,
        })
    }

    /// Apply a partial account update; `None` fields keep their stored value
    pub async fn update_account(
        &self,
        user_id: &str,
        changes: &UpdateAccountRequest,
    ) -> Result<User, PostgresError> {
        let mut tx = self.begin().await?;

        let query = format!(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                phone_number = COALESCE($4, phone_number),
                profile_picture_url = COALESCE($5, profile_picture_url),
                province_id = COALESCE($6, province_id),
                province_name = COALESCE($7, province_name),
                city_id = COALESCE($8, city_id),
                city_name = COALESCE($9, city_name),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(&changes.first_name)
            .bind(&changes.last_name)
            .bind(&changes.phone_number)
            .bind(&changes.profile_picture_url)
            .bind(&changes.province_id)
            .bind(&changes.province_name)
            .bind(&changes.city_id)
            .bind(&changes.city_name)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| PostgresError::NotFound(format!("user {}", user_id)))?;

        let user = user_from_row(&row)?;

        if let Some(bio) = &changes.bio {
            match user.user_type {
                UserType::Client => {
                    sqlx::query("UPDATE clients SET bio = $2, updated_at = NOW() WHERE client_id = $1")
                        .bind(user_id)
                        .bind(bio)
                        .execute(&mut *tx)
                        .await?;
                }
                UserType::Lawyer => {
                    sqlx::query("UPDATE lawyers SET bio = $2, updated_at = NOW() WHERE lawyer_id = $1")
                        .bind(user_id)
                        .bind(bio)
                        .execute(&mut *tx)
                        .await?;
                }
                UserType::Admin => {}
            }
        }

        tx.commit().await?;

        tracing::debug!("Updated account {}", user_id);

        Ok(user)
    }
}
