use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::plan::Plan;

/// Full user record, only loaded where the password hash is needed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub plan: Plan,
    pub sermons_this_month: i32,
    pub last_reset_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Safe projection used by the session resolver; never selects the hash.
#[derive(Debug, Clone, FromRow)]
pub struct AuthUserRow {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: Plan,
    pub sermons_this_month: i32,
    pub last_reset_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, plan, sermons_this_month,
                   last_reset_date, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user; registration always starts on the free plan.
    pub async fn create(
        db: &PgPool,
        email: &str,
        full_name: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, password_hash, full_name, plan, sermons_this_month,
                      last_reset_date, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(full_name)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Consume one generation from the monthly allowance (free tier only;
    /// callers check the plan).
    pub async fn increment_monthly_count(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET sermons_this_month = sermons_this_month + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Zero the monthly counter and advance the reset marker.
    pub async fn reset_monthly_count(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET sermons_this_month = 0, last_reset_date = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }
}

impl AuthUserRow {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<AuthUserRow>> {
        sqlx::query_as::<_, AuthUserRow>(
            r#"
            SELECT id, email, full_name, plan, sermons_this_month,
                   last_reset_date, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }
}
