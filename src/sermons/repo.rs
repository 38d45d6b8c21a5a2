use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::sermons::dto::{NewMainPoint, UpdateSermonRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "service_type", rename_all = "snake_case")]
pub enum ServiceType {
    Missoes,
    Ensino,
    Adoracao,
    Avivamento,
    SantaCeia,
    AcaoDeGracas,
    Juventude,
    Familia,
    Evangelismo,
    Oracao,
}

impl ServiceType {
    /// Display label used in generation prompts.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Missoes => "Missões",
            ServiceType::Ensino => "Ensino",
            ServiceType::Adoracao => "Adoração",
            ServiceType::Avivamento => "Avivamento",
            ServiceType::SantaCeia => "Santa Ceia",
            ServiceType::AcaoDeGracas => "Ação de Graças",
            ServiceType::Juventude => "Juventude",
            ServiceType::Familia => "Família",
            ServiceType::Evangelismo => "Evangelismo",
            ServiceType::Oracao => "Oração",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Sermon {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_type: ServiceType,
    pub theme: String,
    pub title: String,
    pub key_verse: Option<String>,
    pub introduction: Option<String>,
    pub conclusion: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MainPoint {
    pub id: Uuid,
    pub sermon_id: Uuid,
    pub title: String,
    pub explanation: String,
    pub scripture_references: Vec<String>,
    pub point_order: i32,
}

const SERMON_COLUMNS: &str = "id, user_id, service_type, theme, title, key_verse, introduction, \
                              conclusion, notes, is_favorite, created_at, updated_at";

impl Sermon {
    /// Caller's sermons, newest first.
    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> sqlx::Result<Vec<Sermon>> {
        let rows = sqlx::query_as::<_, Sermon>(&format!(
            "SELECT {SERMON_COLUMNS} FROM sermons WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Ownership check: a row comes back only when it belongs to the caller.
    pub async fn find_owned(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> sqlx::Result<Option<Sermon>> {
        let row = sqlx::query_as::<_, Sermon>(&format!(
            "SELECT {SERMON_COLUMNS} FROM sermons WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Insert a sermon together with its ordered main points, atomically.
    pub async fn create_with_points(
        db: &PgPool,
        user_id: Uuid,
        service_type: ServiceType,
        theme: &str,
        title: &str,
        key_verse: Option<&str>,
        introduction: Option<&str>,
        conclusion: Option<&str>,
        notes: Option<&str>,
        points: &[NewMainPoint],
    ) -> sqlx::Result<(Sermon, Vec<MainPoint>)> {
        let mut tx = db.begin().await?;

        let sermon = sqlx::query_as::<_, Sermon>(&format!(
            r#"
            INSERT INTO sermons
                (user_id, service_type, theme, title, key_verse, introduction, conclusion, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SERMON_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(service_type)
        .bind(theme)
        .bind(title)
        .bind(key_verse)
        .bind(introduction)
        .bind(conclusion)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        let mut created = Vec::with_capacity(points.len());
        for (idx, point) in points.iter().enumerate() {
            let row = sqlx::query_as::<_, MainPoint>(
                r#"
                INSERT INTO main_points
                    (sermon_id, title, explanation, scripture_references, point_order)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, sermon_id, title, explanation, scripture_references, point_order
                "#,
            )
            .bind(sermon.id)
            .bind(&point.title)
            .bind(&point.explanation)
            .bind(&point.scripture_references)
            .bind((idx + 1) as i32)
            .fetch_one(&mut *tx)
            .await?;
            created.push(row);
        }

        tx.commit().await?;
        Ok((sermon, created))
    }

    /// Partial update; `None` fields keep their current value. `id` and
    /// `user_id` are never updatable.
    pub async fn update_fields(
        db: &PgPool,
        id: Uuid,
        changes: &UpdateSermonRequest,
    ) -> sqlx::Result<Sermon> {
        let row = sqlx::query_as::<_, Sermon>(&format!(
            r#"
            UPDATE sermons SET
                title = COALESCE($2, title),
                theme = COALESCE($3, theme),
                service_type = COALESCE($4, service_type),
                key_verse = COALESCE($5, key_verse),
                introduction = COALESCE($6, introduction),
                conclusion = COALESCE($7, conclusion),
                notes = COALESCE($8, notes),
                is_favorite = COALESCE($9, is_favorite),
                updated_at = now()
            WHERE id = $1
            RETURNING {SERMON_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.theme)
        .bind(changes.service_type)
        .bind(&changes.key_verse)
        .bind(&changes.introduction)
        .bind(&changes.conclusion)
        .bind(&changes.notes)
        .bind(changes.is_favorite)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    pub async fn delete_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM sermons WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

impl MainPoint {
    /// Ordered points for a set of sermons, grouped by sermon id.
    pub async fn for_sermons(
        db: &PgPool,
        sermon_ids: &[Uuid],
    ) -> sqlx::Result<HashMap<Uuid, Vec<MainPoint>>> {
        if sermon_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, MainPoint>(
            r#"
            SELECT id, sermon_id, title, explanation, scripture_references, point_order
            FROM main_points
            WHERE sermon_id = ANY($1)
            ORDER BY point_order ASC
            "#,
        )
        .bind(sermon_ids)
        .fetch_all(db)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<MainPoint>> = HashMap::new();
        for row in rows {
            grouped.entry(row.sermon_id).or_default().push(row);
        }
        Ok(grouped)
    }
}
