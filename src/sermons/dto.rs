use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::sermons::repo::{MainPoint, Sermon, ServiceType};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMainPoint {
    pub title: String,
    pub explanation: String,
    #[serde(default)]
    pub scripture_references: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSermonRequest {
    pub title: String,
    pub theme: String,
    pub service_type: ServiceType,
    pub key_verse: Option<String>,
    pub introduction: Option<String>,
    pub conclusion: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub main_points: Vec<NewMainPoint>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSermonRequest {
    pub title: Option<String>,
    pub theme: Option<String>,
    pub service_type: Option<ServiceType>,
    pub key_verse: Option<String>,
    pub introduction: Option<String>,
    pub conclusion: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainPointResponse {
    pub id: Uuid,
    pub title: String,
    pub explanation: String,
    pub scripture_references: Vec<String>,
    pub order: i32,
}

impl From<MainPoint> for MainPointResponse {
    fn from(p: MainPoint) -> Self {
        Self {
            id: p.id,
            title: p.title,
            explanation: p.explanation,
            scripture_references: p.scripture_references,
            order: p.point_order,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SermonResponse {
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
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub main_points: Vec<MainPointResponse>,
}

impl SermonResponse {
    pub fn from_parts(sermon: Sermon, points: Vec<MainPoint>) -> Self {
        Self {
            id: sermon.id,
            user_id: sermon.user_id,
            service_type: sermon.service_type,
            theme: sermon.theme,
            title: sermon.title,
            key_verse: sermon.key_verse,
            introduction: sermon.introduction,
            conclusion: sermon.conclusion,
            notes: sermon.notes,
            is_favorite: sermon.is_favorite,
            created_at: sermon.created_at,
            updated_at: sermon.updated_at,
            main_points: points.into_iter().map(MainPointResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestThemesRequest {
    pub service_type: ServiceType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateFullRequest {
    pub service_type: ServiceType,
    pub theme: String,
    pub key_verse: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateOutlineRequest {
    pub theme: String,
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateOutlineResponse {
    pub outline: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_camel_case_with_nested_points() {
        let raw = r#"{
            "title": "A Fé que Move",
            "theme": "Fé",
            "serviceType": "ensino",
            "keyVerse": "Hebreus 11:1",
            "mainPoints": [
                {"title": "P1", "explanation": "E1", "scriptureReferences": ["Tiago 2:17"]},
                {"title": "P2", "explanation": "E2"}
            ]
        }"#;
        let req: CreateSermonRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(req.service_type, ServiceType::Ensino);
        assert_eq!(req.main_points.len(), 2);
        assert!(req.main_points[1].scripture_references.is_empty());
        assert!(req.notes.is_none());
    }

    #[test]
    fn update_request_allows_favorite_only() {
        let req: UpdateSermonRequest = serde_json::from_str(r#"{"isFavorite": true}"#).unwrap();
        assert_eq!(req.is_favorite, Some(true));
        assert!(req.title.is_none());
        assert!(req.service_type.is_none());
    }

    #[test]
    fn create_request_rejects_missing_service_type() {
        let raw = r#"{"title": "T", "theme": "X"}"#;
        assert!(serde_json::from_str::<CreateSermonRequest>(raw).is_err());
    }
}
