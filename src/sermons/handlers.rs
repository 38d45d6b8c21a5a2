use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    ai::{SermonOutline, ThemeSuggestions},
    auth::CurrentUser,
    error::ApiError,
    plan::{self, Plan},
    sermons::{
        dto::{
            CreateSermonRequest, GenerateFullRequest, GenerateOutlineRequest,
            GenerateOutlineResponse, SermonResponse, SuggestThemesRequest, UpdateSermonRequest,
        },
        repo::{MainPoint, Sermon},
    },
    state::AppState,
};

/// Quota gate for generation endpoints; denial is a 403 with a fixed
/// upgrade prompt.
fn ensure_quota(user: &CurrentUser) -> Result<(), ApiError> {
    if plan::may_consume(user.plan, user.sermons_this_month) {
        Ok(())
    } else {
        warn!(user_id = %user.id, used = user.sermons_this_month, "generation quota exhausted");
        Err(ApiError::QuotaExceeded)
    }
}

/// Counter moves by exactly 1, free tier only, and only after the
/// generation call has succeeded.
async fn consume_quota(state: &AppState, user: &CurrentUser) -> Result<(), ApiError> {
    if user.plan == Plan::Free {
        state.usage.record_generation(user.id).await?;
    }
    Ok(())
}

// --- CRUD ---

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_sermons(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SermonResponse>>, ApiError> {
    let sermons = Sermon::list_by_user(&state.db, user.id).await?;
    let ids: Vec<Uuid> = sermons.iter().map(|s| s.id).collect();
    let mut points = MainPoint::for_sermons(&state.db, &ids).await?;

    let items = sermons
        .into_iter()
        .map(|s| {
            let sermon_points = points.remove(&s.id).unwrap_or_default();
            SermonResponse::from_parts(s, sermon_points)
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_sermon(
    State(state): State<AppState>,
    user: CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<CreateSermonRequest>, ApiError>,
) -> Result<(StatusCode, Json<SermonResponse>), ApiError> {
    if payload.title.trim().is_empty() || payload.theme.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Title, theme and service type are required".into(),
        ));
    }

    let (sermon, points) = Sermon::create_with_points(
        &state.db,
        user.id,
        payload.service_type,
        &payload.theme,
        &payload.title,
        payload.key_verse.as_deref(),
        payload.introduction.as_deref(),
        payload.conclusion.as_deref(),
        payload.notes.as_deref(),
        &payload.main_points,
    )
    .await?;

    info!(sermon_id = %sermon.id, "sermon created");
    Ok((
        StatusCode::CREATED,
        Json(SermonResponse::from_parts(sermon, points)),
    ))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id, sermon_id = %id))]
pub async fn update_sermon(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<UpdateSermonRequest>, ApiError>,
) -> Result<Json<SermonResponse>, ApiError> {
    // Ownership failures are masked as 404 so callers cannot probe for
    // other users' sermon ids.
    if Sermon::find_owned(&state.db, id, user.id).await?.is_none() {
        return Err(ApiError::NotFound("Sermon not found"));
    }

    let sermon = Sermon::update_fields(&state.db, id, &payload).await?;
    let mut points = MainPoint::for_sermons(&state.db, &[id]).await?;
    let sermon_points = points.remove(&id).unwrap_or_default();

    Ok(Json(SermonResponse::from_parts(sermon, sermon_points)))
}

#[instrument(skip(state, user), fields(user_id = %user.id, sermon_id = %id))]
pub async fn delete_sermon(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if Sermon::find_owned(&state.db, id, user.id).await?.is_none() {
        return Err(ApiError::NotFound("Sermon not found"));
    }

    Sermon::delete_by_id(&state.db, id).await?;
    info!("sermon deleted");
    Ok(Json(serde_json::json!({ "message": "Sermon deleted" })))
}

// --- AI generation ---

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn suggest_themes(
    State(state): State<AppState>,
    user: CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<SuggestThemesRequest>, ApiError>,
) -> Result<Json<ThemeSuggestions>, ApiError> {
    ensure_quota(&user)?;

    let suggestions = state
        .generator
        .suggest_themes(payload.service_type.label())
        .await
        .map_err(|e| {
            error!(error = %e, "theme suggestion failed");
            ApiError::Upstream
        })?;

    // Suggestions do not consume quota; only full generation does.
    Ok(Json(suggestions))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn generate_full(
    State(state): State<AppState>,
    user: CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<GenerateFullRequest>, ApiError>,
) -> Result<Json<SermonOutline>, ApiError> {
    ensure_quota(&user)?;

    if payload.theme.trim().is_empty() || payload.key_verse.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Service type, theme and key verse are required".into(),
        ));
    }

    let outline = state
        .generator
        .generate_full(payload.service_type.label(), &payload.theme, &payload.key_verse)
        .await
        .map_err(|e| {
            error!(error = %e, "full sermon generation failed");
            ApiError::Upstream
        })?;

    consume_quota(&state, &user).await?;
    info!(theme = %payload.theme, "full sermon outline generated");
    Ok(Json(outline))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn generate_outline(
    State(state): State<AppState>,
    user: CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<GenerateOutlineRequest>, ApiError>,
) -> Result<Json<GenerateOutlineResponse>, ApiError> {
    if payload.theme.trim().is_empty() {
        return Err(ApiError::BadRequest("Theme is required".into()));
    }

    ensure_quota(&user)?;

    let outline = state
        .generator
        .generate_outline(&payload.theme, payload.reference.as_deref())
        .await
        .map_err(|e| {
            error!(error = %e, "outline generation failed");
            ApiError::Upstream
        })?;

    consume_quota(&state, &user).await?;
    Ok(Json(GenerateOutlineResponse { outline }))
}
