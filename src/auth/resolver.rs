use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::repo::{AuthUserRow, User};
use crate::auth::token::{SessionKeys, SESSION_COOKIE};
use crate::error::ApiError;
use crate::plan::Plan;
use crate::state::AppState;

/// The authenticated caller, resolved from the session cookie.
///
/// Extraction short-circuits with 401 on a missing/invalid token or a
/// deleted user, and 500 on an unexpected datastore failure. The password
/// hash is never part of the projection.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub plan: Plan,
    pub sermons_this_month: i32,
    pub last_reset_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// True when `now` has moved into a later calendar month (UTC) than the
/// user's last counter reset.
pub(crate) fn month_rolled_over(last_reset: OffsetDateTime, now: OffsetDateTime) -> bool {
    now.year() > last_reset.year()
        || (now.year() == last_reset.year()
            && u8::from(now.month()) > u8::from(last_reset.month()))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Err(ApiError::Unauthorized("Token not found"));
        };

        let keys = SessionKeys::from_ref(state);
        let Some(claims) = keys.verify(cookie.value()) else {
            warn!("invalid or expired session token");
            return Err(ApiError::Unauthorized("Invalid token"));
        };

        let row = AuthUserRow::find_by_id(&state.db, claims.sub)
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %claims.sub, "user lookup failed");
                ApiError::Internal
            })?;
        let Some(mut row) = row else {
            warn!(user_id = %claims.sub, "token references a missing user");
            return Err(ApiError::Unauthorized("User not found"));
        };

        // Lazy monthly reset: first authenticated request in a new calendar
        // month zeroes the generation counter.
        if month_rolled_over(row.last_reset_date, OffsetDateTime::now_utc()) {
            User::reset_monthly_count(&state.db, row.id)
                .await
                .map_err(|e| {
                    error!(error = %e, user_id = %row.id, "monthly counter reset failed");
                    ApiError::Internal
                })?;
            info!(user_id = %row.id, "monthly generation counter reset");
            row.sermons_this_month = 0;
            row.last_reset_date = OffsetDateTime::now_utc();
        }

        Ok(CurrentUser {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            plan: row.plan,
            sermons_this_month: row.sermons_this_month,
            last_reset_date: row.last_reset_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn same_month_does_not_roll_over() {
        let last = datetime!(2026-08-01 00:00 UTC);
        let now = datetime!(2026-08-29 12:00 UTC);
        assert!(!month_rolled_over(last, now));
    }

    #[test]
    fn next_month_rolls_over() {
        let last = datetime!(2026-08-29 12:00 UTC);
        let now = datetime!(2026-09-01 00:00 UTC);
        assert!(month_rolled_over(last, now));
    }

    #[test]
    fn year_boundary_rolls_over() {
        let last = datetime!(2026-12-31 23:59 UTC);
        let now = datetime!(2027-01-01 00:00 UTC);
        assert!(month_rolled_over(last, now));
    }

    #[test]
    fn clock_skew_backwards_does_not_reset() {
        let last = datetime!(2026-09-01 00:00 UTC);
        let now = datetime!(2026-08-31 23:59 UTC);
        assert!(!month_rolled_over(last, now));
    }
}
