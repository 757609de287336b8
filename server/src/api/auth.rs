use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    api::{
        ApiError,
        extractors::{AuthenticatedUser, CsrfGuard, CurrentSession, JsonOrForm},
    },
    app::AppState,
    auth,
    models::RowId,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: RowId,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: RowId,
    pub username: String,
}

/// Response of `/api/me`. Anonymous callers get `{"username": null}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<RowId>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfResponse {
    pub csrf_token: String,
}

pub async fn register(
    _csrf: CsrfGuard,
    State(state): State<AppState>,
    JsonOrForm(credentials): JsonOrForm<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user_id =
        auth::register(state.db.as_ref(), &credentials.username, &credentials.password).await?;
    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id })))
}

pub async fn login(
    CsrfGuard(session): CsrfGuard,
    State(state): State<AppState>,
    JsonOrForm(credentials): JsonOrForm<Credentials>,
) -> Result<Json<Identity>, ApiError> {
    let user = auth::login(
        state.db.as_ref(),
        &session,
        &credentials.username,
        &credentials.password,
    )
    .await?;
    Ok(Json(Identity {
        user_id: user.id,
        username: user.username,
    }))
}

pub async fn logout(
    AuthenticatedUser { session, .. }: AuthenticatedUser,
    _csrf: CsrfGuard,
) -> Result<Json<MeResponse>, ApiError> {
    auth::logout(&session)?;
    Ok(Json(MeResponse {
        username: None,
        user_id: None,
    }))
}

pub async fn me(
    CurrentSession(session): CurrentSession,
    State(state): State<AppState>,
) -> Json<MeResponse> {
    let user = auth::current_user(state.db.as_ref(), &session).await;
    Json(MeResponse {
        user_id: user.as_ref().map(|u| u.id),
        username: user.map(|u| u.username),
    })
}

pub async fn csrf_token(CurrentSession(session): CurrentSession) -> Json<CsrfResponse> {
    Json(CsrfResponse {
        csrf_token: session.csrf_token(),
    })
}
