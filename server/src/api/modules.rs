use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
    http::{HeaderMap, StatusCode, header::ACCEPT},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    api::{
        ApiError,
        extractors::{AuthenticatedUser, CreateModuleRequest},
    },
    app::AppState,
    models::{CardList, ModuleCreate, OwnedModule, RowId},
};

/// Listing entry; everything but the cards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub id: RowId,
    pub name: String,
    pub description: String,
    pub count_questions: i64,
    pub owner_name: Option<String>,
    pub owner_id: Option<RowId>,
}

impl From<&OwnedModule> for ModuleSummary {
    fn from(owned: &OwnedModule) -> Self {
        let module = &owned.module;
        Self {
            id: module.id,
            name: module.name.clone(),
            description: module.description.clone(),
            count_questions: module.count_questions,
            owner_name: owned.owner_name.clone(),
            owner_id: module.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDetail {
    #[serde(flatten)]
    pub summary: ModuleSummary,
    pub cards: CardList,
}

impl From<OwnedModule> for ModuleDetail {
    fn from(owned: OwnedModule) -> Self {
        Self {
            summary: ModuleSummary::from(&owned),
            cards: owned.module.cards,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub id: RowId,
}

pub async fn list_modules(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModuleSummary>>, ApiError> {
    let modules = state.db.list_modules().await?;
    Ok(Json(modules.iter().map(ModuleSummary::from).collect()))
}

/// Browsers submitting the create form (`Accept: text/html`) are redirected to the new module's
/// page; other clients get `201 {id}`.
pub async fn create_module(
    AuthenticatedUser { user, .. }: AuthenticatedUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    request: CreateModuleRequest,
) -> Result<Response, ApiError> {
    let module = state
        .db
        .create_module(&ModuleCreate {
            name: request.name,
            description: request.description,
            cards: request.cards,
            user_id: Some(user.id),
        })
        .await?;
    info!(
        module_id = module.id,
        user_id = user.id,
        "created module with {} cards",
        module.count_questions
    );
    if wants_html(&headers) {
        let location = format!("/flashcard_module/{}", module.id);
        return Ok(Redirect::to(&location).into_response());
    }
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: module.id })).into_response())
}

fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("text/html"))
}

pub async fn get_module(
    State(state): State<AppState>,
    id: Result<Path<RowId>, PathRejection>,
) -> Result<Json<ModuleDetail>, ApiError> {
    let Path(id) = id.map_err(|rejection| {
        debug!("rejected module id: {}", rejection.body_text());
        ApiError::MalformedPayload("invalid module id".to_string())
    })?;
    match state.db.get_module(id).await? {
        Some(module) => Ok(Json(module.into())),
        None => Err(ApiError::NotFound),
    }
}
