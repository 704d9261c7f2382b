//! REST surface. Every route except health requires a bearer token; tool
//! routes always answer 200 with a [`ToolOutcome`] envelope.

use axum::extract::{Path, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use horizon_agent::tools::{ApplicationContentResult, BrainstormResult};
use horizon_agent::{ChatReply, ToolContext};
use horizon_core::config::ServerConfig;
use horizon_core::domain::application::ApplicationSection;
use horizon_core::domain::knowledge::KnowledgeMatch;
use horizon_core::domain::project::{Project, ProjectId};
use horizon_core::errors::ApplicationError;
use horizon_core::matching::PartnerMatches;
use horizon_core::outcome::ToolOutcome;
use horizon_core::requests::{
    ApplicationContentRequest, BrainstormRequest, ChatRequest, CreateProjectRequest,
    KnowledgeSearchRequest, PartnerSearchRequest, UpdateProjectRequest,
};

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::extract::ValidatedJson;
use crate::health::health;
use crate::state::AppState;

pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/brainstorm", post(brainstorm))
        .route("/api/partners/search", post(search_partners))
        .route("/api/application/content", post(application_content))
        .route("/api/chat", post(chat))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project).patch(update_project))
        .route("/api/projects/{id}/sections", get(list_sections))
        .route("/api/knowledge/search", post(search_knowledge))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// Origins that do not parse as header values are skipped with a warning;
/// the config loader already rejects anything without an http(s) scheme.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(
                    event_name = "server.cors.invalid_origin",
                    origin = %origin,
                    error = %error,
                    "ignoring invalid CORS origin"
                );
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

fn tool_context(user: &AuthUser, session_id: Option<&str>) -> ToolContext {
    ToolContext { user_id: user.user_id.clone(), session_id: session_id.map(str::to_string) }
}

async fn brainstorm(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<BrainstormRequest>,
) -> Json<ToolOutcome<BrainstormResult>> {
    Json(state.runtime.brainstorm(&tool_context(&user, None), request).await)
}

async fn search_partners(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<PartnerSearchRequest>,
) -> Json<ToolOutcome<PartnerMatches>> {
    Json(state.runtime.discover_partners(&tool_context(&user, None), request).await)
}

async fn application_content(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<ApplicationContentRequest>,
) -> Json<ToolOutcome<ApplicationContentResult>> {
    Json(state.runtime.generate_application_content(&tool_context(&user, None), request).await)
}

async fn chat(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<ChatRequest>,
) -> Json<ToolOutcome<ChatReply>> {
    let context = tool_context(&user, request.session_id.as_deref());
    Json(state.runtime.chat(&context, request).await)
}

async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<Project>>> {
    Ok(Json(state.repositories().projects.list_for_user(&user.user_id).await?))
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let project = request.into_project(user.user_id.as_str());
    state.repositories().projects.save(project.clone()).await?;
    tracing::info!(
        event_name = "server.project.created",
        project_id = %project.id,
        user_id = %user.user_id,
        "project created"
    );
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Project>> {
    Ok(Json(owned_project(&state, &user, ProjectId(id)).await?))
}

async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateProjectRequest>,
) -> AppResult<Json<Project>> {
    let mut project = owned_project(&state, &user, ProjectId(id)).await?;
    request.apply_to(&mut project);
    state.repositories().projects.save(project.clone()).await?;
    Ok(Json(project))
}

async fn list_sections(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<ApplicationSection>>> {
    let project = owned_project(&state, &user, ProjectId(id)).await?;
    Ok(Json(state.repositories().sections.list_for_project(&project.id).await?))
}

#[derive(Debug, Serialize)]
struct KnowledgeSearchResponse {
    matches: Vec<KnowledgeMatch>,
}

async fn search_knowledge(
    State(state): State<AppState>,
    _user: AuthUser,
    ValidatedJson(request): ValidatedJson<KnowledgeSearchRequest>,
) -> AppResult<Json<KnowledgeSearchResponse>> {
    let matches = state
        .repositories()
        .knowledge
        .search(&request.embedding, request.threshold, request.limit)
        .await?;
    Ok(Json(KnowledgeSearchResponse { matches }))
}

async fn owned_project(state: &AppState, user: &AuthUser, id: ProjectId) -> AppResult<Project> {
    state
        .repositories()
        .projects
        .find_for_user(&id, &user.user_id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound { entity: "project", id: id.0 }.into())
}
