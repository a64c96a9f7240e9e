//! axum router and server loop for the operator control surface.
//!
//! All bodies are JSON. `POST /broadcast` answers
//! `{"status": "started", "count": n}` on admission and
//! `{"status": "error", "message": ...}` with `400` on rejection.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::AppState;
use crate::dispatch::dispatcher::BroadcastRequest;
use crate::models::contact::{Contact, ContactGroup, NewContact};
use crate::models::progress::BroadcastProgress;
use crate::models::template::Template;
use crate::persistence::contact_repo::ContactRepo;
use crate::persistence::group_repo::GroupRepo;
use crate::{AppError, Result};

type SharedState = Arc<AppState>;

/// Body of `POST /broadcast`.
#[derive(Debug, Deserialize)]
pub struct BroadcastBody {
    /// Template name.
    pub template: String,
    /// Target group.
    pub group_id: i64,
}

/// Body of `POST /groups`.
#[derive(Debug, Deserialize)]
pub struct CreateGroupBody {
    /// New group name.
    pub name: String,
}

/// Build the router with every route mounted.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/provider/health", get(provider_health))
        .route("/templates", get(list_templates))
        .route("/templates/refresh", post(refresh_templates))
        .route("/contacts", get(list_all_contacts))
        .route("/contacts/{id}", get(get_contact))
        .route("/groups", get(list_groups).post(create_group))
        .route("/groups/{id}", axum::routing::delete(delete_group))
        .route(
            "/groups/{id}/contacts",
            get(list_contacts).post(add_contacts),
        )
        .route("/groups/{id}/reset", post(reset_group))
        .route("/broadcast", post(start_broadcast))
        .route("/broadcast_status", get(broadcast_status))
        .route("/broadcast/cancel", post(cancel_broadcast))
        .with_state(state)
}

/// Serve on `127.0.0.1:{config.http_port}` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the port cannot be bound or the server fails.
pub async fn serve(state: SharedState, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], state.config.http_port));
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {bind}: {err}")))?;
    serve_on(listener, state, ct).await
}

/// Serve on an already-bound listener until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails.
pub async fn serve_on(listener: TcpListener, state: SharedState, ct: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "http control surface listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))
}

async fn health() -> &'static str {
    "ok"
}

async fn provider_health(State(state): State<SharedState>) -> Json<Value> {
    let online = match &state.provider {
        Some(client) => client.check_health().await,
        None => false,
    };
    Json(json!({ "online": online }))
}

async fn list_templates(State(state): State<SharedState>) -> Json<Vec<Template>> {
    Json(state.catalog.fetch_templates().await)
}

async fn refresh_templates(State(state): State<SharedState>) -> Json<Vec<Template>> {
    state.catalog.invalidate().await;
    Json(state.catalog.fetch_templates().await)
}

async fn list_all_contacts(State(state): State<SharedState>) -> Result<Json<Vec<Contact>>> {
    let repo = ContactRepo::new(Arc::clone(&state.db));
    Ok(Json(repo.list(None).await?))
}

async fn get_contact(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<Contact>> {
    let repo = ContactRepo::new(Arc::clone(&state.db));
    repo.get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("contact {id} not found")))
}

async fn list_groups(State(state): State<SharedState>) -> Result<Json<Vec<ContactGroup>>> {
    let repo = GroupRepo::new(Arc::clone(&state.db));
    Ok(Json(repo.list().await?))
}

async fn create_group(
    State(state): State<SharedState>,
    Json(body): Json<CreateGroupBody>,
) -> Result<(StatusCode, Json<ContactGroup>)> {
    let repo = GroupRepo::new(Arc::clone(&state.db));
    let group = repo.create(&body.name).await?;
    info!(group_id = group.id, name = %group.name, "group created");
    Ok((StatusCode::CREATED, Json(group)))
}

async fn delete_group(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<StatusCode> {
    let repo = GroupRepo::new(Arc::clone(&state.db));
    repo.delete(id).await?;
    info!(group_id = id, "group deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contacts(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Contact>>> {
    GroupRepo::new(Arc::clone(&state.db)).get_by_id(id).await?;
    let repo = ContactRepo::new(Arc::clone(&state.db));
    Ok(Json(repo.list(Some(id)).await?))
}

async fn add_contacts(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(contacts): Json<Vec<NewContact>>,
) -> Result<Json<Value>> {
    GroupRepo::new(Arc::clone(&state.db)).get_by_id(id).await?;
    let repo = ContactRepo::new(Arc::clone(&state.db));
    let inserted = repo.insert_many(id, &contacts).await?;
    info!(group_id = id, inserted, "contacts added");
    Ok(Json(json!({ "inserted": inserted })))
}

async fn reset_group(State(state): State<SharedState>, Path(id): Path<i64>) -> Result<Json<Value>> {
    GroupRepo::new(Arc::clone(&state.db)).get_by_id(id).await?;
    let repo = ContactRepo::new(Arc::clone(&state.db));
    let reset = repo.reset_group(id).await?;
    info!(group_id = id, reset, "group reset to pending");
    Ok(Json(json!({ "reset": reset })))
}

async fn start_broadcast(
    State(state): State<SharedState>,
    Json(body): Json<BroadcastBody>,
) -> Result<Response> {
    // Fast path: skip the contact query when a job is already running. The
    // dispatcher's gate remains the authoritative check.
    if state.dispatcher.progress().snapshot().is_active {
        return Ok(rejection("Broadcast already in progress"));
    }

    let group = GroupRepo::new(Arc::clone(&state.db))
        .get_by_id(body.group_id)
        .await?;
    let contacts = ContactRepo::new(Arc::clone(&state.db))
        .list_pending_rows(group.id)
        .await?;

    let admission = state.dispatcher.accept(BroadcastRequest {
        template_name: body.template,
        group_id: group.id,
        group_label: group.name,
        contacts,
    });

    if admission.accepted {
        let count = admission.count.unwrap_or_default();
        Ok(Json(json!({ "status": "started", "count": count })).into_response())
    } else {
        Ok(rejection(admission.reason.as_deref().unwrap_or("rejected")))
    }
}

fn rejection(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "message": message })),
    )
        .into_response()
}

async fn broadcast_status(State(state): State<SharedState>) -> Json<BroadcastProgress> {
    Json(state.dispatcher.progress().snapshot())
}

async fn cancel_broadcast(State(state): State<SharedState>) -> Result<Json<Value>> {
    if state.dispatcher.cancel() {
        Ok(Json(json!({ "status": "cancelling" })))
    } else {
        Err(AppError::Conflict("no broadcast in progress".into()))
    }
}
