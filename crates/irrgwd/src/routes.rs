//! HTTP routes
//!
//! Thin JSON layer over irr-core. Every route is served both at the root
//! and under `/v1`.
//!
//! | Method | Path | Handler |
//! |---|---|---|
//! | GET | /health | liveness |
//! | POST | /submit | add or modify an object |
//! | DELETE | /submit | delete an object |
//! | GET | /objects | list records, most recent first |
//! | GET | /objects/:id | one record |
//! | POST | /whois | raw whois lookup |
//! | GET | /audit-logs?q= | audit trail |

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Query, State, rejection::JsonRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use irr_core::classifier::OutcomeKind;
use irr_core::{
    Action, AuditLogReader, ChangeRequest, Error, ObjectStore, ObjectType, Operator,
    SubmissionEngine, SubmissionReport, WhoisGateway,
};

/// Shared state handed to every handler
pub struct AppState {
    pub engine: SubmissionEngine,
    pub whois: WhoisGateway,
    pub audit: AuditLogReader,
    /// Audit username when the request names none
    pub default_username: String,
}

impl AppState {
    fn store(&self) -> &Arc<dyn ObjectStore> {
        self.engine.store()
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .merge(api_routes())
        .nest("/v1", api_routes())
        .fallback(handle_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handle_health))
        .route("/submit", post(handle_submit).delete(handle_delete))
        .route("/objects", get(handle_list_objects))
        .route("/objects/:id", get(handle_get_object))
        .route("/whois", post(handle_whois))
        .route("/audit-logs", get(handle_audit_logs))
}

// ==================
// Errors
// ==================

/// irr-core error rendered as `{error, kind, message}`
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::validation(format!("Invalid request body: {}", rejection.body_text())))
    }
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::Validation(_) | Error::InvalidServer(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Transport(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = error_status(&self.0);
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        let message = self.0.to_string();
        (
            status,
            Json(json!({
                "error": message,
                "kind": self.0.kind(),
                "message": message,
            })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ==================
// Request types
// ==================

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    object_type: Option<String>,
    action: Option<String>,
    data: Option<SubmitData>,
    #[serde(default)]
    multiple_routes: bool,
    server: Option<String>,
    username: Option<String>,
}

#[derive(Deserialize)]
pub struct SubmitData {
    object_text: Option<String>,
    identifier: Option<String>,
    #[serde(default)]
    passwords: Vec<String>,
}

// Passwords stay out of logs.
impl std::fmt::Debug for SubmitData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitData")
            .field("object_text", &self.object_text)
            .field("identifier", &self.identifier)
            .field("passwords", &self.passwords.len())
            .finish()
    }
}

impl SubmitBody {
    /// Turn the body into a change request; `forced` overrides the action
    fn into_request(
        self,
        forced: Option<Action>,
    ) -> irr_core::Result<(ChangeRequest, Option<String>)> {
        let object_type: ObjectType = required(self.object_type, "object_type")?.parse()?;
        let action = match forced {
            Some(action) => action,
            None => required(self.action, "action")?.parse()?,
        };

        let data = self
            .data
            .ok_or_else(|| Error::validation("data is required"))?;
        let object_text = required(data.object_text, "data.object_text")?;

        let mut request = ChangeRequest::new(object_type, action, object_text)
            .with_multiple_routes(self.multiple_routes);
        request.passwords = data.passwords;
        request.identifier = data.identifier;
        request.target_server = self.server;

        Ok((request, self.username))
    }
}

fn required(value: Option<String>, field: &str) -> irr_core::Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::validation(format!("{} is required", field)))
}

#[derive(Debug, Deserialize)]
pub struct WhoisBody {
    query: Option<String>,
    server: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuditParams {
    q: Option<String>,
}

// ==================
// Handlers
// ==================

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_submit(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: std::result::Result<Json<SubmitBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    submit(&state, peer, body, None).await
}

async fn handle_delete(
    State(state): State<Arc<AppState>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: std::result::Result<Json<SubmitBody>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(body) = body?;
    submit(&state, peer, body, Some(Action::Delete)).await
}

async fn submit(
    state: &AppState,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: SubmitBody,
    forced: Option<Action>,
) -> ApiResult<Response> {
    let (request, username) = body.into_request(forced)?;
    let action = request.action;

    let operator = Operator::new(
        username
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| state.default_username.clone()),
        peer.map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    );

    let report = state.engine.submit(request, &operator).await?;
    Ok(report_response(&report, action))
}

/// HTTP status for a classified outcome
pub fn outcome_status(kind: OutcomeKind, action: Action) -> StatusCode {
    match kind {
        OutcomeKind::Success if action == Action::Add => StatusCode::CREATED,
        OutcomeKind::Success => StatusCode::OK,
        OutcomeKind::PartialFailure => StatusCode::BAD_REQUEST,
        OutcomeKind::AuthenticationFailure | OutcomeKind::AuthorizationFailure => {
            StatusCode::UNAUTHORIZED
        }
        OutcomeKind::NotAuthoritative => StatusCode::FORBIDDEN,
        OutcomeKind::NotFound => StatusCode::NOT_FOUND,
        OutcomeKind::TransportError => StatusCode::BAD_GATEWAY,
    }
}

fn report_response(report: &SubmissionReport, action: Action) -> Response {
    let outcome = &report.outcome;
    let mut body = json!({
        "kind": outcome.kind,
        "message": outcome.message,
        "details": outcome.details,
        "jsonFile": outcome.generated_json_file,
        "summary": outcome.summary,
        "recordId": report.record_id,
        "server": report.server,
    });
    if !outcome.kind.is_success() {
        body["error"] = Value::String(outcome.message.clone());
    }

    (outcome_status(outcome.kind, action), Json(body)).into_response()
}

async fn handle_list_objects(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let mut records = state.store().list().await?;
    records.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

    let objects: Vec<Value> = records
        .iter()
        .map(|r| {
            json!({
                "id": r.id,
                "type": r.object_type,
                "identifier": r.identifier,
                "status": r.status,
                "lastModified": r.last_modified,
            })
        })
        .collect();

    Ok(Json(json!({ "objects": objects })))
}

async fn handle_get_object(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let record = state.store().get(&id).await?;
    Ok(Json(serde_json::to_value(record).map_err(Error::from)?))
}

async fn handle_whois(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<WhoisBody>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(body) = body?;
    let query = required(body.query, "query")?;
    let server = required(body.server, "server")?;

    let answer = state.whois.query(&server, &query).await?;
    Ok(Json(json!({
        "result": answer.result,
        "server": answer.server,
    })))
}

async fn handle_audit_logs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditParams>,
) -> ApiResult<Json<Value>> {
    let logs = state.audit.query(params.q.as_deref()).await?;
    Ok(Json(json!({ "logs": logs })))
}

async fn handle_not_found() -> ApiError {
    ApiError(Error::not_found("No such route"))
}
