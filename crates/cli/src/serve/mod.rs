//! `taskripple serve` -- HTTP JSON API over the ledger platform.
//!
//! Every endpoint mirrors a CLI command. The acting account is named by the
//! `X-Account-Id` header; its role is read from the store on each request.
//! If `TASKRIPPLE_API_KEY` is set, all endpoints except /health also need
//! `Authorization: Bearer <key>` or `X-API-Key: <key>`.
//!
//! Endpoints:
//! - GET    /health
//! - POST   /accounts                          - Register
//! - POST   /login
//! - GET    /me                                - Caller's account
//! - GET    /me/overview
//! - GET    /me/transactions?kind=&status=
//! - GET    /me/submissions
//! - GET    /me/referrals
//! - GET    /me/downline
//! - POST   /activation                        - Request activation
//! - POST   /withdrawals                       - Request withdrawal
//! - GET    /tasks?proof_type=
//! - POST   /tasks                             - Create task (admin)
//! - DELETE /tasks/{id}                        - Delete task (admin)
//! - POST   /tasks/{id}/submissions            - Submit proof
//! - GET    /admin/overview
//! - GET    /admin/accounts
//! - PUT    /admin/accounts/{id}/status
//! - PUT    /admin/accounts/{id}/role
//! - GET    /admin/pending
//! - GET    /admin/transactions?user=&kind=&status=
//! - POST   /admin/activations/{id}/approve|reject
//! - POST   /admin/submissions/{id}/approve|reject
//! - POST   /admin/withdrawals/{id}/approve|reject
//! - GET    /admin/reconcile
//!
//! Errors are `{"error": message, "code": code}`.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{middleware as axum_middleware, Json, Router};
use taskripple_ledger::LedgerError;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use self::handlers::*;
use self::middleware::auth_middleware;
use self::state::AppState;
use crate::commands::{CliError, LedgerPlatform};

/// Maximum request body size: 1 MB.
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Environment variable holding the optional API key.
const API_KEY_ENV: &str = "TASKRIPPLE_API_KEY";

/// Construct a JSON error response with the given status code and message.
fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message, "code": code })),
    )
        .into_response()
}

/// A failed request, rendered as a JSON error body.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub(crate) fn unauthenticated(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "unauthenticated",
            message: message.into(),
        }
    }
}

/// HTTP status for a ledger error code.
fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::AccountNotFound(_)
        | LedgerError::TaskNotFound(_)
        | LedgerError::SubmissionNotFound(_)
        | LedgerError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::DuplicateEmail(_)
        | LedgerError::DuplicateSubmission { .. }
        | LedgerError::ActivationAlreadyPending(_)
        | LedgerError::InvalidTransactionState { .. } => StatusCode::CONFLICT,
        LedgerError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LedgerError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        LedgerError::InsufficientBalance { .. }
        | LedgerError::AccountNotEligible { .. }
        | LedgerError::BelowMinimumWithdrawal { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::InvalidTask(_) | LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        LedgerError::Config(_) | LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = status_for(&err);
        if status.is_server_error() {
            warn!(error = %err, "request failed");
        }
        Self {
            status,
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(self.status, self.code, &self.message)
    }
}

/// Seed an empty store, then serve the API on `port` until Ctrl+C.
pub(crate) async fn start_server(platform: LedgerPlatform, port: u16) -> Result<(), CliError> {
    if platform.bootstrap().await? {
        info!(admin_id = %platform.config().admin.id, "seeded empty store");
    }

    let api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
    if api_key.is_some() {
        info!("API key authentication enabled");
    } else {
        warn!(
            env = API_KEY_ENV,
            "no API key configured; any client can act as any account via X-Account-Id"
        );
    }

    let state = Arc::new(AppState { platform, api_key });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/accounts", post(handle_register))
        .route("/login", post(handle_login))
        .route("/me", get(handle_me))
        .route("/me/overview", get(handle_overview))
        .route("/me/transactions", get(handle_history))
        .route("/me/submissions", get(handle_my_submissions))
        .route("/me/referrals", get(handle_referrals))
        .route("/me/downline", get(handle_downline))
        .route("/activation", post(handle_request_activation))
        .route("/withdrawals", post(handle_request_withdrawal))
        .route("/tasks", get(handle_list_tasks).post(handle_create_task))
        .route("/tasks/{id}", delete(handle_delete_task))
        .route("/tasks/{id}/submissions", post(handle_submit_task))
        .route("/admin/overview", get(handle_admin_overview))
        .route("/admin/accounts", get(handle_list_accounts))
        .route("/admin/accounts/{id}/status", put(handle_set_status))
        .route("/admin/accounts/{id}/role", put(handle_set_role))
        .route("/admin/pending", get(handle_pending))
        .route("/admin/transactions", get(handle_transactions))
        .route(
            "/admin/activations/{id}/approve",
            post(handle_approve_activation),
        )
        .route(
            "/admin/activations/{id}/reject",
            post(handle_reject_activation),
        )
        .route(
            "/admin/submissions/{id}/approve",
            post(handle_approve_submission),
        )
        .route(
            "/admin/submissions/{id}/reject",
            post(handle_reject_submission),
        )
        .route(
            "/admin/withdrawals/{id}/approve",
            post(handle_approve_withdrawal),
        )
        .route(
            "/admin/withdrawals/{id}/reject",
            post(handle_reject_withdrawal),
        )
        .route("/admin/reconcile", get(handle_reconcile))
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "TaskRipple API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shut down");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received shutdown signal"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
