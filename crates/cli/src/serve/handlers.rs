//! HTTP route handlers. Each one resolves the caller, runs a single platform
//! operation, and returns its result as JSON.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rust_decimal::Decimal;
use serde::Deserialize;
use taskripple_ledger::storage::{
    AccountStatus, ProofType, Role, TransactionFilter, TransactionKind, TransactionStatus,
};
use taskripple_ledger::{Actor, Decision, LedgerError, NewTask, Proof, Registration};

use super::state::AppState;
use super::{json_error, ApiError};
use crate::view::{self, AccountView, ActivationView};

/// Header naming the acting account.
const ACCOUNT_HEADER: &str = "x-account-id";

type ApiResult = Result<Response, ApiError>;

fn ok<T: serde::Serialize>(value: T) -> ApiResult {
    Ok(Json(value).into_response())
}

/// Resolve the `X-Account-Id` header to an actor.
async fn caller(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    let id = headers
        .get(ACCOUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthenticated("missing X-Account-Id header"))?;
    match state.platform.actor(id).await {
        Ok(actor) => Ok(actor),
        Err(LedgerError::AccountNotFound(_)) => Err(ApiError::unauthenticated(format!(
            "unknown account '{}'",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> Response {
    let response = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(response)).into_response()
}

// ── Accounts ─────────────────────────────────────────────────────────────────

/// POST /accounts
pub(crate) async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(registration): Json<Registration>,
) -> ApiResult {
    let account = state.platform.register(registration).await?;
    Ok((StatusCode::CREATED, Json(AccountView::from(&account))).into_response())
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    secret: String,
}

/// POST /login
pub(crate) async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult {
    let account = state.platform.login(&body.email, &body.secret).await?;
    ok(AccountView::from(&account))
}

/// GET /me
pub(crate) async fn handle_me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let account = state.platform.account(&actor).await?;
    ok(AccountView::from(&account))
}

/// GET /me/overview
pub(crate) async fn handle_overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.overview(&actor).await?)
}

#[derive(Deserialize)]
pub(crate) struct HistoryQuery {
    kind: Option<TransactionKind>,
    status: Option<TransactionStatus>,
}

/// GET /me/transactions
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state
        .platform
        .history(&actor, query.kind, query.status)
        .await?)
}

/// GET /me/submissions
pub(crate) async fn handle_my_submissions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.my_submissions(&actor).await?)
}

/// GET /me/referrals
pub(crate) async fn handle_referrals(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(view::accounts(&state.platform.referrals(&actor).await?))
}

/// GET /me/downline
pub(crate) async fn handle_downline(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(view::downline(&state.platform.downline(&actor).await?))
}

#[derive(Deserialize)]
pub(crate) struct ActivationRequest {
    payment_ref: String,
    proof_ref: String,
}

/// POST /activation
pub(crate) async fn handle_request_activation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ActivationRequest>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let deposit = state
        .platform
        .request_activation(&actor, &body.payment_ref, &body.proof_ref)
        .await?;
    Ok((StatusCode::CREATED, Json(deposit)).into_response())
}

#[derive(Deserialize)]
pub(crate) struct WithdrawalRequest {
    amount: Decimal,
    payment_ref: String,
}

/// POST /withdrawals
pub(crate) async fn handle_request_withdrawal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<WithdrawalRequest>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let withdrawal = state
        .platform
        .request_withdrawal(&actor, body.amount, &body.payment_ref)
        .await?;
    Ok((StatusCode::CREATED, Json(withdrawal)).into_response())
}

// ── Tasks ────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct TaskQuery {
    proof_type: Option<ProofType>,
}

/// GET /tasks
pub(crate) async fn handle_list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskQuery>,
) -> ApiResult {
    ok(state.platform.list_tasks(query.proof_type).await?)
}

/// POST /tasks
pub(crate) async fn handle_create_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(task): Json<NewTask>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let task = state.platform.create_task(&actor, task).await?;
    Ok((StatusCode::CREATED, Json(task)).into_response())
}

/// DELETE /tasks/{id}
pub(crate) async fn handle_delete_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    if state.platform.delete_task(&actor, &id).await? {
        ok(serde_json::json!({ "task_id": id, "deleted": true }))
    } else {
        Err(LedgerError::TaskNotFound(id).into())
    }
}

/// POST /tasks/{id}/submissions
pub(crate) async fn handle_submit_task(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(proof): Json<Proof>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let submission = state.platform.submit_task(&actor, &id, proof).await?;
    Ok((StatusCode::CREATED, Json(submission)).into_response())
}

// ── Admin ────────────────────────────────────────────────────────────────────

/// GET /admin/overview
pub(crate) async fn handle_admin_overview(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.admin_overview(&actor).await?)
}

/// GET /admin/accounts
pub(crate) async fn handle_list_accounts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(view::accounts(&state.platform.list_accounts(&actor).await?))
}

#[derive(Deserialize)]
pub(crate) struct StatusChange {
    status: AccountStatus,
}

/// PUT /admin/accounts/{id}/status
pub(crate) async fn handle_set_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusChange>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    match state.platform.set_status(&actor, &id, body.status).await? {
        Some(account) => ok(AccountView::from(&account)),
        None => Err(LedgerError::AccountNotFound(id).into()),
    }
}

#[derive(Deserialize)]
pub(crate) struct RoleChange {
    role: Role,
}

/// PUT /admin/accounts/{id}/role
pub(crate) async fn handle_set_role(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RoleChange>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    match state.platform.set_role(&actor, &id, body.role).await? {
        Some(account) => ok(AccountView::from(&account)),
        None => Err(LedgerError::AccountNotFound(id).into()),
    }
}

/// GET /admin/pending
pub(crate) async fn handle_pending(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.pending(&actor).await?)
}

#[derive(Deserialize)]
pub(crate) struct TransactionQuery {
    user: Option<String>,
    kind: Option<TransactionKind>,
    status: Option<TransactionStatus>,
}

/// GET /admin/transactions
pub(crate) async fn handle_transactions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<TransactionQuery>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let mut filter = TransactionFilter::all();
    if let Some(user) = &query.user {
        filter = filter.user(user);
    }
    if let Some(kind) = query.kind {
        filter = filter.kind(kind);
    }
    if let Some(status) = query.status {
        filter = filter.status(status);
    }
    ok(state.platform.transactions(&actor, &filter).await?)
}

/// POST /admin/activations/{id}/approve
pub(crate) async fn handle_approve_activation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    let outcome = state.platform.approve_activation(&actor, &id).await?;
    ok(ActivationView::from(outcome))
}

/// POST /admin/activations/{id}/reject
pub(crate) async fn handle_reject_activation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.reject_activation(&actor, &id).await?)
}

async fn decide(state: &AppState, headers: &HeaderMap, id: &str, decision: Decision) -> ApiResult {
    let actor = caller(state, headers).await?;
    ok(state.platform.decide_submission(&actor, id, decision).await?)
}

/// POST /admin/submissions/{id}/approve
pub(crate) async fn handle_approve_submission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    decide(&state, &headers, &id, Decision::Approved).await
}

/// POST /admin/submissions/{id}/reject
pub(crate) async fn handle_reject_submission(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    decide(&state, &headers, &id, Decision::Rejected).await
}

/// POST /admin/withdrawals/{id}/approve
pub(crate) async fn handle_approve_withdrawal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.approve_withdrawal(&actor, &id).await?)
}

/// POST /admin/withdrawals/{id}/reject
pub(crate) async fn handle_reject_withdrawal(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.reject_withdrawal(&actor, &id).await?)
}

/// GET /admin/reconcile
pub(crate) async fn handle_reconcile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult {
    let actor = caller(&state, &headers).await?;
    ok(state.platform.reconcile(&actor).await?)
}
