use accounts_api::ApiError;
use accounts_core::BankAccountNumber;
use accounts_query::Page;
use accounts_storage::{StorageError, paginate};
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::extract::ListQuery;
use crate::metrics::{record_account_query, render_metrics};
use crate::schemas::AccountResponse;
use crate::server::AppState;

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn metrics() -> Response {
    match render_metrics() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics are not initialized").into_response(),
    }
}

fn parse_uuid(param: &'static str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|e| {
        ApiError::invalid_input(["path", param], format!("invalid uuid: {e}"), "value_error.uuid")
    })
}

#[tracing::instrument(skip_all, fields(user = %user.id, page = query.page.page(), size = query.page.size()))]
pub async fn list_accounts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    query: ListQuery,
) -> Result<Json<Page<AccountResponse>>, ApiError> {
    record_account_query("list", state.storage.backend_name());
    let page = paginate(
        state.storage.as_ref(),
        &query.to_query(),
        query.page,
        state.pagination.overflow,
        AccountResponse::from,
    )
    .await?;
    tracing::debug!(total = page.total, returned = page.items.len(), "listed accounts");
    Ok(Json(page))
}

#[tracing::instrument(skip_all, fields(user = %user.id, number = %number))]
pub async fn get_account_by_number(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(number): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let number: BankAccountNumber = number.parse().map_err(|e| {
        ApiError::invalid_input(
            ["path", "number"],
            format!("{e}"),
            "value_error.invalid_account_number",
        )
    })?;
    record_account_query("by_number", state.storage.backend_name());
    let account = state
        .storage
        .find_by_number(number.as_str())
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!(
                "Account with number '{}' does not exist",
                number.as_str()
            ))
        })?;
    Ok(Json(account.into()))
}

#[tracing::instrument(skip_all, fields(user = %user.id, company_id = %company_id))]
pub async fn list_company_accounts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(company_id): Path<String>,
) -> Result<Json<Vec<AccountResponse>>, ApiError> {
    let company_id = parse_uuid("company_id", &company_id)?;
    record_account_query("by_company", state.storage.backend_name());
    let accounts = state.storage.list_by_company(company_id).await?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

#[tracing::instrument(skip_all, fields(user = %user.id, account_id = %account_id))]
pub async fn get_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(account_id): Path<String>,
) -> Result<Json<AccountResponse>, ApiError> {
    let id = parse_uuid("account_id", &account_id)?;
    record_account_query("by_id", state.storage.backend_name());
    let account = state
        .storage
        .find_by_id(id)
        .await?
        .ok_or_else(|| StorageError::not_found("Account", id.to_string()))?;
    Ok(Json(account.into()))
}
