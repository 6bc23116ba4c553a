//! Handlers shared by the employee and customer account routers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use common_auth::{hash_password, verify_password};
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::accounts::{self, Account};
use crate::app::AppState;
use crate::gate::{CurrentEmployee, CurrentUser};
use crate::records::{parse_object_id, payload, success, Stored};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn me<A: Account>(current: CurrentUser<A>) -> ApiResult<Json<Value>> {
    Ok(Json(payload(A::KIND.as_str(), &current.account)?))
}

pub async fn change_my_password<A: Account>(
    State(state): State<AppState>,
    current: CurrentUser<A>,
    payload_result: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(request) = payload_result?;
    replace_password(&state, &current.account, request, &current.id).await
}

pub async fn get_account<A: Account>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(A::VIEW_ROLE)?;
    let account = load_target::<A>(&state, &account_id).await?;
    Ok(Json(payload(A::KIND.as_str(), &account)?))
}

pub async fn change_password_of<A: Account>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(account_id): Path<String>,
    payload_result: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(A::MANAGE_ROLE)?;
    let Json(request) = payload_result?;
    let account = load_target::<A>(&state, &account_id).await?;
    replace_password(&state, &account, request, &by).await
}

pub async fn deactivate<A: Account>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    toggle_active::<A>(state, current, account_id, false).await
}

pub async fn activate<A: Account>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(account_id): Path<String>,
) -> ApiResult<Json<Value>> {
    toggle_active::<A>(state, current, account_id, true).await
}

async fn toggle_active<A: Account>(
    state: AppState,
    current: CurrentEmployee,
    account_id: String,
    is_active: bool,
) -> ApiResult<Json<Value>> {
    let by = current.require(A::MANAGE_ROLE)?;
    let account = load_target::<A>(&state, &account_id).await?;
    accounts::set_active::<A>(state.store(), account.id, is_active, &by).await?;
    info!(
        account = A::KIND.as_str(),
        subject = %account.id,
        is_active,
        updated_by = %by,
        "account activation changed"
    );
    Ok(Json(success()))
}

/// Loads the account named by a path id, or 422/404 at that path parameter.
pub(crate) async fn load_target<A: Account>(
    state: &AppState,
    account_id: &str,
) -> ApiResult<Stored<A>> {
    let param = format!("{}_id", A::KIND.as_str());
    let id = parse_object_id(account_id, ["path parameter", param.as_str()])?;
    accounts::find_by_id::<A>(state.store(), id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("{} with id={id} not found", A::KIND.as_str()))
                .with_location(["path parameter", param.as_str()])
        })
}

async fn replace_password<A: Account>(
    state: &AppState,
    account: &Stored<A>,
    request: ChangePasswordRequest,
    by: &ObjectId,
) -> ApiResult<Json<Value>> {
    validation::pin_code(&request.new_password, ["request body", "new_password"])?;
    if !verify_password(&request.old_password, account.data.password_digest()) {
        return Err(ApiError::unauthorized("old password is incorrect")
            .with_location(["request body", "old_password"]));
    }

    let digest = hash_password(&request.new_password)?;
    accounts::change_password::<A>(state.store(), account.id, &digest, by).await?;
    info!(account = A::KIND.as_str(), subject = %account.id, updated_by = %by, "password changed");
    Ok(Json(success()))
}
