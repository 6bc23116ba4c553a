use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header::SET_COOKIE, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use common_auth::{
    hash_password, verify_password, CookiePolicy, EmployeeRole, IssuedToken, RefreshContext,
    TokenSubject, ACCESS_TOKEN_COOKIE, LOGGED_IN_COOKIE, REFRESH_TOKEN_COOKIE,
};
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{doc, oid::ObjectId, Bson};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::accounts::{self, Account, Customer, Employee};
use crate::app::AppState;
use crate::gate::{CurrentEmployee, CurrentUser};
use crate::records::{insert_stamped, payload, success};
use crate::validation;

const REFRESH_LOCATION: [&str; 2] = ["cookies", REFRESH_TOKEN_COOKIE];

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

fn active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct NewEmployee {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub phone_number: String,
    #[serde(default)]
    pub roles: Vec<EmployeeRole>,
    #[serde(default = "active")]
    pub is_active: bool,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct NewCustomer {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub nationality: String,
    pub passport_number: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone_number: String,
    #[serde(default = "active")]
    pub is_active: bool,
    pub password: String,
}

pub fn employee_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_employee))
        .route("/login", post(login::<Employee>))
        .route("/refresh_token", get(refresh_token::<Employee>))
        .route("/logout", get(logout::<Employee>))
}

pub fn customer_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_customer))
        .route("/login", post(login::<Customer>))
        .route("/refresh_token", get(refresh_token::<Customer>))
        .route("/logout", get(logout::<Customer>))
}

pub async fn register_employee(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewEmployee>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(Employee::MANAGE_ROLE)?;
    let Json(new_employee) = payload_result?;

    let phone_number =
        validation::phone_number(&new_employee.phone_number, ["request body", "phone_number"])?;
    validation::pin_code(&new_employee.password, ["request body", "password"])?;
    ensure_phone_number_free::<Employee>(&state, &phone_number).await?;

    let mut roles: Vec<EmployeeRole> = Vec::with_capacity(new_employee.roles.len());
    for role in new_employee.roles {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    let document = doc! {
        "first_name": validation::name(&new_employee.first_name, ["request body", "first_name"])?,
        "last_name": lowercase_optional(new_employee.last_name),
        "phone_number": phone_number,
        "roles": roles.iter().map(|role| role.as_str()).collect::<Vec<_>>(),
        "is_active": new_employee.is_active,
        "password": hash_password(&new_employee.password)?,
    };
    let id = insert_stamped(state.store(), Employee::COLLECTION, document, &by).await?;
    info!(employee_id = %id, created_by = %by, "employee registered");

    respond_created::<Employee>(&state, id, "problem while registering employee.").await
}

pub async fn register_customer(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewCustomer>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(Customer::MANAGE_ROLE)?;
    let Json(new_customer) = payload_result?;

    let phone_number =
        validation::phone_number(&new_customer.phone_number, ["request body", "phone_number"])?;
    validation::pin_code(&new_customer.password, ["request body", "password"])?;
    let email = new_customer
        .email
        .as_deref()
        .map(|email| validation::email(email, ["request body", "email"]))
        .transpose()?;
    ensure_phone_number_free::<Customer>(&state, &phone_number).await?;

    let document = doc! {
        "first_name": validation::name(&new_customer.first_name, ["request body", "first_name"])?,
        "last_name": lowercase_optional(new_customer.last_name),
        "nationality": new_customer.nationality.trim().to_lowercase(),
        "passport_number": new_customer.passport_number.trim(),
        "email": email,
        "phone_number": phone_number,
        "is_active": new_customer.is_active,
        "password": hash_password(&new_customer.password)?,
    };
    let id = insert_stamped(state.store(), Customer::COLLECTION, document, &by).await?;
    info!(customer_id = %id, created_by = %by, "customer registered");

    respond_created::<Customer>(&state, id, "problem while registering customer.").await
}

pub async fn login<A: Account>(
    State(state): State<AppState>,
    payload_result: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(HeaderMap, Json<Value>)> {
    let Json(login) = payload_result?;
    let label = A::KIND.as_str();

    let Some(account) =
        accounts::find_by_phone_number::<A>(state.store(), login.phone_number.trim()).await?
    else {
        state.record_login_metric(label, "unknown_phone_number");
        warn!(account = label, "login rejected: unknown phone number");
        return Err(ApiError::not_found(format!("no {label} with this phone number."))
            .with_location(["request body", "phone_number"]));
    };

    if !account.data.is_active() {
        state.record_login_metric(label, "deactivated");
        warn!(account = label, subject = %account.id, "login rejected: deactivated");
        return Err(ApiError::unauthorized("this user is deactivated")
            .with_location(["request body", "phone_number"]));
    }

    if !verify_password(&login.password, account.data.password_digest()) {
        state.record_login_metric(label, "invalid_credentials");
        warn!(account = label, subject = %account.id, "login rejected: wrong password");
        return Err(
            ApiError::not_found("invalid/incorrect phone number or password")
                .with_location(["request body", "password/phone_number"]),
        );
    }

    let subject = TokenSubject::new(account.id.to_hex(), A::KIND);
    let jwt = &state.config.jwt;
    let access = state.token_signer.issue_access(&subject, jwt.access_ttl)?;
    let refresh = state.token_signer.issue_refresh(&subject, jwt.refresh_ttl)?;

    let mut headers = HeaderMap::new();
    set_session_cookies(&mut headers, &state.config.cookies, &access, Some(&refresh))?;

    state.record_login_metric(label, "success");
    info!(account = label, subject = %account.id, "login succeeded");

    let mut body = payload(label, &account)?;
    body["access_token"] = Value::String(access.token);
    body["refresh_token"] = Value::String(refresh.token);
    Ok((headers, Json(body)))
}

pub async fn refresh_token<A: Account>(
    State(state): State<AppState>,
    refresh: RefreshContext,
) -> ApiResult<(HeaderMap, Json<Value>)> {
    let label = A::KIND.as_str();
    if refresh.claims.account != A::KIND {
        return Err(ApiError::unauthorized(format!(
            "refresh token does not belong to a {label} account"
        ))
        .with_location(REFRESH_LOCATION));
    }

    let id = ObjectId::parse_str(&refresh.claims.subject).map_err(|_| {
        ApiError::unprocessable("invalid/incorrect refresh token content")
            .with_location(REFRESH_LOCATION)
    })?;

    let account = accounts::find_by_id::<A>(state.store(), id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("this {label} no longer exists"))
                .with_location(REFRESH_LOCATION)
        })?;
    if !account.data.is_active() {
        return Err(ApiError::unauthorized("this user is deactivated").with_location(REFRESH_LOCATION));
    }

    let subject = TokenSubject::new(id.to_hex(), A::KIND);
    let access = state
        .token_signer
        .issue_access(&subject, state.config.jwt.access_ttl)?;

    let mut headers = HeaderMap::new();
    set_session_cookies(&mut headers, &state.config.cookies, &access, None)?;
    info!(account = label, subject = %id, "access token refreshed");

    let mut body = success();
    body["access_token"] = Value::String(access.token);
    Ok((headers, Json(body)))
}

pub async fn logout<A: Account>(
    State(state): State<AppState>,
    current: CurrentUser<A>,
) -> ApiResult<(HeaderMap, Json<Value>)> {
    let policy = &state.config.cookies;
    let mut headers = HeaderMap::new();
    headers.append(SET_COOKIE, policy.expire(ACCESS_TOKEN_COOKIE, true, 0)?);
    headers.append(SET_COOKIE, policy.expire(REFRESH_TOKEN_COOKIE, true, 0)?);
    headers.append(SET_COOKIE, policy.expire(LOGGED_IN_COOKIE, false, -1)?);
    info!(account = A::KIND.as_str(), subject = %current.id, "logged out");
    Ok((headers, Json(success())))
}

/// Appends the access cookie, the optional refresh cookie, and the
/// script-visible `logged_in` marker.
fn set_session_cookies(
    headers: &mut HeaderMap,
    policy: &CookiePolicy,
    access: &IssuedToken,
    refresh: Option<&IssuedToken>,
) -> ApiResult<()> {
    headers.append(
        SET_COOKIE,
        policy.render(ACCESS_TOKEN_COOKIE, &access.token, access.expires_in, true)?,
    );
    if let Some(refresh) = refresh {
        headers.append(
            SET_COOKIE,
            policy.render(REFRESH_TOKEN_COOKIE, &refresh.token, refresh.expires_in, true)?,
        );
    }
    headers.append(
        SET_COOKIE,
        policy.render(LOGGED_IN_COOKIE, "True", access.expires_in, false)?,
    );
    Ok(())
}

async fn ensure_phone_number_free<A: Account>(state: &AppState, phone_number: &str) -> ApiResult<()> {
    if accounts::phone_number_taken::<A>(state.store(), phone_number, None).await? {
        return Err(ApiError::duplicated_entry(format!(
            "{} with this phone number={phone_number} already exists. try logging in.",
            A::KIND.as_str()
        ))
        .with_location(["request body", "phone_number"]));
    }
    Ok(())
}

async fn respond_created<A: Account>(
    state: &AppState,
    id: ObjectId,
    failure: &str,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let stored = accounts::find_by_id::<A>(state.store(), id)
        .await?
        .ok_or_else(|| ApiError::operation_failed(failure))?;
    Ok((StatusCode::CREATED, Json(payload(A::KIND.as_str(), &stored)?)))
}

fn lowercase_optional(value: Option<String>) -> Bson {
    match value.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty()) {
        Some(value) => Bson::String(value),
        None => Bson::Null,
    }
}
