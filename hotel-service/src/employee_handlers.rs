use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use common_auth::EmployeeRole;
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{doc, Document};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::account_handlers::{
    activate, change_my_password, change_password_of, deactivate, get_account, load_target, me,
};
use crate::accounts::{self, Account, Employee};
use crate::app::AppState;
use crate::gate::CurrentEmployee;
use crate::records::{fetch_many, name_pattern, payload};
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeListQuery {
    /// Comma separated; an employee must hold every listed role.
    pub roles: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_employees))
        .route("/me", get(me::<Employee>))
        .route("/change_password", patch(change_my_password::<Employee>))
        .route("/:employee_id", get(get_account::<Employee>))
        .route(
            "/change_password/:employee_id",
            patch(change_password_of::<Employee>),
        )
        .route("/deactivate/:employee_id", patch(deactivate::<Employee>))
        .route("/activate/:employee_id", patch(activate::<Employee>))
        .route("/add_roles/:employee_id", patch(add_employee_roles))
        .route("/remove_roles/:employee_id", patch(remove_employee_roles))
        .route("/update/:employee_id", patch(update_employee))
}

pub async fn list_employees(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<EmployeeListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(EmployeeRole::ViewEmployees)?;
    let Query(query) = query?;

    let filter = employee_filter(&query)?;
    let page = state.page(query.limit, query.skip);
    let employees = fetch_many::<Employee>(state.store(), Employee::COLLECTION, filter, page).await?;
    Ok(Json(payload("employees", &employees)?))
}

fn employee_filter(query: &EmployeeListQuery) -> ApiResult<Document> {
    let mut filter = Document::new();
    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        let pattern = name_pattern(name.trim());
        filter.insert(
            "$or",
            vec![
                doc! { "first_name": pattern.clone() },
                doc! { "last_name": pattern },
            ],
        );
    }
    if let Some(phone_number) = query.phone_number.as_deref().filter(|p| !p.trim().is_empty()) {
        filter.insert("phone_number", name_pattern(phone_number.trim()));
    }
    if let Some(roles) = query.roles.as_deref() {
        let roles = parse_roles(roles)?;
        if !roles.is_empty() {
            let names: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
            filter.insert("roles", doc! { "$all": names });
        }
    }
    if let Some(is_active) = query.is_active {
        filter.insert("is_active", is_active);
    }
    Ok(filter)
}

fn parse_roles(value: &str) -> ApiResult<Vec<EmployeeRole>> {
    value
        .split(',')
        .filter(|item| !item.trim().is_empty())
        .map(|item| {
            EmployeeRole::from_str(item).map_err(|err| {
                ApiError::unprocessable(err.to_string()).with_location(["query parameter", "roles"])
            })
        })
        .collect()
}

pub async fn add_employee_roles(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(employee_id): Path<String>,
    payload_result: Result<Json<Vec<EmployeeRole>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(EmployeeRole::ManageEmployees)?;
    let Json(roles) = payload_result?;
    let employee = load_target::<Employee>(&state, &employee_id).await?;
    let roles = non_empty_roles(roles)?;

    accounts::add_roles(state.store(), employee.id, &roles, &by).await?;
    info!(employee_id = %employee.id, ?roles, updated_by = %by, "employee roles added");
    respond_employee(&state, &employee_id).await
}

pub async fn remove_employee_roles(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(employee_id): Path<String>,
    payload_result: Result<Json<Vec<EmployeeRole>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(EmployeeRole::ManageEmployees)?;
    let Json(roles) = payload_result?;
    let employee = load_target::<Employee>(&state, &employee_id).await?;
    let roles = non_empty_roles(roles)?;

    accounts::remove_roles(state.store(), employee.id, &roles, &by).await?;
    info!(employee_id = %employee.id, ?roles, updated_by = %by, "employee roles removed");
    respond_employee(&state, &employee_id).await
}

pub async fn update_employee(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(employee_id): Path<String>,
    payload_result: Result<Json<EmployeeUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(EmployeeRole::ManageEmployees)?;
    let Json(update) = payload_result?;
    let employee = load_target::<Employee>(&state, &employee_id).await?;

    let mut fields = Document::new();
    if let Some(first_name) = update.first_name {
        fields.insert(
            "first_name",
            validation::name(&first_name, ["request body", "first_name"])?,
        );
    }
    if let Some(last_name) = update.last_name {
        fields.insert("last_name", last_name.trim().to_lowercase());
    }
    if let Some(phone_number) = update.phone_number {
        let phone_number = validation::phone_number(&phone_number, ["request body", "phone_number"])?;
        if accounts::phone_number_taken::<Employee>(state.store(), &phone_number, Some(employee.id))
            .await?
        {
            return Err(ApiError::duplicated_entry(format!(
                "employee with this phone number={phone_number} already exists"
            ))
            .with_location(["request body", "phone_number"]));
        }
        fields.insert("phone_number", phone_number);
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    accounts::update_profile::<Employee>(state.store(), employee.id, fields, &by).await?;
    respond_employee(&state, &employee_id).await
}

fn non_empty_roles(roles: Vec<EmployeeRole>) -> ApiResult<Vec<EmployeeRole>> {
    let mut unique: Vec<EmployeeRole> = Vec::with_capacity(roles.len());
    for role in roles {
        if !unique.contains(&role) {
            unique.push(role);
        }
    }
    if unique.is_empty() {
        return Err(ApiError::unprocessable("at least one role is required")
            .with_location(["request body"]));
    }
    Ok(unique)
}

async fn respond_employee(state: &AppState, employee_id: &str) -> ApiResult<Json<Value>> {
    let employee = load_target::<Employee>(state, employee_id).await?;
    Ok(Json(payload("employee", &employee)?))
}
