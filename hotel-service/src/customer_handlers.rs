use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use common_auth::EmployeeRole;
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{doc, Document};
use serde::Deserialize;
use serde_json::Value;

use crate::account_handlers::{
    activate, change_my_password, change_password_of, deactivate, get_account, load_target, me,
};
use crate::accounts::{self, Account, Customer};
use crate::app::AppState;
use crate::gate::CurrentEmployee;
use crate::records::{fetch_many, name_pattern, payload};
use crate::validation;

#[derive(Debug, Default, Deserialize)]
pub struct CustomerListQuery {
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub nationality: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub nationality: Option<String>,
    pub passport_number: Option<String>,
    pub phone_number: Option<String>,
}

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_customers))
        .route("/me", get(me::<Customer>))
        .route("/change_password", patch(change_my_password::<Customer>))
        .route("/:customer_id", get(get_account::<Customer>))
        .route(
            "/change_password/:customer_id",
            patch(change_password_of::<Customer>),
        )
        .route("/deactivate/:customer_id", patch(deactivate::<Customer>))
        .route("/activate/:customer_id", patch(activate::<Customer>))
        .route("/update/:customer_id", patch(update_customer))
}

pub async fn list_customers(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<CustomerListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(EmployeeRole::ViewCustomers)?;
    let Query(query) = query?;

    let page = state.page(query.limit, query.skip);
    let customers =
        fetch_many::<Customer>(state.store(), Customer::COLLECTION, customer_filter(&query), page)
            .await?;
    Ok(Json(payload("customers", &customers)?))
}

fn customer_filter(query: &CustomerListQuery) -> Document {
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
    if let Some(nationality) = query.nationality.as_deref().filter(|n| !n.trim().is_empty()) {
        filter.insert("nationality", name_pattern(nationality.trim()));
    }
    if let Some(is_active) = query.is_active {
        filter.insert("is_active", is_active);
    }
    filter
}

pub async fn update_customer(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(customer_id): Path<String>,
    payload_result: Result<Json<CustomerUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(EmployeeRole::ManageCustomers)?;
    let Json(update) = payload_result?;
    let customer = load_target::<Customer>(&state, &customer_id).await?;

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
    if let Some(email) = update.email {
        fields.insert("email", validation::email(&email, ["request body", "email"])?);
    }
    if let Some(nationality) = update.nationality {
        fields.insert(
            "nationality",
            validation::name(&nationality, ["request body", "nationality"])?,
        );
    }
    if let Some(passport_number) = update.passport_number {
        fields.insert("passport_number", passport_number.trim());
    }
    if let Some(phone_number) = update.phone_number {
        let phone_number = validation::phone_number(&phone_number, ["request body", "phone_number"])?;
        if accounts::phone_number_taken::<Customer>(state.store(), &phone_number, Some(customer.id))
            .await?
        {
            return Err(ApiError::duplicated_entry(format!(
                "customer with this phone number={phone_number} already exists"
            ))
            .with_location(["request body", "phone_number"]));
        }
        fields.insert("phone_number", phone_number);
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    accounts::update_profile::<Customer>(state.store(), customer.id, fields, &by).await?;
    let customer = load_target::<Customer>(&state, &customer_id).await?;
    Ok(Json(payload("customer", &customer)?))
}
