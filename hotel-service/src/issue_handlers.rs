//! Stock handed out of the store room. Each issue carries the cost of what
//! left, priced from the item's cost per unit at the time of issuing.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use common_auth::EmployeeRole;
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{self, doc, Document};
use common_store::{Operation, UpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::gate::CurrentEmployee;
use crate::inventory_handlers::{ensure_same_measurement, require_item};
use crate::records::{
    apply_update, date_range, fetch_by_id, fetch_many, insert_stamped, load_from_path,
    parse_object_id, payload, stored_datetime, Stored,
};
use crate::units::{issue_cost, MeasurementUnit};
use crate::validation;

pub const ISSUES: &str = "issues";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub item: String,
    pub amount: f64,
    pub unit: MeasurementUnit,
    #[serde(with = "stored_datetime")]
    pub issued_at: DateTime<Utc>,
    pub cost: f64,
    pub issued_by: String,
}

#[derive(Debug, Deserialize)]
pub struct NewIssue {
    pub item: String,
    pub amount: f64,
    pub unit: MeasurementUnit,
    pub issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueUpdate {
    pub item: Option<String>,
    pub amount: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub issued_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueQuery {
    pub item: Option<String>,
    pub issued_by: Option<String>,
    pub issued_at_from: Option<DateTime<Utc>>,
    pub issued_at_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

pub fn issue_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_issues).post(create_issue))
        .route("/:issue_id", get(get_issue).patch(update_issue))
}

pub async fn create_issue(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewIssue>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(EmployeeRole::Issue)?;
    let Json(new_issue) = payload_result?;
    let amount = validation::positive(new_issue.amount, ["request body", "amount"])?;
    let item = require_item(&state, &new_issue.item, ["request body", "item"]).await?;
    ensure_same_measurement(&item.data, new_issue.unit)?;

    let cost = issue_cost(item.data.cost, item.data.unit, amount, new_issue.unit);
    let issued_at = new_issue.issued_at.unwrap_or_else(Utc::now);
    let document = doc! {
        "item": item.id.to_hex(),
        "amount": amount,
        "unit": new_issue.unit.as_str(),
        "issued_at": bson::DateTime::from_chrono(issued_at),
        "cost": cost,
        "issued_by": by.to_hex(),
    };
    let id = insert_stamped(state.store(), ISSUES, document, &by).await?;
    info!(issue_id = %id, item_id = %item.id, cost, issued_by = %by, "item issued");
    let issue = fetch_by_id::<Issue>(state.store(), ISSUES, id)
        .await?
        .ok_or_else(|| ApiError::operation_failed("problem while issuing item"))?;
    Ok((StatusCode::CREATED, Json(payload("issue", &issue)?)))
}

pub async fn list_issues(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<IssueQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(EmployeeRole::ViewIssue)?;
    let Query(query) = query?;

    let filter = issue_filter(&query)?;
    let page = state.page(query.limit, query.skip);
    let issues = fetch_many::<Issue>(state.store(), ISSUES, filter, page).await?;
    Ok(Json(payload("issues", &issues)?))
}

fn issue_filter(query: &IssueQuery) -> ApiResult<Document> {
    let mut filter = Document::new();
    if let Some(item) = query.item.as_deref() {
        let id = parse_object_id(item, ["query parameter", "item"])?;
        filter.insert("item", id.to_hex());
    }
    if let Some(issued_by) = query.issued_by.as_deref() {
        let id = parse_object_id(issued_by, ["query parameter", "issued_by"])?;
        filter.insert("issued_by", id.to_hex());
    }
    if let Some(range) = date_range(query.issued_at_from, query.issued_at_to) {
        filter.insert("issued_at", range);
    }
    Ok(filter)
}

pub async fn get_issue(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(issue_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(EmployeeRole::ViewIssue)?;
    let issue = load_issue(&state, &issue_id).await?;
    Ok(Json(payload("issue", &issue)?))
}

pub async fn update_issue(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(issue_id): Path<String>,
    payload_result: Result<Json<IssueUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(EmployeeRole::UpdateIssue)?;
    let Json(update) = payload_result?;
    let issue = load_issue(&state, &issue_id).await?;

    let mut fields = Document::new();
    if let Some(issued_at) = update.issued_at {
        fields.insert("issued_at", bson::DateTime::from_chrono(issued_at));
    }
    if update.item.is_some() || update.amount.is_some() || update.unit.is_some() {
        let item_id = update.item.as_deref().unwrap_or(&issue.data.item);
        let item = require_item(&state, item_id, ["request body", "item"]).await?;
        let unit = update.unit.unwrap_or(issue.data.unit);
        ensure_same_measurement(&item.data, unit)?;
        let amount = match update.amount {
            Some(amount) => validation::positive(amount, ["request body", "amount"])?,
            None => issue.data.amount,
        };

        fields.insert("item", item.id.to_hex());
        fields.insert("amount", amount);
        fields.insert("unit", unit.as_str());
        fields.insert("cost", issue_cost(item.data.cost, item.data.unit, amount, unit));
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    let request = UpdateRequest::from_document(Operation::Set, fields);
    apply_update(
        state.store(),
        ISSUES,
        issue.id,
        &request,
        &by,
        "problem while updating issue",
    )
    .await?;

    let issue = load_issue(&state, &issue_id).await?;
    Ok(Json(payload("issue", &issue)?))
}

async fn load_issue(state: &AppState, issue_id: &str) -> ApiResult<Stored<Issue>> {
    load_from_path::<Issue>(state.store(), ISSUES, issue_id, "issue_id", "issue").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_has_no_conditions() {
        assert!(issue_filter(&IssueQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn window_bounds_both_ends() {
        let query = IssueQuery {
            issued_at_from: DateTime::<Utc>::from_timestamp(0, 0),
            issued_at_to: DateTime::<Utc>::from_timestamp(3600, 0),
            ..Default::default()
        };
        let filter = issue_filter(&query).unwrap();
        let window = filter.get_document("issued_at").unwrap();
        assert!(window.contains_key("$gte"));
        assert!(window.contains_key("$lte"));
    }
}
