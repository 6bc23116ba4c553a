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
use crate::units::MeasurementUnit;
use crate::validation;

pub const PURCHASES: &str = "purchases";

/// Stock bought for an inventory item. `price` is what was paid in total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub item: String,
    pub amount: f64,
    pub unit: MeasurementUnit,
    #[serde(with = "stored_datetime")]
    pub purchased_at: DateTime<Utc>,
    pub price: f64,
    pub purchased_by: String,
}

#[derive(Debug, Deserialize)]
pub struct NewPurchase {
    pub item: String,
    pub amount: f64,
    pub unit: MeasurementUnit,
    pub purchased_at: Option<DateTime<Utc>>,
    pub price: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseUpdate {
    pub item: Option<String>,
    pub amount: Option<f64>,
    pub unit: Option<MeasurementUnit>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub price: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseQuery {
    pub item: Option<String>,
    pub purchased_by: Option<String>,
    pub purchased_at_from: Option<DateTime<Utc>>,
    pub purchased_at_to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchases).post(create_purchase))
        .route("/:purchase_id", get(get_purchase).patch(update_purchase))
}

pub async fn create_purchase(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewPurchase>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(EmployeeRole::Purchase)?;
    let Json(new_purchase) = payload_result?;
    let amount = validation::positive(new_purchase.amount, ["request body", "amount"])?;
    let price = validation::non_negative(new_purchase.price, ["request body", "price"])?;
    let item = require_item(&state, &new_purchase.item, ["request body", "item"]).await?;
    ensure_same_measurement(&item.data, new_purchase.unit)?;

    let purchased_at = new_purchase.purchased_at.unwrap_or_else(Utc::now);
    let document = doc! {
        "item": item.id.to_hex(),
        "amount": amount,
        "unit": new_purchase.unit.as_str(),
        "purchased_at": bson::DateTime::from_chrono(purchased_at),
        "price": price,
        "purchased_by": by.to_hex(),
    };
    let id = insert_stamped(state.store(), PURCHASES, document, &by).await?;
    info!(purchase_id = %id, item_id = %item.id, purchased_by = %by, "purchase recorded");
    let purchase = fetch_by_id::<Purchase>(state.store(), PURCHASES, id)
        .await?
        .ok_or_else(|| ApiError::operation_failed("problem while purchasing item"))?;
    Ok((StatusCode::CREATED, Json(payload("purchase", &purchase)?)))
}

pub async fn list_purchases(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<PurchaseQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(EmployeeRole::ViewPurchase)?;
    let Query(query) = query?;

    let filter = purchase_filter(&query)?;
    let page = state.page(query.limit, query.skip);
    let purchases = fetch_many::<Purchase>(state.store(), PURCHASES, filter, page).await?;
    Ok(Json(payload("purchases", &purchases)?))
}

fn purchase_filter(query: &PurchaseQuery) -> ApiResult<Document> {
    let mut filter = Document::new();
    if let Some(item) = query.item.as_deref() {
        let id = parse_object_id(item, ["query parameter", "item"])?;
        filter.insert("item", id.to_hex());
    }
    if let Some(purchased_by) = query.purchased_by.as_deref() {
        let id = parse_object_id(purchased_by, ["query parameter", "purchased_by"])?;
        filter.insert("purchased_by", id.to_hex());
    }
    if let Some(range) = date_range(query.purchased_at_from, query.purchased_at_to) {
        filter.insert("purchased_at", range);
    }
    Ok(filter)
}

pub async fn get_purchase(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(purchase_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(EmployeeRole::ViewPurchase)?;
    let purchase = load_purchase(&state, &purchase_id).await?;
    Ok(Json(payload("purchase", &purchase)?))
}

pub async fn update_purchase(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(purchase_id): Path<String>,
    payload_result: Result<Json<PurchaseUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(EmployeeRole::UpdatePurchase)?;
    let Json(update) = payload_result?;
    let purchase = load_purchase(&state, &purchase_id).await?;

    let mut fields = Document::new();
    if let Some(amount) = update.amount {
        fields.insert("amount", validation::positive(amount, ["request body", "amount"])?);
    }
    if let Some(price) = update.price {
        fields.insert("price", validation::non_negative(price, ["request body", "price"])?);
    }
    if let Some(purchased_at) = update.purchased_at {
        fields.insert("purchased_at", bson::DateTime::from_chrono(purchased_at));
    }
    if update.item.is_some() || update.unit.is_some() {
        let item_id = update.item.as_deref().unwrap_or(&purchase.data.item);
        let item = require_item(&state, item_id, ["request body", "item"]).await?;
        let unit = update.unit.unwrap_or(purchase.data.unit);
        ensure_same_measurement(&item.data, unit)?;
        fields.insert("item", item.id.to_hex());
        fields.insert("unit", unit.as_str());
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    let request = UpdateRequest::from_document(Operation::Set, fields);
    apply_update(
        state.store(),
        PURCHASES,
        purchase.id,
        &request,
        &by,
        "problem while updating purchase",
    )
    .await?;

    let purchase = load_purchase(&state, &purchase_id).await?;
    Ok(Json(payload("purchase", &purchase)?))
}

async fn load_purchase(state: &AppState, purchase_id: &str) -> ApiResult<Stored<Purchase>> {
    load_from_path::<Purchase>(state.store(), PURCHASES, purchase_id, "purchase_id", "purchase")
        .await
}
