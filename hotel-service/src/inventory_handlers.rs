use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{doc, Document};
use common_store::{Operation, UpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::catalog::{self, require_group, Catalog, Inventory};
use crate::gate::CurrentEmployee;
use crate::records::{
    apply_update, exists, fetch_by_id, fetch_many, insert_stamped, load_from_path, name_pattern,
    parse_object_id, payload, Stored,
};
use crate::units::{is_same_measurement_type, MeasurementUnit};
use crate::validation;

/// A stocked ingredient or supply. `cost` is per one `unit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub name: String,
    pub group: String,
    pub unit: MeasurementUnit,
    pub quantity: f64,
    pub minimum_quantity: f64,
    pub average_life_expectancy: f64,
    pub cost: f64,
}

#[derive(Debug, Deserialize)]
pub struct NewInventoryItem {
    pub name: String,
    pub group: String,
    pub unit: MeasurementUnit,
    pub quantity: f64,
    pub minimum_quantity: f64,
    pub average_life_expectancy: f64,
    pub cost: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryItemUpdate {
    pub name: Option<String>,
    pub group: Option<String>,
    pub unit: Option<MeasurementUnit>,
    pub quantity: Option<f64>,
    pub minimum_quantity: Option<f64>,
    pub average_life_expectancy: Option<f64>,
    pub cost: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct InventoryItemQuery {
    pub name: Option<String>,
    pub group: Option<String>,
    pub running_low: Option<bool>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .nest("/category", catalog::category_routes::<Inventory>())
        .nest("/group", catalog::group_routes::<Inventory>())
        .nest(
            "/item",
            Router::new()
                .route("/", get(list_items).post(create_item))
                .route("/:item_id", get(get_item).patch(update_item)),
        )
}

pub async fn create_item(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewInventoryItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(Inventory::MANAGE_ROLE)?;
    let Json(new_item) = payload_result?;
    let name = validation::name(&new_item.name, ["request body", "name"])?;
    let quantity = validation::non_negative(new_item.quantity, ["request body", "quantity"])?;
    let minimum_quantity =
        validation::non_negative(new_item.minimum_quantity, ["request body", "minimum_quantity"])?;
    let average_life_expectancy = validation::non_negative(
        new_item.average_life_expectancy,
        ["request body", "average_life_expectancy"],
    )?;
    let cost = validation::non_negative(new_item.cost, ["request body", "cost"])?;
    let group = require_group::<Inventory>(&state, &new_item.group).await?.to_hex();

    let unit = new_item.unit.as_str();
    if exists(
        state.store(),
        Inventory::ITEMS,
        doc! { "name": &name, "group": &group, "unit": unit },
    )
    .await?
    {
        return Err(ApiError::duplicated_entry("this item already exists")
            .with_location(["request body", "name"]));
    }

    let document = doc! {
        "name": name,
        "group": group,
        "unit": unit,
        "quantity": quantity,
        "minimum_quantity": minimum_quantity,
        "average_life_expectancy": average_life_expectancy,
        "cost": cost,
    };
    let id = insert_stamped(state.store(), Inventory::ITEMS, document, &by).await?;
    info!(item_id = %id, created_by = %by, "inventory item created");
    let item = fetch_by_id::<InventoryItem>(state.store(), Inventory::ITEMS, id)
        .await?
        .ok_or_else(|| ApiError::operation_failed("problem while creating inventory item"))?;
    Ok((StatusCode::CREATED, Json(payload("item", &item)?)))
}

pub async fn list_items(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<InventoryItemQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(Inventory::VIEW_ROLE)?;
    let Query(query) = query?;

    let mut filter = Document::new();
    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        filter.insert("name", name_pattern(name.trim()));
    }
    if let Some(group) = query.group.as_deref() {
        let id = parse_object_id(group, ["query parameter", "group"])?;
        filter.insert("group", id.to_hex());
    }
    if query.running_low == Some(true) {
        filter.insert("$expr", doc! { "$gte": ["$minimum_quantity", "$quantity"] });
    }
    let page = state.page(query.limit, query.skip);
    let items = fetch_many::<InventoryItem>(state.store(), Inventory::ITEMS, filter, page).await?;
    Ok(Json(payload("items", &items)?))
}

pub async fn get_item(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(Inventory::VIEW_ROLE)?;
    let item = load_item(&state, &item_id).await?;
    Ok(Json(payload("item", &item)?))
}

pub async fn update_item(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(item_id): Path<String>,
    payload_result: Result<Json<InventoryItemUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(Inventory::MANAGE_ROLE)?;
    let Json(update) = payload_result?;
    let item = load_item(&state, &item_id).await?;

    let mut fields = Document::new();
    if let Some(name) = update.name.as_deref() {
        fields.insert("name", validation::name(name, ["request body", "name"])?);
    }
    if let Some(group) = update.group.as_deref() {
        fields.insert("group", require_group::<Inventory>(&state, group).await?.to_hex());
    }
    if let Some(unit) = update.unit {
        fields.insert("unit", unit.as_str());
    }
    let amounts = [
        ("quantity", update.quantity),
        ("minimum_quantity", update.minimum_quantity),
        ("average_life_expectancy", update.average_life_expectancy),
        ("cost", update.cost),
    ];
    for (key, value) in amounts {
        if let Some(value) = value {
            fields.insert(key, validation::non_negative(value, ["request body", key])?);
        }
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    if ["name", "group", "unit"].iter().any(|key| fields.contains_key(key)) {
        let name = fields.get_str("name").unwrap_or(&item.data.name).to_owned();
        let group = fields.get_str("group").unwrap_or(&item.data.group).to_owned();
        let unit = fields.get_str("unit").unwrap_or(item.data.unit.as_str()).to_owned();
        let duplicate = doc! {
            "name": name,
            "group": group,
            "unit": unit,
            "_id": { "$ne": item.id },
        };
        if exists(state.store(), Inventory::ITEMS, duplicate).await? {
            return Err(ApiError::duplicated_entry("this item already exists")
                .with_location(["request body", "name"]));
        }
    }

    let request = UpdateRequest::from_document(Operation::Set, fields);
    apply_update(
        state.store(),
        Inventory::ITEMS,
        item.id,
        &request,
        &by,
        "problem while updating item",
    )
    .await?;

    let item = load_item(&state, &item_id).await?;
    Ok(Json(payload("item", &item)?))
}

async fn load_item(state: &AppState, item_id: &str) -> ApiResult<Stored<InventoryItem>> {
    load_from_path::<InventoryItem>(state.store(), Inventory::ITEMS, item_id, "item_id", "item")
        .await
}

/// Resolves an inventory item named in a request body or query.
pub(crate) async fn require_item(
    state: &AppState,
    raw_id: &str,
    location: [&str; 2],
) -> ApiResult<Stored<InventoryItem>> {
    let id = parse_object_id(raw_id, location)?;
    fetch_by_id::<InventoryItem>(state.store(), Inventory::ITEMS, id)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("no item found with an id={id}")).with_location(location)
        })
}

/// Purchases and issues must be counted in the same kind of unit as the item.
pub(crate) fn ensure_same_measurement(item: &InventoryItem, unit: MeasurementUnit) -> ApiResult<()> {
    if is_same_measurement_type(item.unit, unit) {
        Ok(())
    } else {
        Err(
            ApiError::unprocessable("the item is not measured with the same type of measurement.")
                .with_location(["request body", "unit"]),
        )
    }
}
