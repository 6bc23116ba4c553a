use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use common_http_errors::{ApiError, ApiResult, Location};
use common_store::bson::{doc, oid::ObjectId, Document};
use common_store::{Operation, UpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::catalog::{self, require_group, Catalog, Menu};
use crate::gate::CurrentEmployee;
use crate::records::{
    apply_update, exists, fetch, fetch_by_id, fetch_many, insert_stamped, load_from_path,
    name_pattern, parse_object_id, payload, Stored,
};
use crate::validation;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    pub group: String,
    pub price: f64,
    #[serde(default)]
    pub is_accompaniment: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub accompaniments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    pub group: String,
    pub price: f64,
    #[serde(default)]
    pub is_accompaniment: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub accompaniments: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MenuItemUpdate {
    pub name: Option<String>,
    pub group: Option<String>,
    pub price: Option<f64>,
    pub is_accompaniment: Option<bool>,
    pub removed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MenuItemQuery {
    pub name: Option<String>,
    pub group: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

pub fn menu_routes() -> Router<AppState> {
    Router::new()
        .nest("/category", catalog::category_routes::<Menu>())
        .nest("/group", catalog::group_routes::<Menu>())
        .nest("/item", item_routes())
}

fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_items).post(create_item))
        .route("/:item_id", get(get_item).patch(update_item))
        .route("/add_accompaniments/:item_id", patch(add_accompaniments))
        .route("/remove_accompaniments/:item_id", patch(remove_accompaniments))
}

pub async fn create_item(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewMenuItem>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(Menu::MANAGE_ROLE)?;
    let Json(new_item) = payload_result?;
    let name = validation::name(&new_item.name, ["request body", "name"])?;
    let price = validation::non_negative(new_item.price, ["request body", "price"])?;
    let group = require_group::<Menu>(&state, &new_item.group).await?.to_hex();

    if exists(state.store(), Menu::ITEMS, doc! { "name": &name, "group": &group }).await? {
        return Err(ApiError::duplicated_entry("this item already exists")
            .with_location(["request body", "name"]));
    }
    let accompaniments = checked_accompaniments(&state, &new_item.accompaniments).await?;

    let document = doc! {
        "name": name,
        "group": group,
        "price": price,
        "is_accompaniment": new_item.is_accompaniment,
        "removed": new_item.removed,
        "accompaniments": accompaniments,
    };
    let id = insert_stamped(state.store(), Menu::ITEMS, document, &by).await?;
    info!(item_id = %id, created_by = %by, "menu item created");
    let item = fetch_by_id::<MenuItem>(state.store(), Menu::ITEMS, id)
        .await?
        .ok_or_else(|| ApiError::operation_failed("problem while creating menu item"))?;
    Ok((StatusCode::CREATED, Json(payload("item", &item)?)))
}

pub async fn list_items(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<MenuItemQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(Menu::VIEW_ROLE)?;
    let Query(query) = query?;

    let mut filter = Document::new();
    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        filter.insert("name", name_pattern(name.trim()));
    }
    if let Some(group) = query.group.as_deref() {
        let id = parse_object_id(group, ["query parameter", "group"])?;
        filter.insert("group", id.to_hex());
    }
    let page = state.page(query.limit, query.skip);
    let items = fetch_many::<MenuItem>(state.store(), Menu::ITEMS, filter, page).await?;
    Ok(Json(payload("items", &items)?))
}

pub async fn get_item(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(item_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(Menu::VIEW_ROLE)?;
    let item = load_item(&state, &item_id).await?;
    Ok(Json(payload("item", &item)?))
}

pub async fn update_item(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(item_id): Path<String>,
    payload_result: Result<Json<MenuItemUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(Menu::MANAGE_ROLE)?;
    let Json(update) = payload_result?;
    let item = load_item(&state, &item_id).await?;

    let mut fields = Document::new();
    if let Some(name) = update.name.as_deref() {
        fields.insert("name", validation::name(name, ["request body", "name"])?);
    }
    if let Some(group) = update.group.as_deref() {
        fields.insert("group", require_group::<Menu>(&state, group).await?.to_hex());
    }
    if let Some(price) = update.price {
        fields.insert("price", validation::non_negative(price, ["request body", "price"])?);
    }
    if let Some(is_accompaniment) = update.is_accompaniment {
        fields.insert("is_accompaniment", is_accompaniment);
    }
    if let Some(removed) = update.removed {
        fields.insert("removed", removed);
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    if fields.contains_key("name") || fields.contains_key("group") {
        let name = fields.get_str("name").unwrap_or(&item.data.name).to_owned();
        let group = fields.get_str("group").unwrap_or(&item.data.group).to_owned();
        let duplicate = doc! { "name": name, "group": group, "_id": { "$ne": item.id } };
        if exists(state.store(), Menu::ITEMS, duplicate).await? {
            return Err(ApiError::duplicated_entry("this item already exists")
                .with_location(["request body", "name"]));
        }
    }

    let request = UpdateRequest::from_document(Operation::Set, fields);
    apply_update(
        state.store(),
        Menu::ITEMS,
        item.id,
        &request,
        &by,
        "problem while updating item",
    )
    .await?;
    respond_item(&state, &item_id).await
}

pub async fn add_accompaniments(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(item_id): Path<String>,
    payload_result: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    change_accompaniments(state, current, item_id, payload_result, Operation::AppendUnique).await
}

pub async fn remove_accompaniments(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(item_id): Path<String>,
    payload_result: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    change_accompaniments(state, current, item_id, payload_result, Operation::Remove).await
}

async fn change_accompaniments(
    state: AppState,
    current: CurrentEmployee,
    item_id: String,
    payload_result: Result<Json<Vec<String>>, JsonRejection>,
    operation: Operation,
) -> ApiResult<Json<Value>> {
    let by = current.require(Menu::MANAGE_ROLE)?;
    let Json(accompaniments) = payload_result?;
    let item = load_item(&state, &item_id).await?;
    if accompaniments.is_empty() {
        return Err(ApiError::unprocessable("at least one accompaniment is required")
            .with_location(["request body"]));
    }
    let accompaniments = checked_accompaniments(&state, &accompaniments).await?;

    let request = UpdateRequest::new(operation).values("accompaniments", accompaniments);
    apply_update(
        state.store(),
        Menu::ITEMS,
        item.id,
        &request,
        &by,
        "problem while updating item",
    )
    .await?;
    info!(item_id = %item.id, operation = operation.as_str(), updated_by = %by, "accompaniments changed");
    respond_item(&state, &item_id).await
}

/// Every id must name an existing item flagged as an accompaniment. Returns
/// the ids as hex strings with duplicates dropped.
async fn checked_accompaniments(state: &AppState, ids: &[String]) -> ApiResult<Vec<String>> {
    let mut checked: Vec<String> = Vec::with_capacity(ids.len());
    for (index, raw) in ids.iter().enumerate() {
        let location = || {
            [
                Location::from("request body"),
                Location::from("accompaniments"),
                Location::Index(index),
            ]
        };
        let id = ObjectId::parse_str(raw.trim()).map_err(|_| {
            ApiError::unprocessable(format!("invalid item_id={raw}")).with_location(location())
        })?;
        let accompaniment = fetch::<MenuItem>(state.store(), Menu::ITEMS, doc! { "_id": id })
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("no menu item[accompaniment] found with id={id}"))
                    .with_location(location())
            })?;
        if !accompaniment.data.is_accompaniment {
            return Err(ApiError::unprocessable(format!(
                "this item [id={id}] can't be an accompaniment"
            ))
            .with_location(location()));
        }
        let hex = id.to_hex();
        if !checked.contains(&hex) {
            checked.push(hex);
        }
    }
    Ok(checked)
}

async fn load_item(state: &AppState, item_id: &str) -> ApiResult<Stored<MenuItem>> {
    load_from_path::<MenuItem>(state.store(), Menu::ITEMS, item_id, "item_id", "item").await
}

async fn respond_item(state: &AppState, item_id: &str) -> ApiResult<Json<Value>> {
    let item = load_item(state, item_id).await?;
    Ok(Json(payload("item", &item)?))
}
