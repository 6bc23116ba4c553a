//! Category and group endpoints, shared by the menu and the inventory
//! catalogs. Each catalog names its collections and the roles that guard them.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common_auth::EmployeeRole;
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::{doc, oid::ObjectId, Document};
use common_store::{Operation, UpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::app::AppState;
use crate::gate::CurrentEmployee;
use crate::records::{
    apply_update, exists, fetch_by_id, fetch_many, insert_stamped, load_from_path, name_pattern,
    parse_object_id, payload,
};
use crate::validation;

pub trait Catalog: Send + Sync + 'static {
    const LABEL: &'static str;
    const CATEGORIES: &'static str;
    const GROUPS: &'static str;
    const ITEMS: &'static str;
    const VIEW_ROLE: EmployeeRole;
    const MANAGE_ROLE: EmployeeRole;
}

pub struct Menu;

impl Catalog for Menu {
    const LABEL: &'static str = "menu";
    const CATEGORIES: &'static str = "menu_categories";
    const GROUPS: &'static str = "menu_groups";
    const ITEMS: &'static str = "menu_items";
    const VIEW_ROLE: EmployeeRole = EmployeeRole::ViewMenuItems;
    const MANAGE_ROLE: EmployeeRole = EmployeeRole::ManageMenuItems;
}

pub struct Inventory;

impl Catalog for Inventory {
    const LABEL: &'static str = "inventory";
    const CATEGORIES: &'static str = "inventory_categories";
    const GROUPS: &'static str = "inventory_groups";
    const ITEMS: &'static str = "inventory_items";
    const VIEW_ROLE: EmployeeRole = EmployeeRole::ViewInventoryItems;
    const MANAGE_ROLE: EmployeeRole = EmployeeRole::ManageInventoryItems;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    /// Hex id of the owning category.
    pub category: String,
}

#[derive(Debug, Deserialize)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    pub name: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GroupQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

pub fn category_routes<C: Catalog>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories::<C>).post(create_category::<C>))
        .route(
            "/:category_id",
            get(get_category::<C>).patch(update_category::<C>),
        )
}

pub fn group_routes<C: Catalog>() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups::<C>).post(create_group::<C>))
        .route("/:group_id", get(get_group::<C>).patch(update_group::<C>))
}

pub async fn create_category<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewCategory>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(C::MANAGE_ROLE)?;
    let Json(new_category) = payload_result?;
    let name = validation::name(&new_category.name, ["request body", "name"])?;

    if exists(state.store(), C::CATEGORIES, doc! { "name": &name }).await? {
        return Err(ApiError::duplicated_entry("this category already exists")
            .with_location(["request body", "name"]));
    }

    let id = insert_stamped(state.store(), C::CATEGORIES, doc! { "name": name }, &by).await?;
    info!(catalog = C::LABEL, category_id = %id, "category created");
    let category = fetch_by_id::<Category>(state.store(), C::CATEGORIES, id)
        .await?
        .ok_or_else(|| ApiError::operation_failed(format!("problem while creating {} category", C::LABEL)))?;
    Ok((StatusCode::CREATED, Json(payload("category", &category)?)))
}

pub async fn list_categories<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<CategoryQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(C::VIEW_ROLE)?;
    let Query(query) = query?;

    let mut filter = Document::new();
    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        filter.insert("name", name_pattern(name.trim()));
    }
    let page = state.page(query.limit, query.skip);
    let categories = fetch_many::<Category>(state.store(), C::CATEGORIES, filter, page).await?;
    Ok(Json(payload("categories", &categories)?))
}

pub async fn get_category<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(category_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(C::VIEW_ROLE)?;
    let category = load_from_path::<Category>(
        state.store(),
        C::CATEGORIES,
        &category_id,
        "category_id",
        "category",
    )
    .await?;
    Ok(Json(payload("category", &category)?))
}

pub async fn update_category<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(category_id): Path<String>,
    payload_result: Result<Json<CategoryUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(C::MANAGE_ROLE)?;
    let Json(update) = payload_result?;
    let category = load_from_path::<Category>(
        state.store(),
        C::CATEGORIES,
        &category_id,
        "category_id",
        "category",
    )
    .await?;

    let Some(name) = update.name else {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    };
    let name = validation::name(&name, ["request body", "name"])?;
    let duplicate = doc! { "name": &name, "_id": { "$ne": category.id } };
    if exists(state.store(), C::CATEGORIES, duplicate).await? {
        return Err(ApiError::duplicated_entry("this category already exists")
            .with_location(["request body", "name"]));
    }

    let request = UpdateRequest::set().field("name", name);
    apply_update(
        state.store(),
        C::CATEGORIES,
        category.id,
        &request,
        &by,
        "problem while updating category",
    )
    .await?;

    let category = load_from_path::<Category>(
        state.store(),
        C::CATEGORIES,
        &category_id,
        "category_id",
        "category",
    )
    .await?;
    Ok(Json(payload("category", &category)?))
}

/// Validates a category reference from a request body and checks it exists.
async fn require_category<C: Catalog>(state: &AppState, category: &str) -> ApiResult<ObjectId> {
    let id = parse_object_id(category, ["request body", "category"])?;
    if fetch_by_id::<Category>(state.store(), C::CATEGORIES, id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found(format!("no category was found with {id} id"))
            .with_location(["request body", "category"]));
    }
    Ok(id)
}

/// Validates a group reference from a request body and checks it exists.
pub(crate) async fn require_group<C: Catalog>(state: &AppState, group: &str) -> ApiResult<ObjectId> {
    let id = parse_object_id(group, ["request body", "group"])?;
    if fetch_by_id::<Group>(state.store(), C::GROUPS, id)
        .await?
        .is_none()
    {
        return Err(ApiError::not_found(format!("no group was found with {id} id"))
            .with_location(["request body", "group"]));
    }
    Ok(id)
}

pub async fn create_group<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    payload_result: Result<Json<NewGroup>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let by = current.require(C::MANAGE_ROLE)?;
    let Json(new_group) = payload_result?;
    let name = validation::name(&new_group.name, ["request body", "name"])?;
    let category = require_category::<C>(&state, &new_group.category).await?.to_hex();

    let duplicate = doc! { "name": &name, "category": &category };
    if exists(state.store(), C::GROUPS, duplicate).await? {
        return Err(ApiError::duplicated_entry("this group already exists")
            .with_location(["request body", "name"]));
    }

    let document = doc! { "name": name, "category": category };
    let id = insert_stamped(state.store(), C::GROUPS, document, &by).await?;
    info!(catalog = C::LABEL, group_id = %id, "group created");
    let group = fetch_by_id::<Group>(state.store(), C::GROUPS, id)
        .await?
        .ok_or_else(|| ApiError::operation_failed(format!("problem while creating {} group", C::LABEL)))?;
    Ok((StatusCode::CREATED, Json(payload("group", &group)?)))
}

pub async fn list_groups<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    query: Result<Query<GroupQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    current.require(C::VIEW_ROLE)?;
    let Query(query) = query?;

    let mut filter = Document::new();
    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        filter.insert("name", name_pattern(name.trim()));
    }
    if let Some(category) = query.category.as_deref() {
        let id = parse_object_id(category, ["query parameter", "category"])?;
        filter.insert("category", id.to_hex());
    }
    let page = state.page(query.limit, query.skip);
    let groups = fetch_many::<Group>(state.store(), C::GROUPS, filter, page).await?;
    Ok(Json(payload("groups", &groups)?))
}

pub async fn get_group<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(group_id): Path<String>,
) -> ApiResult<Json<Value>> {
    current.require(C::VIEW_ROLE)?;
    let group =
        load_from_path::<Group>(state.store(), C::GROUPS, &group_id, "group_id", "group").await?;
    Ok(Json(payload("group", &group)?))
}

pub async fn update_group<C: Catalog>(
    State(state): State<AppState>,
    current: CurrentEmployee,
    Path(group_id): Path<String>,
    payload_result: Result<Json<GroupUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let by = current.require(C::MANAGE_ROLE)?;
    let Json(update) = payload_result?;
    let group =
        load_from_path::<Group>(state.store(), C::GROUPS, &group_id, "group_id", "group").await?;

    let mut fields = Document::new();
    if let Some(name) = update.name.as_deref() {
        fields.insert("name", validation::name(name, ["request body", "name"])?);
    }
    if let Some(category) = update.category.as_deref() {
        fields.insert("category", require_category::<C>(&state, category).await?.to_hex());
    }
    if fields.is_empty() {
        return Err(ApiError::unprocessable("no field to update was given")
            .with_location(["request body"]));
    }

    let name = fields.get_str("name").unwrap_or(&group.data.name).to_owned();
    let category = fields
        .get_str("category")
        .unwrap_or(&group.data.category)
        .to_owned();
    let duplicate = doc! { "name": name, "category": category, "_id": { "$ne": group.id } };
    if exists(state.store(), C::GROUPS, duplicate).await? {
        return Err(ApiError::duplicated_entry("this group already exists")
            .with_location(["request body", "name"]));
    }

    let request = UpdateRequest::from_document(Operation::Set, fields);
    apply_update(
        state.store(),
        C::GROUPS,
        group.id,
        &request,
        &by,
        "problem while updating group",
    )
    .await?;

    let group =
        load_from_path::<Group>(state.store(), C::GROUPS, &group_id, "group_id", "group").await?;
    Ok(Json(payload("group", &group)?))
}
