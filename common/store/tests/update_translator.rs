use common_store::bson::{doc, oid::ObjectId, Bson};
use common_store::{
    find_by_id, update_and_stamp, update_one, DocumentStore, MemoryStore, Page, StoreError,
    UpdateRequest,
};

async fn seed_employee(store: &MemoryStore, roles: &[&str]) -> ObjectId {
    store
        .insert_one(
            "employees",
            doc! { "first_name": "abebe", "phone_number": "+251911000000", "roles": roles.to_vec() },
        )
        .await
        .expect("insert")
}

async fn roles_of(store: &MemoryStore, id: ObjectId) -> Vec<String> {
    let document = find_by_id(store, "employees", id)
        .await
        .expect("lookup")
        .expect("document exists");
    document
        .get_array("roles")
        .expect("roles array")
        .iter()
        .filter_map(Bson::as_str)
        .map(str::to_owned)
        .collect()
}

#[tokio::test]
async fn pull_removes_every_listed_value_and_keeps_the_rest() {
    let store = MemoryStore::new();
    let id = seed_employee(&store, &["a", "b", "issue"]).await;

    let request = UpdateRequest::remove().values("roles", ["a", "b"]);
    let modified = update_one(&store, "employees", id, &request).await.expect("update");

    assert!(modified);
    assert_eq!(roles_of(&store, id).await, vec!["issue".to_string()]);
}

#[tokio::test]
async fn push_then_pull_restores_the_original_roles() {
    let store = MemoryStore::new();
    let id = seed_employee(&store, &["view issue"]).await;
    let before = roles_of(&store, id).await;

    let push = UpdateRequest::append_unique().values("roles", ["a"]);
    assert!(update_one(&store, "employees", id, &push).await.expect("push"));
    assert_eq!(roles_of(&store, id).await, vec!["view issue", "a"]);

    let pull = UpdateRequest::remove().values("roles", ["a"]);
    assert!(update_one(&store, "employees", id, &pull).await.expect("pull"));
    assert_eq!(roles_of(&store, id).await, before);
}

#[tokio::test]
async fn append_unique_never_duplicates_roles() {
    let store = MemoryStore::new();
    let id = seed_employee(&store, &["issue"]).await;

    let push = UpdateRequest::append_unique().values("roles", ["issue"]);
    let modified = update_one(&store, "employees", id, &push).await.expect("push");

    assert!(!modified);
    assert_eq!(roles_of(&store, id).await, vec!["issue".to_string()]);
}

#[tokio::test]
async fn repeating_an_identical_set_reports_no_modification() {
    let store = MemoryStore::new();
    let id = store
        .insert_one("menu_items", doc! { "name": "burger", "price": 250.0 })
        .await
        .expect("insert");

    let request = UpdateRequest::set().field("name", "pizza");
    assert!(update_one(&store, "menu_items", id, &request).await.expect("first"));
    assert!(!update_one(&store, "menu_items", id, &request).await.expect("second"));
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() {
    let store = MemoryStore::new();
    let request = UpdateRequest::set().field("name", "pizza");

    let err = update_one(&store, "menu_items", ObjectId::new(), &request)
        .await
        .expect_err("missing document");
    assert!(matches!(err, StoreError::NotFound { collection } if collection == "menu_items"));
}

#[tokio::test]
async fn stamp_is_written_only_after_a_real_change() {
    let store = MemoryStore::new();
    let id = store
        .insert_one("menu_items", doc! { "name": "pizza" })
        .await
        .expect("insert");
    let request = UpdateRequest::set().field("name", "pizza");

    let modified = update_and_stamp(
        &store,
        "menu_items",
        id,
        &request,
        doc! { "updated_by": "someone" },
    )
    .await
    .expect("update");

    assert!(!modified);
    let stored = find_by_id(&store, "menu_items", id).await.unwrap().unwrap();
    assert!(stored.get("updated_by").is_none());

    let rename = UpdateRequest::set().field("name", "margherita");
    assert!(update_and_stamp(&store, "menu_items", id, &rename, doc! { "updated_by": "someone" })
        .await
        .expect("rename"));
    let stored = find_by_id(&store, "menu_items", id).await.unwrap().unwrap();
    assert_eq!(stored.get_str("updated_by").unwrap(), "someone");
}

#[tokio::test]
async fn find_many_applies_filter_and_page() {
    let store = MemoryStore::new();
    for name in ["pizza", "pasta", "salad", "pizza bianca"] {
        store
            .insert_one("menu_items", doc! { "name": name })
            .await
            .expect("insert");
    }

    let filter = doc! { "name": { "$regex": common_store::match_all_regex("pz") } };
    let found = store
        .find_many("menu_items", filter.clone(), Page::new(25, 0))
        .await
        .expect("find");
    assert_eq!(found.len(), 2);

    let second = store
        .find_many("menu_items", filter, Page::new(1, 1))
        .await
        .expect("find page");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].get_str("name").unwrap(), "pizza bianca");

    assert_eq!(store.count("menu_items", doc! {}).await.unwrap(), 4);
}
