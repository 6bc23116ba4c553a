//! Employee and customer documents and the lookups and mutations the gate
//! and the account routers run against them.

use common_auth::{AccountKind, EmployeeRole};
use common_http_errors::ApiResult;
use common_store::bson::{doc, oid::ObjectId, Document};
use common_store::{DocumentStore, Operation, UpdateRequest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::records::{apply_update, exists, fetch, fetch_by_id, Stored};

pub const EMPLOYEES: &str = "employees";
pub const CUSTOMERS: &str = "customers";

fn active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub phone_number: String,
    #[serde(default)]
    pub roles: Vec<EmployeeRole>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
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
    #[serde(default, skip_serializing)]
    pub password: String,
}

/// A collection of accounts that can log in.
pub trait Account: DeserializeOwned + Serialize + Send + Sync + 'static {
    const KIND: AccountKind;
    const COLLECTION: &'static str;
    /// Employee role needed to read other accounts of this kind.
    const VIEW_ROLE: EmployeeRole;
    /// Employee role needed to register or modify accounts of this kind.
    const MANAGE_ROLE: EmployeeRole;

    fn password_digest(&self) -> &str;
    fn is_active(&self) -> bool;
}

impl Account for Employee {
    const KIND: AccountKind = AccountKind::Employee;
    const COLLECTION: &'static str = EMPLOYEES;
    const VIEW_ROLE: EmployeeRole = EmployeeRole::ViewEmployees;
    const MANAGE_ROLE: EmployeeRole = EmployeeRole::ManageEmployees;

    fn password_digest(&self) -> &str {
        &self.password
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

impl Account for Customer {
    const KIND: AccountKind = AccountKind::Customer;
    const COLLECTION: &'static str = CUSTOMERS;
    const VIEW_ROLE: EmployeeRole = EmployeeRole::ViewCustomers;
    const MANAGE_ROLE: EmployeeRole = EmployeeRole::ManageCustomers;

    fn password_digest(&self) -> &str {
        &self.password
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}

pub async fn find_by_id<A: Account>(
    store: &dyn DocumentStore,
    id: ObjectId,
) -> ApiResult<Option<Stored<A>>> {
    fetch_by_id(store, A::COLLECTION, id).await
}

pub async fn find_by_phone_number<A: Account>(
    store: &dyn DocumentStore,
    phone_number: &str,
) -> ApiResult<Option<Stored<A>>> {
    fetch(store, A::COLLECTION, doc! { "phone_number": phone_number }).await
}

/// Whether another account than `except` already uses `phone_number`.
pub async fn phone_number_taken<A: Account>(
    store: &dyn DocumentStore,
    phone_number: &str,
    except: Option<ObjectId>,
) -> ApiResult<bool> {
    let mut filter = doc! { "phone_number": phone_number };
    if let Some(id) = except {
        filter.insert("_id", doc! { "$ne": id });
    }
    exists(store, A::COLLECTION, filter).await
}

pub async fn change_password<A: Account>(
    store: &dyn DocumentStore,
    id: ObjectId,
    digest: &str,
    by: &ObjectId,
) -> ApiResult<()> {
    let request = UpdateRequest::set().field("password", digest);
    apply_update(
        store,
        A::COLLECTION,
        id,
        &request,
        by,
        "problem while changing password",
    )
    .await
}

pub async fn set_active<A: Account>(
    store: &dyn DocumentStore,
    id: ObjectId,
    is_active: bool,
    by: &ObjectId,
) -> ApiResult<()> {
    let request = UpdateRequest::set().field("is_active", is_active);
    let failure = format!(
        "problem while {} {}",
        if is_active { "activating" } else { "deactivating" },
        A::KIND.as_str()
    );
    apply_update(store, A::COLLECTION, id, &request, by, &failure).await
}

/// Adds roles the employee does not hold yet.
pub async fn add_roles(
    store: &dyn DocumentStore,
    id: ObjectId,
    roles: &[EmployeeRole],
    by: &ObjectId,
) -> ApiResult<()> {
    let request = UpdateRequest::append_unique().values("roles", roles.iter().map(|r| r.as_str()));
    apply_update(store, EMPLOYEES, id, &request, by, "problem while adding roles").await
}

pub async fn remove_roles(
    store: &dyn DocumentStore,
    id: ObjectId,
    roles: &[EmployeeRole],
    by: &ObjectId,
) -> ApiResult<()> {
    let request = UpdateRequest::remove().values("roles", roles.iter().map(|r| r.as_str()));
    apply_update(store, EMPLOYEES, id, &request, by, "problem while removing roles").await
}

/// Applies a partial `$set` of profile fields.
pub async fn update_profile<A: Account>(
    store: &dyn DocumentStore,
    id: ObjectId,
    fields: Document,
    by: &ObjectId,
) -> ApiResult<()> {
    let request = UpdateRequest::from_document(Operation::Set, fields);
    let failure = format!("problem while updating {}", A::KIND.as_str());
    apply_update(store, A::COLLECTION, id, &request, by, &failure).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_http_errors::ErrorKind;
    use common_store::MemoryStore;

    async fn seed(store: &MemoryStore, roles: &[&str]) -> ObjectId {
        store
            .insert_one(
                EMPLOYEES,
                doc! {
                    "first_name": "almaz",
                    "phone_number": "+251911000001",
                    "password": "digest",
                    "roles": roles.to_vec(),
                    "is_active": true,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn employee_is_found_by_phone_number_and_id() {
        let store = MemoryStore::new();
        let id = seed(&store, &["issue"]).await;

        let by_phone = find_by_phone_number::<Employee>(&store, "+251911000001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_phone.id, id);
        assert_eq!(by_phone.data.roles, vec![EmployeeRole::Issue]);
        assert_eq!(by_phone.data.password_digest(), "digest");

        assert!(find_by_id::<Employee>(&store, ObjectId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn role_changes_go_through_the_translator() {
        let store = MemoryStore::new();
        let id = seed(&store, &["issue", "view issue"]).await;
        let by = ObjectId::new();

        add_roles(&store, id, &[EmployeeRole::Purchase, EmployeeRole::Issue], &by)
            .await
            .unwrap();
        let employee = find_by_id::<Employee>(&store, id).await.unwrap().unwrap();
        assert_eq!(
            employee.data.roles,
            vec![EmployeeRole::Issue, EmployeeRole::ViewIssue, EmployeeRole::Purchase]
        );
        assert_eq!(employee.audit.updated_by, Some(by.to_hex()));

        remove_roles(&store, id, &[EmployeeRole::Issue, EmployeeRole::ViewIssue], &by)
            .await
            .unwrap();
        let employee = find_by_id::<Employee>(&store, id).await.unwrap().unwrap();
        assert_eq!(employee.data.roles, vec![EmployeeRole::Purchase]);
    }

    #[tokio::test]
    async fn repeated_deactivation_is_an_operation_failure() {
        let store = MemoryStore::new();
        let id = seed(&store, &[]).await;
        let by = ObjectId::new();

        set_active::<Employee>(&store, id, false, &by).await.unwrap();
        let err = set_active::<Employee>(&store, id, false, &by).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OperationFailed);
        assert_eq!(err.message(), "problem while deactivating employee");
    }

    #[tokio::test]
    async fn phone_number_taken_ignores_the_excepted_account() {
        let store = MemoryStore::new();
        let id = seed(&store, &[]).await;

        assert!(phone_number_taken::<Employee>(&store, "+251911000001", None).await.unwrap());
        assert!(!phone_number_taken::<Employee>(&store, "+251911000001", Some(id)).await.unwrap());
        assert!(!phone_number_taken::<Customer>(&store, "+251911000001", None).await.unwrap());
    }
}
