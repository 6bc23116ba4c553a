use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common_auth::{ensure_role, AuthContext, Claims, EmployeeRole, ACCESS_TOKEN_COOKIE};
use common_http_errors::{ApiError, ApiResult};
use common_store::bson::oid::ObjectId;
use common_store::DocumentStore;
use tracing::debug;

use crate::accounts::{self, Account, Customer, Employee};
use crate::app::AppState;
use crate::records::Stored;

const TOKEN_LOCATION: [&str; 2] = ["cookies", ACCESS_TOKEN_COOKIE];

/// Active account resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct CurrentUser<A> {
    pub id: ObjectId,
    pub account: Stored<A>,
}

pub type CurrentEmployee = CurrentUser<Employee>;
pub type CurrentCustomer = CurrentUser<Customer>;

impl CurrentUser<Employee> {
    /// Passes only when the employee holds `role`; returns the subject id.
    pub fn require(&self, role: EmployeeRole) -> ApiResult<ObjectId> {
        ensure_role(&self.account.data.roles, role)?;
        Ok(self.id)
    }
}

/// Resolves token claims to an active account of kind `A`.
///
/// A token minted for the other account kind is unauthorized, a subject that
/// is not an ObjectId is unprocessable, and a missing or deactivated account
/// is not found.
pub async fn require_user<A: Account>(
    store: &dyn DocumentStore,
    claims: &Claims,
) -> ApiResult<CurrentUser<A>> {
    if claims.account != A::KIND {
        return Err(ApiError::unauthorized(format!(
            "access token does not belong to a {} account",
            A::KIND.as_str()
        ))
        .with_location(TOKEN_LOCATION));
    }

    let id = ObjectId::parse_str(&claims.subject).map_err(|_| {
        ApiError::unprocessable("invalid/incorrect access token content")
            .with_location(TOKEN_LOCATION)
    })?;

    match accounts::find_by_id::<A>(store, id).await? {
        Some(account) if account.data.is_active() => {
            debug!(subject = %id, account = A::KIND.as_str(), "request authenticated");
            Ok(CurrentUser { id, account })
        }
        _ => Err(ApiError::not_found(format!(
            "{} not found or deactivated",
            A::KIND.as_str()
        ))
        .with_location(TOKEN_LOCATION)),
    }
}

#[async_trait]
impl<A: Account> FromRequestParts<AppState> for CurrentUser<A> {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthContext::from_request_parts(parts, state).await?;
        require_user::<A>(state.store(), &auth.claims).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common_auth::{AccountKind, TokenType};
    use common_http_errors::ErrorKind;
    use common_store::bson::doc;
    use common_store::MemoryStore;

    fn claims(subject: &str, account: AccountKind) -> Claims {
        Claims {
            subject: subject.to_owned(),
            account,
            token_type: TokenType::Access,
            expires_at: Utc::now(),
            issued_at: None,
        }
    }

    async fn seed(store: &MemoryStore, roles: &[&str], is_active: bool) -> ObjectId {
        store
            .insert_one(
                accounts::EMPLOYEES,
                doc! {
                    "first_name": "kebede",
                    "phone_number": "+251911000002",
                    "password": "digest",
                    "roles": roles.to_vec(),
                    "is_active": is_active,
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn active_employee_with_role_passes() {
        let store = MemoryStore::new();
        let id = seed(&store, &["manage menu items"], true).await;

        let employee = require_user::<Employee>(&store, &claims(&id.to_hex(), AccountKind::Employee))
            .await
            .unwrap();
        assert_eq!(employee.require(EmployeeRole::ManageMenuItems).unwrap(), id);
    }

    #[tokio::test]
    async fn deactivated_employee_is_not_found() {
        let store = MemoryStore::new();
        let id = seed(&store, &["manage menu items"], false).await;

        let err = require_user::<Employee>(&store, &claims(&id.to_hex(), AccountKind::Employee))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn missing_role_is_unauthorized_at_the_access_cookie() {
        let store = MemoryStore::new();
        let id = seed(&store, &["view menu items"], true).await;

        let employee = require_user::<Employee>(&store, &claims(&id.to_hex(), AccountKind::Employee))
            .await
            .unwrap();
        let err = employee.require(EmployeeRole::ManageMenuItems).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        let body = serde_json::to_value(err.body()).unwrap();
        assert_eq!(body["errors"][0]["type"], "unauthorized");
        assert_eq!(
            body["errors"][0]["location"],
            serde_json::json!(["cookies", "access_token"])
        );
    }

    #[tokio::test]
    async fn malformed_subject_is_unprocessable() {
        let store = MemoryStore::new();
        let err = require_user::<Employee>(&store, &claims("not-an-id", AccountKind::Employee))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnprocessableValue);
    }

    #[tokio::test]
    async fn customer_token_never_resolves_an_employee() {
        let store = MemoryStore::new();
        let id = seed(&store, &["manage employees"], true).await;

        let err = require_user::<Employee>(&store, &claims(&id.to_hex(), AccountKind::Customer))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }
}
