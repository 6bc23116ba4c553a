use common_http_errors::ApiError;
use tracing::warn;

use crate::extractors::ACCESS_TOKEN_COOKIE;
use crate::roles::EmployeeRole;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    MissingRole { required: EmployeeRole },
}

impl From<GuardError> for ApiError {
    fn from(value: GuardError) -> Self {
        match value {
            // Insufficient role is reported as 401 against the access token.
            GuardError::MissingRole { required } => ApiError::unauthorized(format!(
                "you don't have the required role to perform this action. required role: {required}"
            ))
            .with_location(["cookies", ACCESS_TOKEN_COOKIE]),
        }
    }
}

pub fn ensure_role(held: &[EmployeeRole], required: EmployeeRole) -> Result<(), GuardError> {
    if held.contains(&required) {
        return Ok(());
    }
    warn!(required = %required, roles = ?held, "role_check_failed");
    Err(GuardError::MissingRole { required })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common_http_errors::ErrorKind;

    #[test]
    fn ensure_role_accepts_member() {
        let held = [EmployeeRole::ViewMenuItems, EmployeeRole::ManageMenuItems];
        assert!(ensure_role(&held, EmployeeRole::ManageMenuItems).is_ok());
    }

    #[test]
    fn ensure_role_rejects_missing_role_as_unauthorized() {
        let held = [EmployeeRole::ViewMenuItems];
        let err = ensure_role(&held, EmployeeRole::ManageMenuItems).expect_err("missing role");
        assert_eq!(
            err,
            GuardError::MissingRole {
                required: EmployeeRole::ManageMenuItems
            }
        );
        let api = ApiError::from(err);
        assert_eq!(api.kind(), ErrorKind::Unauthorized);
        assert!(api.message().ends_with("manage menu items"));
    }

    #[test]
    fn empty_role_set_never_passes() {
        assert!(ensure_role(&[], EmployeeRole::ViewEmployees).is_err());
    }
}
