pub mod claims;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extractors;
pub mod guards;
pub mod password;
pub mod roles;
pub mod signer;
pub mod verifier;

pub use claims::{AccountKind, Claims, TokenSubject, TokenType};
pub use config::{decode_pem, parse_algorithm, JwtConfig};
pub use cookies::{CookiePolicy, CookieSameSite};
pub use error::{AuthError, AuthResult};
pub use extractors::{
    AuthContext, RefreshContext, ACCESS_TOKEN_COOKIE, LOGGED_IN_COOKIE, REFRESH_TOKEN_COOKIE,
};
pub use guards::{ensure_role, GuardError};
pub use password::{hash_password, verify_password};
pub use roles::EmployeeRole;
pub use signer::{IssuedToken, TokenSigner};
pub use verifier::JwtVerifier;
