//! Authentication: bearer-token validation and role guards
//!
//! Token issuance (login, registration, password hashing) lives in the
//! auth service; this module only validates what it issued.

mod jwt;
mod middleware;

pub use jwt::{Claims, JwtManager};
pub use middleware::{require_auth, require_operator, AuthState, AuthUser, OPERATOR_ROLES};
