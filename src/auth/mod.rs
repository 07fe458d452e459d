/// Authentication module
///
/// Token issuance and verification, password hashing, the per-request
/// authentication gate, request identity extractors, and login/logout.

mod claims;
mod gate;
mod identity;
mod jwt;
mod password;
mod service;

pub use claims::Claims;
pub use gate::{bearer_token, AuthenticationGate};
pub use identity::{AdminPrincipal, Authenticated, Principal, RequestIdentity};
pub use jwt::{TokenService, VerifiedToken};
pub use password::hash_password;
pub use password::hash_password_with_cost;
pub use password::verify_password;
pub use service::{AuthResponse, AuthService, UserDto};
