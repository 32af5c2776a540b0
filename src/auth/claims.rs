use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Marketplace roles carried in the token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

/// JWT payload. The core trusts `sub` and `role` verbatim; identity is the
/// auth collaborator's problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,     // user ID
    pub role: Role,    // ADMIN or USER
    pub iat: usize,    // issued at (unix timestamp)
    pub exp: usize,    // expires at (unix timestamp)
    pub iss: String,   // issuer
    pub aud: String,   // audience
}
