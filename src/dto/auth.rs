use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by identity-service bearer tokens.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}
