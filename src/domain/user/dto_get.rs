use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User view returned by `GET /api/users/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Realm role names in the order the identity service reports them
    pub roles: Vec<String>,
    /// Group names in the order the identity service reports them
    pub groups: Vec<String>,
}
