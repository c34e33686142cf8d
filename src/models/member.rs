//! Club member model matching the frontend UserResponse interface.

use serde::{Deserialize, Serialize};

/// A club member. Authentication and password lifecycle live in an external
/// collaborator; this backend only keeps the roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub is_admin: bool,
    /// Temporary members (guests) are excluded from the voting roster.
    pub is_temporary: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a new member.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_temporary: bool,
}
