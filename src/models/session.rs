use serde::{Deserialize, Serialize};

use crate::models::operator::Role;

/// Authenticated user, passed explicitly to role-gated operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub operator_id: i64,
    pub cedula: String,
    pub full_name: String,
    pub role: Role,
    pub issued_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub cedula: String,
    pub password: String,
}
