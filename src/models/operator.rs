use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Operator,
    Admin,
    Clerk,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Admin => "admin",
            Role::Clerk => "clerk",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "operator" | "operario" => Ok(Role::Operator),
            "admin" | "administrador" => Ok(Role::Admin),
            "clerk" | "digitador" => Ok(Role::Clerk),
            other => Err(AppError::validation(format!("rol desconocido: {other}"))),
        }
    }

    pub fn can_export(&self) -> bool {
        matches!(self, Role::Admin | Role::Clerk)
    }

    pub fn can_view_all_metrics(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRecord {
    pub id: i64,
    pub cedula: String,
    pub full_name: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct OperatorCreateInput {
    pub cedula: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

/// Lightweight operator reference carried by joined production rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct OperatorRef {
    pub id: i64,
    pub full_name: String,
}
