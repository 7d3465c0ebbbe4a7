use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    General,
    /// Tied tree: always measured against its single general threshold.
    TreeTied,
    Tree,
    Ornament,
}

impl ProductKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::General => "general",
            ProductKind::TreeTied => "tree_tied",
            ProductKind::Tree => "tree",
            ProductKind::Ornament => "ornament",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim() {
            "general" => Ok(ProductKind::General),
            "tree_tied" => Ok(ProductKind::TreeTied),
            "tree" => Ok(ProductKind::Tree),
            "ornament" => Ok(ProductKind::Ornament),
            other => Err(AppError::validation(format!("tipo de producto desconocido: {other}"))),
        }
    }

    pub fn supports_designs(&self) -> bool {
        matches!(self, ProductKind::Tree | ProductKind::Ornament)
    }
}

impl Default for ProductKind {
    fn default() -> Self {
        ProductKind::General
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub kind: ProductKind,
    pub target_8h: Option<f64>,
    pub target_10h: Option<f64>,
    pub general_target: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductCreateInput {
    pub name: String,
    pub kind: ProductKind,
    pub target_8h: Option<f64>,
    pub target_10h: Option<f64>,
    pub general_target: Option<f64>,
}

/// Design variant of a tree or ornament product, with its own thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeDesignRecord {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub branch_level: Option<i64>,
    pub target_8h: Option<f64>,
    pub target_10h: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TreeDesignCreateInput {
    pub product_id: i64,
    pub name: String,
    pub branch_level: Option<i64>,
    pub target_8h: Option<f64>,
    pub target_10h: Option<f64>,
}
