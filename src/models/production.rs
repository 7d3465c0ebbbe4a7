use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::machine::MachineRecord;
use crate::models::operator::OperatorRef;
use crate::models::product::{ProductRecord, TreeDesignRecord};

/// One shift submission with its joined entities. Relationships are optional
/// because the referenced rows may have been deleted since the insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub shift: String,
    pub machine: Option<MachineRecord>,
    pub operator: Option<OperatorRef>,
    /// Set when the submitting operator worked the shift as an assistant.
    pub is_assistant: bool,
    #[serde(default)]
    pub assistants: Vec<OperatorRef>,
    #[serde(default)]
    pub details: Vec<ProductionDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

impl ProductionRecord {
    pub fn operator_id(&self) -> Option<i64> {
        self.operator.as_ref().map(|operator| operator.id)
    }

    /// The operator submitted this record in the primary (scored) role.
    pub fn is_primary_for(&self, operator_id: i64) -> bool {
        !self.is_assistant && self.operator_id() == Some(operator_id)
    }

    pub fn is_assistant_for(&self, operator_id: i64) -> bool {
        (self.is_assistant && self.operator_id() == Some(operator_id))
            || self
                .assistants
                .iter()
                .any(|assistant| assistant.id == operator_id)
    }

    pub fn category(&self) -> Option<&str> {
        self.machine.as_ref().and_then(MachineRecord::category_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionDetail {
    pub id: i64,
    pub product: Option<ProductRecord>,
    pub design: Option<TreeDesignRecord>,
    pub quantity: f64,
    /// Percentage stored when the line was submitted.
    pub compliance_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionCreateInput {
    pub date: String,
    pub shift: String,
    pub machine_id: i64,
    pub operator_id: i64,
    #[serde(default)]
    pub is_assistant: bool,
    #[serde(default)]
    pub assistant_ids: Vec<i64>,
    pub details: Vec<ProductionDetailInput>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionDetailInput {
    pub product_id: i64,
    #[serde(default)]
    pub design_id: Option<i64>,
    pub quantity: f64,
}
