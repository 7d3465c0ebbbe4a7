//! Shift-target resolution and per-line compliance arithmetic shared by the
//! metrics and report pipelines.

use serde::{Deserialize, Serialize};

use crate::models::product::{ProductKind, ProductRecord, TreeDesignRecord};
use crate::models::production::ProductionDetail;

/// Shift label that selects the 10-hour thresholds. Matched exactly.
pub const TEN_HOUR_SHIFT_LABEL: &str = "10 horas";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ShiftLength {
    EightHours,
    TenHours,
}

impl ShiftLength {
    pub fn from_label(label: &str) -> Self {
        if label == TEN_HOUR_SHIFT_LABEL {
            ShiftLength::TenHours
        } else {
            ShiftLength::EightHours
        }
    }
}

/// Expected output for one line, or `None` when no usable threshold exists.
pub fn resolve_target(
    product: &ProductRecord,
    design: Option<&TreeDesignRecord>,
    shift: ShiftLength,
) -> Option<f64> {
    let target = if product.kind == ProductKind::TreeTied {
        product.general_target
    } else if let Some(design) = design {
        match shift {
            ShiftLength::EightHours => design.target_8h,
            ShiftLength::TenHours => design.target_10h,
        }
    } else {
        match shift {
            ShiftLength::EightHours => product.target_8h,
            ShiftLength::TenHours => product.target_10h,
        }
    };

    target.filter(|value| value.is_finite() && *value > 0.0)
}

pub fn compliance_percentage(produced: f64, target: Option<f64>) -> f64 {
    match target {
        Some(target) if target > 0.0 => produced / target * 100.0,
        _ => 0.0,
    }
}

/// Target and percentage for a stored detail line. Lines whose product was
/// deleted resolve to no target.
pub fn evaluate_detail(detail: &ProductionDetail, shift: ShiftLength) -> (Option<f64>, f64) {
    let target = detail
        .product
        .as_ref()
        .and_then(|product| resolve_target(product, detail.design.as_ref(), shift));
    (target, compliance_percentage(detail.quantity, target))
}
