use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::operator::OperatorRef;
use crate::utils::dates::DateRange;

pub const POSITIVE_TIER_THRESHOLD: f64 = 80.0;
pub const NEUTRAL_TIER_THRESHOLD: f64 = 50.0;
/// Working days a month is expected to have for bonus purposes.
pub const EXPECTED_WORKING_DAYS: u32 = 24;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BonusTier {
    Positive,
    Neutral,
    Negative,
}

impl BonusTier {
    /// Boundaries belong to the higher tier.
    pub fn classify(percentage: f64) -> Self {
        if percentage >= POSITIVE_TIER_THRESHOLD {
            BonusTier::Positive
        } else if percentage >= NEUTRAL_TIER_THRESHOLD {
            BonusTier::Neutral
        } else {
            BonusTier::Negative
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BonusTier::Positive => "Bonificación",
            BonusTier::Neutral => "Neutral",
            BonusTier::Negative => "Sin bonificación",
        }
    }
}

/// One operator on one working day, primary-role lines only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetric {
    pub date: NaiveDate,
    pub production: f64,
    pub target: f64,
    /// Sum of per-line percentages; may exceed 100 on multi-product days.
    pub percentage: f64,
    pub tier: BonusTier,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum RollupDenominator {
    /// Days the operator actually worked in the primary role.
    WorkedDays,
    /// Fixed `EXPECTED_WORKING_DAYS`, used by the bonus report.
    ExpectedWorkingDays,
}

impl RollupDenominator {
    pub fn divisor(&self, worked_days: u32) -> u32 {
        match self {
            RollupDenominator::WorkedDays => worked_days,
            RollupDenominator::ExpectedWorkingDays => EXPECTED_WORKING_DAYS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorMetricsSummary {
    pub operator: OperatorRef,
    pub cedula: String,
    pub range: DateRange,
    #[serde(default)]
    pub daily: Vec<DailyMetric>,
    pub worked_days: u32,
    pub assistant_days: u32,
    pub positive_days: u32,
    pub neutral_days: u32,
    pub negative_days: u32,
    pub mean_percentage: f64,
    pub tier: BonusTier,
    pub denominator: RollupDenominator,
}
