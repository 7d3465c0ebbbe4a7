use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::db::repositories::operator_repository::{OperatorRepository, OperatorRow};
use crate::db::repositories::production_repository::ProductionRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::metrics::{BonusTier, DailyMetric, OperatorMetricsSummary, RollupDenominator};
use crate::models::operator::{OperatorRef, Role};
use crate::models::production::ProductionRecord;
use crate::services::targets::{evaluate_detail, ShiftLength};
use crate::utils::dates::{is_working_day, DateRange};

/// Compliance and bonus-tier computation per operator.
pub struct MetricsService {
    db: DbPool,
}

impl MetricsService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn daily_metrics(&self, operator_id: i64, range: &DateRange) -> AppResult<Vec<DailyMetric>> {
        let records = self
            .db
            .with_connection(|conn| ProductionRepository::list_for_operator(conn, operator_id, range))?;
        Ok(build_daily_metrics(&records, operator_id))
    }

    /// Mean over the days the operator actually worked.
    pub fn monthly_summary(&self, cedula: &str, range: &DateRange) -> AppResult<OperatorMetricsSummary> {
        self.summary_for_cedula(cedula, range, RollupDenominator::WorkedDays)
    }

    /// Mean over the fixed expected working-day count, as used for bonus pay.
    pub fn monthly_bonus_summary(
        &self,
        cedula: &str,
        range: &DateRange,
    ) -> AppResult<OperatorMetricsSummary> {
        self.summary_for_cedula(cedula, range, RollupDenominator::ExpectedWorkingDays)
    }

    /// Lookup used by the operator self-service screen.
    pub fn compliance_by_cedula(
        &self,
        cedula: &str,
        range: &DateRange,
    ) -> AppResult<OperatorMetricsSummary> {
        let cedula = cedula.trim();
        if cedula.is_empty() {
            return Err(AppError::validation("la cédula es obligatoria"));
        }
        self.monthly_summary(cedula, range)
    }

    /// Ranking of every active operator, best mean first.
    pub fn summaries_for_all(
        &self,
        range: &DateRange,
        denominator: RollupDenominator,
    ) -> AppResult<Vec<OperatorMetricsSummary>> {
        let (operators, records) = self.db.with_connection(|conn| {
            let operators = OperatorRepository::list_active(conn)?;
            let records = ProductionRepository::list_in_range(conn, range)?;
            Ok((operators, records))
        })?;

        let mut summaries = Vec::new();
        for row in operators {
            let operator = row.into_record()?;
            if operator.role != Role::Operator {
                continue;
            }
            let daily = build_daily_metrics(&records, operator.id);
            let assistant_days = count_assistant_days(&records, operator.id);
            summaries.push(summarize(
                OperatorRef {
                    id: operator.id,
                    full_name: operator.full_name,
                },
                operator.cedula,
                *range,
                daily,
                assistant_days,
                denominator,
            ));
        }

        summaries.sort_by(|a, b| {
            b.mean_percentage
                .partial_cmp(&a.mean_percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.operator.full_name.cmp(&b.operator.full_name))
        });

        info!(
            target: "app::metrics",
            operators = summaries.len(),
            start = %range.start(),
            end = %range.end(),
            "operator ranking computed"
        );
        Ok(summaries)
    }

    fn summary_for_cedula(
        &self,
        cedula: &str,
        range: &DateRange,
        denominator: RollupDenominator,
    ) -> AppResult<OperatorMetricsSummary> {
        let (operator, records) = self.db.with_connection(|conn| {
            let operator: OperatorRow = OperatorRepository::find_by_cedula(conn, cedula)?
                .ok_or_else(AppError::not_found)?;
            let records = ProductionRepository::list_for_operator(conn, operator.id, range)?;
            Ok((operator, records))
        })?;

        let daily = build_daily_metrics(&records, operator.id);
        let assistant_days = count_assistant_days(&records, operator.id);
        debug!(
            target: "app::metrics",
            operator_id = operator.id,
            records = records.len(),
            worked_days = daily.len(),
            assistant_days,
            "operator metrics computed"
        );

        Ok(summarize(
            OperatorRef {
                id: operator.id,
                full_name: operator.full_name,
            },
            operator.cedula,
            *range,
            daily,
            assistant_days,
            denominator,
        ))
    }
}

/// Per-day compliance from primary-role records; Sundays are dropped.
pub fn build_daily_metrics(records: &[ProductionRecord], operator_id: i64) -> Vec<DailyMetric> {
    let mut days: BTreeMap<chrono::NaiveDate, (f64, f64, f64)> = BTreeMap::new();

    for record in records
        .iter()
        .filter(|record| record.is_primary_for(operator_id) && is_working_day(record.date))
    {
        let shift = ShiftLength::from_label(&record.shift);
        let entry = days.entry(record.date).or_insert((0.0, 0.0, 0.0));
        for detail in &record.details {
            let (target, percentage) = evaluate_detail(detail, shift);
            entry.0 += detail.quantity;
            entry.1 += target.unwrap_or(0.0);
            entry.2 += percentage;
        }
    }

    days.into_iter()
        .map(|(date, (production, target, percentage))| DailyMetric {
            date,
            production,
            target,
            percentage,
            tier: BonusTier::classify(percentage),
        })
        .collect()
}

/// Distinct working days on which the operator only helped.
pub fn count_assistant_days(records: &[ProductionRecord], operator_id: i64) -> u32 {
    records
        .iter()
        .filter(|record| record.is_assistant_for(operator_id) && is_working_day(record.date))
        .map(|record| record.date)
        .collect::<BTreeSet<_>>()
        .len() as u32
}

pub fn summarize(
    operator: OperatorRef,
    cedula: String,
    range: DateRange,
    daily: Vec<DailyMetric>,
    assistant_days: u32,
    denominator: RollupDenominator,
) -> OperatorMetricsSummary {
    let worked_days = daily.len() as u32;
    let total: f64 = daily.iter().map(|day| day.percentage).sum();
    let divisor = denominator.divisor(worked_days);
    let mean_percentage = if divisor == 0 {
        0.0
    } else {
        total / divisor as f64
    };

    let count = |tier: BonusTier| daily.iter().filter(|day| day.tier == tier).count() as u32;
    let positive_days = count(BonusTier::Positive);
    let neutral_days = count(BonusTier::Neutral);
    let negative_days = count(BonusTier::Negative);

    OperatorMetricsSummary {
        operator,
        cedula,
        range,
        worked_days,
        assistant_days,
        positive_days,
        neutral_days,
        negative_days,
        mean_percentage,
        tier: BonusTier::classify(mean_percentage),
        denominator,
        daily,
    }
}
