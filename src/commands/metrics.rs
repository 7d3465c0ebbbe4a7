use serde::Deserialize;

use crate::models::metrics::{DailyMetric, OperatorMetricsSummary, RollupDenominator};
use crate::models::session::Session;
use crate::utils::dates::DateRange;

use super::{require_role, require_session, run_blocking, AppState, CommandError, CommandResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    /// Defaults to the signed-in operator.
    #[serde(default)]
    pub cedula: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub denominator: Option<RollupDenominator>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingQuery {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub denominator: Option<RollupDenominator>,
}

pub async fn metrics_summary_fetch(
    state: &AppState,
    query: MetricsQuery,
) -> CommandResult<OperatorMetricsSummary> {
    let session = require_session(state)?;
    let cedula = resolve_cedula(&session, query.cedula.as_deref())?;
    let range = DateRange::parse(&query.from, &query.to).map_err(CommandError::from)?;
    let denominator = query.denominator.unwrap_or(RollupDenominator::WorkedDays);

    let metrics = state.metrics();
    run_blocking(move || match denominator {
        RollupDenominator::WorkedDays => metrics.monthly_summary(&cedula, &range),
        RollupDenominator::ExpectedWorkingDays => metrics.monthly_bonus_summary(&cedula, &range),
    })
    .await
}

pub async fn metrics_daily_fetch(
    state: &AppState,
    query: MetricsQuery,
) -> CommandResult<Vec<DailyMetric>> {
    Ok(metrics_summary_fetch(state, query).await?.daily)
}

/// Self-service lookup by cedula, always over worked days.
pub async fn metrics_compliance_lookup(
    state: &AppState,
    cedula: String,
    from: String,
    to: String,
) -> CommandResult<OperatorMetricsSummary> {
    let session = require_session(state)?;
    let cedula = resolve_cedula(&session, Some(&cedula))?;
    let range = DateRange::parse(&from, &to).map_err(CommandError::from)?;

    let metrics = state.metrics();
    run_blocking(move || metrics.compliance_by_cedula(&cedula, &range)).await
}

pub async fn metrics_ranking_fetch(
    state: &AppState,
    query: RankingQuery,
) -> CommandResult<Vec<OperatorMetricsSummary>> {
    let session = require_session(state)?;
    require_role(&session, |role| role.can_view_all_metrics(), "ver el ranking de operarios")?;
    let range = DateRange::parse(&query.from, &query.to).map_err(CommandError::from)?;
    let denominator = query.denominator.unwrap_or(RollupDenominator::WorkedDays);

    let metrics = state.metrics();
    run_blocking(move || metrics.summaries_for_all(&range, denominator)).await
}

/// Operators only see their own numbers; admins may ask for anyone.
fn resolve_cedula(session: &Session, requested: Option<&str>) -> CommandResult<String> {
    match requested.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(session.cedula.clone()),
        Some(cedula) if cedula == session.cedula => Ok(cedula.to_string()),
        Some(cedula) => {
            require_role(
                session,
                |role| role.can_view_all_metrics(),
                "consultar métricas de otros operarios",
            )?;
            Ok(cedula.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::operator::Role;

    fn session(role: Role) -> Session {
        Session {
            id: "s".into(),
            operator_id: 1,
            cedula: "111".into(),
            full_name: "Juan Pérez".into(),
            role,
            issued_at: "2024-03-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn operators_default_to_their_own_cedula() {
        assert_eq!(resolve_cedula(&session(Role::Operator), None).unwrap(), "111");
        assert_eq!(resolve_cedula(&session(Role::Operator), Some(" 111 ")).unwrap(), "111");
    }

    #[test]
    fn only_admins_read_other_operators() {
        let err = resolve_cedula(&session(Role::Operator), Some("222")).unwrap_err();
        assert_eq!(err.code, "FORBIDDEN");
        let err = resolve_cedula(&session(Role::Clerk), Some("222")).unwrap_err();
        assert_eq!(err.code, "FORBIDDEN");
        assert_eq!(resolve_cedula(&session(Role::Admin), Some("222")).unwrap(), "222");
    }
}
