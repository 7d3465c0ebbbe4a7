use crate::models::report::{ExportOutcome, ExportResult, ReportBucket, ReportParams};
use crate::utils::dates::DateRange;

use super::{require_role, require_session, run_blocking, AppState, CommandError, CommandResult};

pub async fn report_preview_fetch(
    state: &AppState,
    params: ReportParams,
) -> CommandResult<Vec<ReportBucket>> {
    let session = require_session(state)?;
    require_role(&session, |role| role.can_export(), "consultar reportes")?;
    // Range problems surface before any blocking work is scheduled.
    DateRange::parse(&params.from, &params.to).map_err(CommandError::from)?;

    let reports = state.reports();
    run_blocking(move || reports.build(&params).map(|(_, buckets)| buckets)).await
}

pub async fn report_export(state: &AppState, params: ReportParams) -> CommandResult<ExportOutcome> {
    let session = require_session(state)?;
    require_role(&session, |role| role.can_export(), "exportar reportes")?;
    DateRange::parse(&params.from, &params.to).map_err(CommandError::from)?;

    let reports = state.reports();
    run_blocking(move || reports.export(params)).await
}

pub async fn registration_pdf_export(state: &AppState, record_id: i64) -> CommandResult<ExportResult> {
    let session = require_session(state)?;
    require_role(&session, |role| role.can_export(), "imprimir registros")?;

    let reports = state.reports();
    run_blocking(move || reports.export_registration_pdf(record_id)).await
}
