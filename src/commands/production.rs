use crate::error::AppError;
use crate::models::production::{ProductionCreateInput, ProductionRecord};

use super::{require_session, run_blocking, AppState, CommandResult};

/// Operators may only submit their own shifts; admins and clerks record on
/// behalf of anyone.
pub async fn production_submit(
    state: &AppState,
    input: ProductionCreateInput,
) -> CommandResult<ProductionRecord> {
    let session = require_session(state)?;
    if !session.role.can_export() && input.operator_id != session.operator_id {
        return Err(AppError::forbidden("solo puede registrar su propia producción").into());
    }

    let production = state.production();
    run_blocking(move || production.submit(input)).await
}

pub async fn production_fetch(state: &AppState, record_id: i64) -> CommandResult<ProductionRecord> {
    require_session(state)?;
    let production = state.production();
    run_blocking(move || production.find(record_id)).await
}
