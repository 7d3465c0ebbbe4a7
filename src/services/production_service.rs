use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use crate::db::repositories::machine_repository::MachineRepository;
use crate::db::repositories::operator_repository::OperatorRepository;
use crate::db::repositories::product_repository::ProductRepository;
use crate::db::repositories::production_repository::{
    NewDetailRow, NewRecordRow, ProductionRepository,
};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::production::{ProductionCreateInput, ProductionRecord};
use crate::services::realtime::{ChangeFeed, ChangeKind, ChangeTable};
use crate::services::targets::{compliance_percentage, resolve_target, ShiftLength};
use crate::utils::dates::parse_date;

/// Write path behind the operator's shift form.
pub struct ProductionService {
    db: DbPool,
    feed: ChangeFeed,
}

impl ProductionService {
    pub fn new(db: DbPool, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub fn submit(&self, input: ProductionCreateInput) -> AppResult<ProductionRecord> {
        let record_date = parse_date(&input.date)?;
        let shift = input.shift.trim().to_string();
        if shift.is_empty() {
            return Err(AppError::validation("el turno es obligatorio"));
        }
        if input.details.is_empty() {
            return Err(AppError::validation(
                "el registro debe incluir al menos un producto",
            ));
        }
        if input
            .details
            .iter()
            .any(|detail| !detail.quantity.is_finite() || detail.quantity < 0.0)
        {
            return Err(AppError::validation(
                "las cantidades deben ser números no negativos",
            ));
        }
        if input.assistant_ids.contains(&input.operator_id) {
            return Err(AppError::validation(
                "el operario no puede figurar también como ayudante",
            ));
        }

        let shift_length = ShiftLength::from_label(&shift);
        let created_at = Utc::now().to_rfc3339();

        let record = self.db.with_connection(|conn| {
            MachineRepository::find_by_id(conn, input.machine_id)?
                .ok_or_else(|| AppError::validation("la máquina seleccionada no existe"))?;
            OperatorRepository::find_by_id(conn, input.operator_id)?
                .ok_or_else(|| AppError::validation("el operario seleccionado no existe"))?;

            let mut seen_assistants = HashSet::new();
            for assistant_id in &input.assistant_ids {
                if !seen_assistants.insert(*assistant_id) {
                    continue;
                }
                OperatorRepository::find_by_id(conn, *assistant_id)?
                    .ok_or_else(|| AppError::validation("un ayudante seleccionado no existe"))?;
            }

            let mut details = Vec::with_capacity(input.details.len());
            for line in &input.details {
                let product = ProductRepository::find_by_id(conn, line.product_id)?
                    .ok_or_else(|| AppError::validation("un producto seleccionado no existe"))?
                    .into_record()?;
                let design = match line.design_id {
                    Some(design_id) => {
                        let design = ProductRepository::find_design(conn, design_id)?
                            .ok_or_else(|| AppError::validation("el diseño seleccionado no existe"))?;
                        if design.product_id != product.id {
                            return Err(AppError::validation(
                                "el diseño no pertenece al producto indicado",
                            ));
                        }
                        Some(design)
                    }
                    None => None,
                };

                let target = resolve_target(&product, design.as_ref(), shift_length);
                if target.is_none() {
                    debug!(
                        target: "app::production",
                        product_id = product.id,
                        shift = %shift,
                        "no threshold configured, line scores zero"
                    );
                }
                details.push(NewDetailRow {
                    product_id: product.id,
                    tree_design_id: design.map(|design| design.id),
                    quantity: line.quantity,
                    compliance_pct: compliance_percentage(line.quantity, target),
                });
            }

            let row = NewRecordRow {
                record_date,
                shift: shift.clone(),
                machine_id: input.machine_id,
                operator_id: input.operator_id,
                is_assistant: input.is_assistant,
                notes: input
                    .notes
                    .as_deref()
                    .map(str::trim)
                    .filter(|notes| !notes.is_empty())
                    .map(str::to_string),
                created_at: created_at.clone(),
                assistant_ids: seen_assistants.into_iter().collect(),
                details,
            };

            let id = ProductionRepository::insert(conn, &row)?;
            ProductionRepository::find_by_id(conn, id)?.ok_or_else(AppError::not_found)
        })?;

        info!(
            target: "app::production",
            record_id = record.id,
            date = %record.date,
            lines = record.details.len(),
            "production record submitted"
        );
        self.feed.publish(
            ChangeTable::ProductionRecords,
            ChangeKind::Insert,
            Some(record.id),
        );

        Ok(record)
    }

    pub fn find(&self, record_id: i64) -> AppResult<ProductionRecord> {
        self.db
            .with_connection(|conn| ProductionRepository::find_by_id(conn, record_id))?
            .ok_or_else(AppError::not_found)
    }
}
