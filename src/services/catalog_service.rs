use chrono::Utc;
use tracing::info;

use crate::db::repositories::machine_repository::MachineRepository;
use crate::db::repositories::operator_repository::OperatorRepository;
use crate::db::repositories::product_repository::ProductRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::machine::MachineRecord;
use crate::models::operator::{OperatorCreateInput, OperatorRecord, Role};
use crate::models::product::{
    ProductCreateInput, ProductRecord, TreeDesignCreateInput, TreeDesignRecord,
};
use crate::services::realtime::{ChangeFeed, ChangeKind, ChangeTable};
use crate::utils::crypto::hash_password;

/// Master data: operators, machines, products and tree designs.
pub struct CatalogService {
    db: DbPool,
    feed: ChangeFeed,
}

impl CatalogService {
    pub fn new(db: DbPool, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    pub fn create_operator(&self, input: OperatorCreateInput) -> AppResult<OperatorRecord> {
        let cedula = input.cedula.trim();
        if cedula.is_empty() || !cedula.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::validation("la cédula debe contener solo dígitos"));
        }
        let full_name = input.full_name.trim();
        if full_name.is_empty() {
            return Err(AppError::validation("el nombre del operario es obligatorio"));
        }

        let password_hash = hash_password(&input.password)?;
        let created_at = Utc::now().to_rfc3339();

        let record = self.db.with_connection(|conn| {
            let id = OperatorRepository::insert(
                conn,
                cedula,
                full_name,
                input.role,
                &password_hash,
                &created_at,
            )?;
            OperatorRepository::find_by_id(conn, id)?
                .ok_or_else(AppError::not_found)?
                .into_record()
        })?;

        info!(target: "app::catalog", operator_id = record.id, role = record.role.as_str(), "operator created");
        self.feed
            .publish(ChangeTable::Operators, ChangeKind::Insert, Some(record.id));
        Ok(record)
    }

    /// First-run setup: creates the initial administrator, refused once any
    /// active operator exists.
    pub fn bootstrap_admin(
        &self,
        cedula: &str,
        full_name: &str,
        password: &str,
    ) -> AppResult<OperatorRecord> {
        let existing = self.db.with_connection(OperatorRepository::count_active)?;
        if existing > 0 {
            return Err(AppError::conflict("ya existen operarios registrados"));
        }
        self.create_operator(OperatorCreateInput {
            cedula: cedula.to_string(),
            full_name: full_name.to_string(),
            role: Role::Admin,
            password: password.to_string(),
        })
    }

    pub fn list_operators(&self) -> AppResult<Vec<OperatorRecord>> {
        self.db.with_connection(|conn| {
            OperatorRepository::list_active(conn)?
                .into_iter()
                .map(|row| row.into_record())
                .collect()
        })
    }

    pub fn deactivate_operator(&self, operator_id: i64) -> AppResult<()> {
        let updated = self
            .db
            .with_connection(|conn| OperatorRepository::set_active(conn, operator_id, false))?;
        if updated == 0 {
            return Err(AppError::not_found());
        }
        self.feed
            .publish(ChangeTable::Operators, ChangeKind::Update, Some(operator_id));
        Ok(())
    }

    pub fn create_machine(&self, name: &str, category: Option<&str>) -> AppResult<MachineRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("el nombre de la máquina es obligatorio"));
        }
        let category = category.map(str::trim).filter(|value| !value.is_empty());

        let record = self.db.with_connection(|conn| {
            let id = MachineRepository::insert(conn, name, category)?;
            Ok(MachineRepository::find_by_id(conn, id)?
                .ok_or_else(AppError::not_found)?
                .into_record())
        })?;

        self.feed
            .publish(ChangeTable::Machines, ChangeKind::Insert, Some(record.id));
        Ok(record)
    }

    pub fn list_machines(&self) -> AppResult<Vec<MachineRecord>> {
        self.db.with_connection(|conn| {
            Ok(MachineRepository::list(conn)?
                .into_iter()
                .map(|row| row.into_record())
                .collect())
        })
    }

    pub fn delete_machine(&self, machine_id: i64) -> AppResult<()> {
        let deleted = self
            .db
            .with_connection(|conn| MachineRepository::delete(conn, machine_id))?;
        if deleted == 0 {
            return Err(AppError::not_found());
        }
        self.feed
            .publish(ChangeTable::Machines, ChangeKind::Delete, Some(machine_id));
        Ok(())
    }

    pub fn create_product(&self, input: ProductCreateInput) -> AppResult<ProductRecord> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("el nombre del producto es obligatorio"));
        }
        for target in [input.target_8h, input.target_10h, input.general_target]
            .into_iter()
            .flatten()
        {
            if !target.is_finite() || target < 0.0 {
                return Err(AppError::validation("las metas deben ser números no negativos"));
            }
        }

        let record = self.db.with_connection(|conn| {
            let id = ProductRepository::insert(conn, &input)?;
            ProductRepository::find_by_id(conn, id)?
                .ok_or_else(AppError::not_found)?
                .into_record()
        })?;

        self.feed
            .publish(ChangeTable::Products, ChangeKind::Insert, Some(record.id));
        Ok(record)
    }

    pub fn create_tree_design(&self, input: TreeDesignCreateInput) -> AppResult<TreeDesignRecord> {
        if input.name.trim().is_empty() {
            return Err(AppError::validation("el nombre del diseño es obligatorio"));
        }

        let record = self.db.with_connection(|conn| {
            let product = ProductRepository::find_by_id(conn, input.product_id)?
                .ok_or_else(AppError::not_found)?
                .into_record()?;
            if !product.kind.supports_designs() {
                return Err(AppError::validation(format!(
                    "el producto {} no admite diseños",
                    product.name
                )));
            }
            let id = ProductRepository::insert_design(conn, &input)?;
            ProductRepository::find_design(conn, id)?.ok_or_else(AppError::not_found)
        })?;

        self.feed
            .publish(ChangeTable::Products, ChangeKind::Update, Some(record.product_id));
        Ok(record)
    }

    pub fn delete_product(&self, product_id: i64) -> AppResult<()> {
        let deleted = self
            .db
            .with_connection(|conn| ProductRepository::delete(conn, product_id))?;
        if deleted == 0 {
            return Err(AppError::not_found());
        }
        self.feed
            .publish(ChangeTable::Products, ChangeKind::Delete, Some(product_id));
        Ok(())
    }
}
