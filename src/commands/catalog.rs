use crate::models::machine::MachineRecord;
use crate::models::operator::{OperatorCreateInput, OperatorRecord, Role};
use crate::models::product::{
    ProductCreateInput, ProductRecord, TreeDesignCreateInput, TreeDesignRecord,
};

use super::{require_role, require_session, run_blocking, AppState, CommandResult};

fn require_admin(state: &AppState, action: &str) -> CommandResult<()> {
    let session = require_session(state)?;
    require_role(&session, |role| *role == Role::Admin, action)
}

pub async fn operator_create(
    state: &AppState,
    input: OperatorCreateInput,
) -> CommandResult<OperatorRecord> {
    require_admin(state, "crear operarios")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.create_operator(input)).await
}

pub async fn operator_deactivate(state: &AppState, operator_id: i64) -> CommandResult<()> {
    require_admin(state, "desactivar operarios")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.deactivate_operator(operator_id)).await
}

pub async fn operators_list(state: &AppState) -> CommandResult<Vec<OperatorRecord>> {
    require_session(state)?;
    let catalog = state.catalog();
    run_blocking(move || catalog.list_operators()).await
}

pub async fn machine_create(
    state: &AppState,
    name: String,
    category: Option<String>,
) -> CommandResult<MachineRecord> {
    require_admin(state, "crear máquinas")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.create_machine(&name, category.as_deref())).await
}

pub async fn machine_delete(state: &AppState, machine_id: i64) -> CommandResult<()> {
    require_admin(state, "eliminar máquinas")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.delete_machine(machine_id)).await
}

pub async fn machines_list(state: &AppState) -> CommandResult<Vec<MachineRecord>> {
    require_session(state)?;
    let catalog = state.catalog();
    run_blocking(move || catalog.list_machines()).await
}

pub async fn product_create(
    state: &AppState,
    input: ProductCreateInput,
) -> CommandResult<ProductRecord> {
    require_admin(state, "crear productos")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.create_product(input)).await
}

pub async fn tree_design_create(
    state: &AppState,
    input: TreeDesignCreateInput,
) -> CommandResult<TreeDesignRecord> {
    require_admin(state, "crear diseños")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.create_tree_design(input)).await
}

pub async fn product_delete(state: &AppState, product_id: i64) -> CommandResult<()> {
    require_admin(state, "eliminar productos")?;
    let catalog = state.catalog();
    run_blocking(move || catalog.delete_product(product_id)).await
}

/// Available without a session, and only while the operators table is empty.
pub async fn admin_bootstrap(
    state: &AppState,
    cedula: String,
    full_name: String,
    password: String,
) -> CommandResult<OperatorRecord> {
    let catalog = state.catalog();
    run_blocking(move || catalog.bootstrap_admin(&cedula, &full_name, &password)).await
}
