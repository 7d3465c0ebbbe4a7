use std::collections::HashMap;
use std::convert::TryFrom;

use chrono::NaiveDate;
use rusqlite::types::Value as SqlValue;
use rusqlite::{named_params, params_from_iter, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::machine::MachineRecord;
use crate::models::operator::OperatorRef;
use crate::models::product::{ProductKind, ProductRecord, TreeDesignRecord};
use crate::models::production::{ProductionDetail, ProductionRecord};
use crate::utils::dates::{to_iso, DateRange};

const CHILD_QUERY_CHUNK: usize = 500;

const RECORD_SELECT: &str = r#"
    SELECT
        r.id,
        r.record_date,
        r.shift,
        r.is_assistant,
        r.notes,
        r.created_at,
        m.id AS machine_id,
        m.name AS machine_name,
        m.category AS machine_category,
        o.id AS operator_id,
        o.full_name AS operator_name
    FROM production_records r
    LEFT JOIN machines m ON m.id = r.machine_id
    LEFT JOIN operators o ON o.id = r.operator_id
"#;

/// Detail line ready to insert, with its percentage already resolved.
#[derive(Debug, Clone)]
pub struct NewDetailRow {
    pub product_id: i64,
    pub tree_design_id: Option<i64>,
    pub quantity: f64,
    pub compliance_pct: f64,
}

#[derive(Debug, Clone)]
pub struct NewRecordRow {
    pub record_date: NaiveDate,
    pub shift: String,
    pub machine_id: i64,
    pub operator_id: i64,
    pub is_assistant: bool,
    pub notes: Option<String>,
    pub created_at: String,
    pub assistant_ids: Vec<i64>,
    pub details: Vec<NewDetailRow>,
}

#[derive(Debug, Clone)]
struct JoinedRecordRow {
    id: i64,
    record_date: String,
    shift: String,
    is_assistant: bool,
    notes: Option<String>,
    created_at: String,
    machine_id: Option<i64>,
    machine_name: Option<String>,
    machine_category: Option<String>,
    operator_id: Option<i64>,
    operator_name: Option<String>,
}

impl TryFrom<&Row<'_>> for JoinedRecordRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            record_date: row.get("record_date")?,
            shift: row.get("shift")?,
            is_assistant: row.get::<_, i64>("is_assistant")? != 0,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
            machine_id: row.get("machine_id")?,
            machine_name: row.get("machine_name")?,
            machine_category: row.get("machine_category")?,
            operator_id: row.get("operator_id")?,
            operator_name: row.get("operator_name")?,
        })
    }
}

impl JoinedRecordRow {
    fn into_record(self) -> AppResult<ProductionRecord> {
        let date = NaiveDate::parse_from_str(&self.record_date, "%Y-%m-%d").map_err(|_| {
            AppError::database(format!(
                "registro {} con fecha inválida: {}",
                self.id, self.record_date
            ))
        })?;

        let machine = match (self.machine_id, self.machine_name) {
            (Some(id), Some(name)) => Some(MachineRecord {
                id,
                name,
                category: self.machine_category,
            }),
            _ => None,
        };

        let operator = match (self.operator_id, self.operator_name) {
            (Some(id), Some(full_name)) => Some(OperatorRef { id, full_name }),
            _ => None,
        };

        Ok(ProductionRecord {
            id: self.id,
            date,
            shift: self.shift,
            machine,
            operator,
            is_assistant: self.is_assistant,
            assistants: Vec::new(),
            details: Vec::new(),
            notes: self.notes,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone)]
struct JoinedDetailRow {
    id: i64,
    record_id: i64,
    quantity: f64,
    compliance_pct: f64,
    product_id: Option<i64>,
    product_name: Option<String>,
    product_kind: Option<String>,
    product_target_8h: Option<f64>,
    product_target_10h: Option<f64>,
    product_general_target: Option<f64>,
    design_id: Option<i64>,
    design_product_id: Option<i64>,
    design_name: Option<String>,
    design_branch_level: Option<i64>,
    design_target_8h: Option<f64>,
    design_target_10h: Option<f64>,
}

impl TryFrom<&Row<'_>> for JoinedDetailRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            record_id: row.get("record_id")?,
            quantity: row.get("quantity")?,
            compliance_pct: row.get("compliance_pct")?,
            product_id: row.get("product_id")?,
            product_name: row.get("product_name")?,
            product_kind: row.get("product_kind")?,
            product_target_8h: row.get("product_target_8h")?,
            product_target_10h: row.get("product_target_10h")?,
            product_general_target: row.get("product_general_target")?,
            design_id: row.get("design_id")?,
            design_product_id: row.get("design_product_id")?,
            design_name: row.get("design_name")?,
            design_branch_level: row.get("design_branch_level")?,
            design_target_8h: row.get("design_target_8h")?,
            design_target_10h: row.get("design_target_10h")?,
        })
    }
}

impl JoinedDetailRow {
    fn into_detail(self) -> AppResult<(i64, ProductionDetail)> {
        let product = match (self.product_id, self.product_name) {
            (Some(id), Some(name)) => Some(ProductRecord {
                id,
                name,
                kind: match self.product_kind.as_deref() {
                    Some(kind) => ProductKind::parse(kind)?,
                    None => ProductKind::General,
                },
                target_8h: self.product_target_8h,
                target_10h: self.product_target_10h,
                general_target: self.product_general_target,
            }),
            _ => None,
        };

        let design = match (self.design_id, self.design_product_id, self.design_name) {
            (Some(id), Some(product_id), Some(name)) => Some(TreeDesignRecord {
                id,
                product_id,
                name,
                branch_level: self.design_branch_level,
                target_8h: self.design_target_8h,
                target_10h: self.design_target_10h,
            }),
            _ => None,
        };

        Ok((
            self.record_id,
            ProductionDetail {
                id: self.id,
                product,
                design,
                quantity: self.quantity,
                compliance_pct: self.compliance_pct,
            },
        ))
    }
}

pub struct ProductionRepository;

impl ProductionRepository {
    /// Inserts the record with its details and assistants atomically.
    pub fn insert(conn: &Connection, row: &NewRecordRow) -> AppResult<i64> {
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
                INSERT INTO production_records (
                    record_date, shift, machine_id, operator_id, is_assistant, notes, created_at
                ) VALUES (
                    :record_date, :shift, :machine_id, :operator_id, :is_assistant, :notes, :created_at
                )
            "#,
            named_params! {
                ":record_date": to_iso(row.record_date),
                ":shift": &row.shift,
                ":machine_id": &row.machine_id,
                ":operator_id": &row.operator_id,
                ":is_assistant": row.is_assistant as i64,
                ":notes": &row.notes,
                ":created_at": &row.created_at,
            },
        )?;
        let record_id = tx.last_insert_rowid();

        {
            let mut detail_stmt = tx.prepare(
                r#"
                INSERT INTO production_details (
                    record_id, product_id, tree_design_id, quantity, compliance_pct
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for detail in &row.details {
                detail_stmt.execute((
                    record_id,
                    detail.product_id,
                    detail.tree_design_id,
                    detail.quantity,
                    detail.compliance_pct,
                ))?;
            }

            let mut assistant_stmt = tx.prepare(
                "INSERT OR IGNORE INTO production_assistants (record_id, operator_id) VALUES (?1, ?2)",
            )?;
            for assistant_id in &row.assistant_ids {
                assistant_stmt.execute((record_id, assistant_id))?;
            }
        }

        tx.commit()?;
        Ok(record_id)
    }

    pub fn list_in_range(conn: &Connection, range: &DateRange) -> AppResult<Vec<ProductionRecord>> {
        let sql = format!(
            "{RECORD_SELECT} WHERE r.record_date BETWEEN ?1 AND ?2 ORDER BY r.record_date ASC, r.id ASC"
        );
        let params = vec![
            SqlValue::Text(to_iso(range.start())),
            SqlValue::Text(to_iso(range.end())),
        ];
        Self::load(conn, &sql, params)
    }

    /// Records where the operator is the submitter or a listed assistant.
    pub fn list_for_operator(
        conn: &Connection,
        operator_id: i64,
        range: &DateRange,
    ) -> AppResult<Vec<ProductionRecord>> {
        let sql = format!(
            r#"{RECORD_SELECT}
            WHERE r.record_date BETWEEN ?1 AND ?2
              AND (
                r.operator_id = ?3
                OR r.id IN (SELECT record_id FROM production_assistants WHERE operator_id = ?3)
              )
            ORDER BY r.record_date ASC, r.id ASC"#
        );
        let params = vec![
            SqlValue::Text(to_iso(range.start())),
            SqlValue::Text(to_iso(range.end())),
            SqlValue::Integer(operator_id),
        ];
        Self::load(conn, &sql, params)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<ProductionRecord>> {
        let sql = format!("{RECORD_SELECT} WHERE r.id = ?1");
        let mut records = Self::load(conn, &sql, vec![SqlValue::Integer(id)])?;
        Ok(records.pop())
    }

    pub fn list_recent(conn: &Connection, limit: usize) -> AppResult<Vec<ProductionRecord>> {
        let sql = format!("{RECORD_SELECT} ORDER BY r.record_date DESC, r.id DESC LIMIT ?1");
        Self::load(conn, &sql, vec![SqlValue::Integer(limit as i64)])
    }

    pub fn count_on(conn: &Connection, date: NaiveDate) -> AppResult<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM production_records WHERE record_date = ?1",
            [to_iso(date)],
            |row| row.get(0),
        )?)
    }

    fn load(conn: &Connection, sql: &str, params: Vec<SqlValue>) -> AppResult<Vec<ProductionRecord>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| JoinedRecordRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut records = rows
            .into_iter()
            .map(JoinedRecordRow::into_record)
            .collect::<AppResult<Vec<_>>>()?;

        if records.is_empty() {
            return Ok(records);
        }

        let ids: Vec<i64> = records.iter().map(|record| record.id).collect();
        let mut details = Self::load_details(conn, &ids)?;
        let mut assistants = Self::load_assistants(conn, &ids)?;

        for record in &mut records {
            record.details = details.remove(&record.id).unwrap_or_default();
            record.assistants = assistants.remove(&record.id).unwrap_or_default();
        }

        Ok(records)
    }

    fn load_details(
        conn: &Connection,
        record_ids: &[i64],
    ) -> AppResult<HashMap<i64, Vec<ProductionDetail>>> {
        let mut grouped: HashMap<i64, Vec<ProductionDetail>> = HashMap::new();

        for chunk in record_ids.chunks(CHILD_QUERY_CHUNK) {
            let sql = format!(
                r#"
                SELECT
                    d.id,
                    d.record_id,
                    d.quantity,
                    d.compliance_pct,
                    p.id AS product_id,
                    p.name AS product_name,
                    p.kind AS product_kind,
                    p.target_8h AS product_target_8h,
                    p.target_10h AS product_target_10h,
                    p.general_target AS product_general_target,
                    t.id AS design_id,
                    t.product_id AS design_product_id,
                    t.name AS design_name,
                    t.branch_level AS design_branch_level,
                    t.target_8h AS design_target_8h,
                    t.target_10h AS design_target_10h
                FROM production_details d
                LEFT JOIN products p ON p.id = d.product_id
                LEFT JOIN tree_designs t ON t.id = d.tree_design_id
                WHERE d.record_id IN ({})
                ORDER BY d.id ASC
                "#,
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| {
                    JoinedDetailRow::try_from(row)
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for row in rows {
                let (record_id, detail) = row.into_detail()?;
                grouped.entry(record_id).or_default().push(detail);
            }
        }

        Ok(grouped)
    }

    fn load_assistants(
        conn: &Connection,
        record_ids: &[i64],
    ) -> AppResult<HashMap<i64, Vec<OperatorRef>>> {
        let mut grouped: HashMap<i64, Vec<OperatorRef>> = HashMap::new();

        for chunk in record_ids.chunks(CHILD_QUERY_CHUNK) {
            let sql = format!(
                r#"
                SELECT a.record_id, o.id, o.full_name
                FROM production_assistants a
                JOIN operators o ON o.id = a.operator_id
                WHERE a.record_id IN ({})
                ORDER BY o.full_name ASC
                "#,
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        OperatorRef {
                            id: row.get(1)?,
                            full_name: row.get(2)?,
                        },
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (record_id, assistant) in rows {
                grouped.entry(record_id).or_default().push(assistant);
            }
        }

        Ok(grouped)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
