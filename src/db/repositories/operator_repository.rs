use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::operator::{OperatorRecord, Role};

const OPERATOR_COLUMNS: &str = "id, cedula, full_name, role, password_hash, active";

#[derive(Debug, Clone)]
pub struct OperatorRow {
    pub id: i64,
    pub cedula: String,
    pub full_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: bool,
}

impl OperatorRow {
    pub fn into_record(self) -> AppResult<OperatorRecord> {
        Ok(OperatorRecord {
            id: self.id,
            cedula: self.cedula,
            full_name: self.full_name,
            role: Role::parse(&self.role)?,
            active: self.active,
        })
    }
}

impl TryFrom<&Row<'_>> for OperatorRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            cedula: row.get("cedula")?,
            full_name: row.get("full_name")?,
            role: row.get("role")?,
            password_hash: row.get("password_hash")?,
            active: row.get::<_, i64>("active")? != 0,
        })
    }
}

pub struct OperatorRepository;

impl OperatorRepository {
    pub fn insert(
        conn: &Connection,
        cedula: &str,
        full_name: &str,
        role: Role,
        password_hash: &str,
        created_at: &str,
    ) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO operators (cedula, full_name, role, password_hash, active, created_at)
                VALUES (:cedula, :full_name, :role, :password_hash, 1, :created_at)
            "#,
            named_params! {
                ":cedula": cedula,
                ":full_name": full_name,
                ":role": role.as_str(),
                ":password_hash": password_hash,
                ":created_at": created_at,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_cedula(conn: &Connection, cedula: &str) -> AppResult<Option<OperatorRow>> {
        let sql = format!("SELECT {OPERATOR_COLUMNS} FROM operators WHERE cedula = ?1");
        let row = conn
            .query_row(&sql, [cedula], |row| OperatorRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<OperatorRow>> {
        let sql = format!("SELECT {OPERATOR_COLUMNS} FROM operators WHERE id = ?1");
        let row = conn
            .query_row(&sql, [id], |row| OperatorRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    pub fn list_active(conn: &Connection) -> AppResult<Vec<OperatorRow>> {
        let sql = format!(
            "SELECT {OPERATOR_COLUMNS} FROM operators WHERE active = 1 ORDER BY full_name ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| OperatorRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_active(conn: &Connection) -> AppResult<i64> {
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM operators WHERE active = 1",
            [],
            |row| row.get(0),
        )?)
    }

    pub fn set_active(conn: &Connection, id: i64, active: bool) -> AppResult<usize> {
        let updated = conn.execute(
            "UPDATE operators SET active = ?1 WHERE id = ?2",
            (active as i64, id),
        )?;
        Ok(updated)
    }
}
