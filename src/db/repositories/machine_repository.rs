use std::convert::TryFrom;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::machine::MachineRecord;

#[derive(Debug, Clone)]
pub struct MachineRow {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
}

impl MachineRow {
    pub fn into_record(self) -> MachineRecord {
        MachineRecord {
            id: self.id,
            name: self.name,
            category: self.category,
        }
    }
}

impl TryFrom<&Row<'_>> for MachineRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            category: row.get("category")?,
        })
    }
}

pub struct MachineRepository;

impl MachineRepository {
    pub fn insert(conn: &Connection, name: &str, category: Option<&str>) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO machines (name, category) VALUES (?1, ?2)",
            (name, category),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<MachineRow>> {
        let row = conn
            .query_row(
                "SELECT id, name, category FROM machines WHERE id = ?1",
                [id],
                |row| MachineRow::try_from(row),
            )
            .optional()?;
        Ok(row)
    }

    pub fn list(conn: &Connection) -> AppResult<Vec<MachineRow>> {
        let mut stmt = conn.prepare("SELECT id, name, category FROM machines ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], |row| MachineRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count(conn: &Connection) -> AppResult<i64> {
        Ok(conn.query_row("SELECT COUNT(*) FROM machines", [], |row| row.get(0))?)
    }

    pub fn delete(conn: &Connection, id: i64) -> AppResult<usize> {
        Ok(conn.execute("DELETE FROM machines WHERE id = ?1", [id])?)
    }
}
