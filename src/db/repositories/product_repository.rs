use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::AppResult;
use crate::models::product::{
    ProductCreateInput, ProductKind, ProductRecord, TreeDesignCreateInput, TreeDesignRecord,
};

#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub target_8h: Option<f64>,
    pub target_10h: Option<f64>,
    pub general_target: Option<f64>,
}

impl ProductRow {
    pub fn into_record(self) -> AppResult<ProductRecord> {
        Ok(ProductRecord {
            id: self.id,
            name: self.name,
            kind: ProductKind::parse(&self.kind)?,
            target_8h: self.target_8h,
            target_10h: self.target_10h,
            general_target: self.general_target,
        })
    }
}

impl TryFrom<&Row<'_>> for ProductRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: row.get("kind")?,
            target_8h: row.get("target_8h")?,
            target_10h: row.get("target_10h")?,
            general_target: row.get("general_target")?,
        })
    }
}

impl TryFrom<&Row<'_>> for TreeDesignRecord {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            product_id: row.get("product_id")?,
            name: row.get("name")?,
            branch_level: row.get("branch_level")?,
            target_8h: row.get("target_8h")?,
            target_10h: row.get("target_10h")?,
        })
    }
}

pub struct ProductRepository;

impl ProductRepository {
    pub fn insert(conn: &Connection, input: &ProductCreateInput) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO products (name, kind, target_8h, target_10h, general_target)
                VALUES (:name, :kind, :target_8h, :target_10h, :general_target)
            "#,
            named_params! {
                ":name": &input.name,
                ":kind": input.kind.as_str(),
                ":target_8h": &input.target_8h,
                ":target_10h": &input.target_10h,
                ":general_target": &input.general_target,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_design(conn: &Connection, input: &TreeDesignCreateInput) -> AppResult<i64> {
        conn.execute(
            r#"
                INSERT INTO tree_designs (product_id, name, branch_level, target_8h, target_10h)
                VALUES (:product_id, :name, :branch_level, :target_8h, :target_10h)
            "#,
            named_params! {
                ":product_id": &input.product_id,
                ":name": &input.name,
                ":branch_level": &input.branch_level,
                ":target_8h": &input.target_8h,
                ":target_10h": &input.target_10h,
            },
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> AppResult<Option<ProductRow>> {
        let row = conn
            .query_row(
                r#"
                SELECT id, name, kind, target_8h, target_10h, general_target
                FROM products
                WHERE id = ?1
                "#,
                [id],
                |row| ProductRow::try_from(row),
            )
            .optional()?;
        Ok(row)
    }

    pub fn find_design(conn: &Connection, id: i64) -> AppResult<Option<TreeDesignRecord>> {
        let row = conn
            .query_row(
                r#"
                SELECT id, product_id, name, branch_level, target_8h, target_10h
                FROM tree_designs
                WHERE id = ?1
                "#,
                [id],
                |row| TreeDesignRecord::try_from(row),
            )
            .optional()?;
        Ok(row)
    }

    pub fn delete(conn: &Connection, id: i64) -> AppResult<usize> {
        Ok(conn.execute("DELETE FROM products WHERE id = ?1", [id])?)
    }
}
