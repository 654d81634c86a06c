use crate::errors::AppResult;
use crate::models::ColumnInfo;
use rusqlite::Connection;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<ColumnInfo> {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|info| info.name == column)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|info| info.name.as_str())
    }
}

pub fn current_columns(conn: &Connection, table: &str) -> AppResult<TableSchema> {
    let mut stmt = conn.prepare(
        "SELECT cid, name, type, \"notnull\", dflt_value, pk
         FROM pragma_table_info(?1)
         ORDER BY cid",
    )?;
    let rows = stmt.query_map([table], |row| {
        Ok(ColumnInfo {
            position: row.get(0)?,
            name: row.get(1)?,
            declared_type: row.get(2)?,
            not_null: row.get::<_, i64>(3)? != 0,
            default_value: row.get(4)?,
            primary_key: row.get::<_, i64>(5)? != 0,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    tracing::debug!(table, column_count = columns.len(), "inspected table schema");
    Ok(TableSchema { columns })
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
