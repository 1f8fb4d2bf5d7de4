//! LanceDB connection and housekeeping helpers.

use anyhow::Result;
use lancedb::{connect, Connection};
use std::sync::Arc;

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
    let names = conn.table_names().execute().await?;
    if names.iter().any(|n| n == name) {
        return Ok(());
    }
    conn.create_empty_table(name, schema).execute().await?;
    Ok(())
}

/// Quote a string literal for a Lance SQL predicate.
pub fn sql_literal(value: &str) -> String { format!("'{}'", value.replace('\'', "''")) }

pub fn id_in_predicate(ids: &[String]) -> String {
    let list = ids.iter().map(|id| sql_literal(id)).collect::<Vec<_>>().join(",");
    format!("id IN ({list})")
}
