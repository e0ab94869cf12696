//! Row operations for the SQL backend.

use base64ct::{Base64, Encoding};
use sqlx::Any;
use sqlx::Transaction;
use tracing::trace;

use super::{SqlxBackend, SqlxResultExt};
use crate::Result;
use crate::backend::{BackendError, Meta, Row, RowFilter, RowKey, RowPatch, RowQuery, Scope};

/// Column tuple as selected from `vault_rows`:
/// (scope, key_path, sort_key, seq, meta, sealed)
type RowColumns = (String, String, i64, i64, String, String);

const SELECT_COLUMNS: &str = "SELECT scope, key_path, sort_key, seq, meta, sealed FROM vault_rows";

fn decode_row(table: &str, columns: RowColumns) -> Result<Row> {
    let (scope, key_path, sort, seq, meta, sealed) = columns;
    let invalid = |reason: String| BackendError::InvalidRow {
        table: table.to_string(),
        reason,
    };

    let scope =
        Scope::from_storage_key(&scope).ok_or_else(|| invalid(format!("unknown scope '{scope}'")))?;
    let parts: Vec<String> = serde_json::from_str(&key_path)
        .map_err(|e| invalid(format!("invalid key path '{key_path}': {e}")))?;
    let meta: Meta =
        serde_json::from_str(&meta).map_err(|e| invalid(format!("invalid metadata: {e}")))?;
    let sealed =
        Base64::decode_vec(&sealed).map_err(|e| invalid(format!("invalid payload encoding: {e}")))?;

    Ok(Row {
        key: RowKey { scope, parts },
        sort,
        seq,
        meta,
        sealed,
    })
}

fn encode_meta(meta: &Meta) -> Result<String> {
    serde_json::to_string(meta).map_err(|e| BackendError::SerializationFailed { source: e }.into())
}

/// Build the SQL-side part of a filter: table, scope and sort bound.
///
/// Returns the WHERE clause and the values to bind after the table name.
fn where_clause(filter: &RowFilter) -> (String, Option<String>, Option<i64>) {
    let mut clause = String::from(" WHERE table_name = $1");
    let mut next = 2;
    let scope = filter.scope.as_ref().map(Scope::storage_key);
    if scope.is_some() {
        clause.push_str(&format!(" AND scope = ${next}"));
        next += 1;
    }
    if filter.sort_at_most.is_some() {
        clause.push_str(&format!(" AND sort_key <= ${next}"));
    }
    (clause, scope, filter.sort_at_most)
}

/// Whether SQL alone can evaluate the filter.
fn sql_only(filter: &RowFilter) -> bool {
    filter.prefix.is_empty() && filter.meta.is_empty()
}

async fn candidates(backend: &SqlxBackend, table: &str, filter: &RowFilter) -> Result<Vec<Row>> {
    let (clause, scope, max_sort) = where_clause(filter);
    let sql = format!("{SELECT_COLUMNS}{clause} ORDER BY sort_key, seq");
    let mut query = sqlx::query_as::<_, RowColumns>(&sql).bind(table);
    if let Some(scope) = scope {
        query = query.bind(scope);
    }
    if let Some(max_sort) = max_sort {
        query = query.bind(max_sort);
    }
    let rows = query
        .fetch_all(backend.pool())
        .await
        .sql_context("Failed to scan rows")?;
    rows.into_iter().map(|cols| decode_row(table, cols)).collect()
}

pub(crate) async fn get(backend: &SqlxBackend, table: &str, key: &RowKey) -> Result<Option<Row>> {
    let sql = format!("{SELECT_COLUMNS} WHERE table_name = $1 AND scope = $2 AND key_path = $3");
    let row: Option<RowColumns> = sqlx::query_as(&sql)
        .bind(table)
        .bind(key.scope.storage_key())
        .bind(key.path())
        .fetch_optional(backend.pool())
        .await
        .sql_context("Failed to get row")?;
    row.map(|cols| decode_row(table, cols)).transpose()
}

pub(crate) async fn scan(backend: &SqlxBackend, table: &str, query: &RowQuery) -> Result<Vec<Row>> {
    let rows = candidates(backend, table, &query.filter).await?;
    Ok(query.select(rows))
}

/// Reserve `count` consecutive sequence numbers; returns the first.
async fn reserve_seq(tx: &mut Transaction<'_, Any>, count: i64) -> Result<i64> {
    let (last,): (i64,) = sqlx::query_as(
        "UPDATE row_sequence SET next_seq = next_seq + $1 WHERE id = 1 RETURNING next_seq",
    )
    .bind(count)
    .fetch_one(&mut **tx)
    .await
    .sql_context("Failed to reserve sequence numbers")?;
    Ok(last - count + 1)
}

pub(crate) async fn upsert(backend: &SqlxBackend, table: &str, rows: Vec<Row>) -> Result<()> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let mut seq = reserve_seq(&mut tx, rows.len() as i64).await?;
    trace!(table, count = rows.len(), "Upserting rows");

    for row in &rows {
        // On conflict seq is left alone, keeping the original insertion order.
        sqlx::query(
            "INSERT INTO vault_rows (table_name, scope, key_path, sort_key, seq, meta, sealed)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (table_name, scope, key_path) DO UPDATE SET
                sort_key = excluded.sort_key,
                meta = excluded.meta,
                sealed = excluded.sealed",
        )
        .bind(table)
        .bind(row.key.scope.storage_key())
        .bind(row.key.path())
        .bind(row.sort)
        .bind(seq)
        .bind(encode_meta(&row.meta)?)
        .bind(Base64::encode_string(&row.sealed))
        .execute(&mut *tx)
        .await
        .sql_context("Failed to upsert row")?;
        seq += 1;
    }

    tx.commit().await.sql_context("Failed to commit upsert")?;
    Ok(())
}

pub(crate) async fn patch(
    backend: &SqlxBackend,
    table: &str,
    key: &RowKey,
    patch: &RowPatch,
) -> Result<bool> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let sql = format!("{SELECT_COLUMNS} WHERE table_name = $1 AND scope = $2 AND key_path = $3");
    let existing: Option<RowColumns> = sqlx::query_as(&sql)
        .bind(table)
        .bind(key.scope.storage_key())
        .bind(key.path())
        .fetch_optional(&mut *tx)
        .await
        .sql_context("Failed to read row for patch")?;
    let Some(columns) = existing else {
        return Ok(false);
    };

    let mut row = decode_row(table, columns)?;
    patch.apply(&mut row);
    sqlx::query(
        "UPDATE vault_rows SET sort_key = $1, meta = $2
         WHERE table_name = $3 AND scope = $4 AND key_path = $5",
    )
    .bind(row.sort)
    .bind(encode_meta(&row.meta)?)
    .bind(table)
    .bind(key.scope.storage_key())
    .bind(key.path())
    .execute(&mut *tx)
    .await
    .sql_context("Failed to patch row")?;

    tx.commit().await.sql_context("Failed to commit patch")?;
    Ok(true)
}

pub(crate) async fn delete(backend: &SqlxBackend, table: &str, keys: &[RowKey]) -> Result<u64> {
    let mut tx = backend
        .pool()
        .begin()
        .await
        .sql_context("Failed to begin transaction")?;

    let mut removed = 0;
    for key in keys {
        let result =
            sqlx::query("DELETE FROM vault_rows WHERE table_name = $1 AND scope = $2 AND key_path = $3")
                .bind(table)
                .bind(key.scope.storage_key())
                .bind(key.path())
                .execute(&mut *tx)
                .await
                .sql_context("Failed to delete row")?;
        removed += result.rows_affected();
    }

    tx.commit().await.sql_context("Failed to commit delete")?;
    Ok(removed)
}

pub(crate) async fn delete_where(
    backend: &SqlxBackend,
    table: &str,
    filter: &RowFilter,
) -> Result<u64> {
    if !sql_only(filter) {
        let keys: Vec<RowKey> = candidates(backend, table, filter)
            .await?
            .into_iter()
            .filter(|row| filter.matches(row))
            .map(|row| row.key)
            .collect();
        return delete(backend, table, &keys).await;
    }

    let (clause, scope, max_sort) = where_clause(filter);
    let sql = format!("DELETE FROM vault_rows{clause}");
    let mut query = sqlx::query(&sql).bind(table);
    if let Some(scope) = scope {
        query = query.bind(scope);
    }
    if let Some(max_sort) = max_sort {
        query = query.bind(max_sort);
    }
    let result = query
        .execute(backend.pool())
        .await
        .sql_context("Failed to delete rows")?;
    trace!(table, removed = result.rows_affected(), "Deleted rows by filter");
    Ok(result.rows_affected())
}
