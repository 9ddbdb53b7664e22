//! Driver rows to JSON

use futures::{Stream, TryStreamExt};
use sqlx::{Column, ColumnIndex, Decode, Row, Type};

use crate::types::QueryOutcome;

/// Convert a row into a JSON object keyed by column name.
///
/// Values are tried as text, integer, float and boolean in that order; a
/// value none of those decode is reported as null.
pub fn row_to_json<R>(row: &R) -> serde_json::Value
where
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> Option<String>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<i64>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<i32>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<f64>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<bool>: Decode<'r, R::Database> + Type<R::Database>,
{
    let mut obj = serde_json::Map::new();

    for (i, column) in row.columns().iter().enumerate() {
        let value = if let Ok(v) = row.try_get::<Option<String>, _>(i) {
            v.map(serde_json::Value::String)
        } else if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
            v.map(serde_json::Value::from)
        } else if let Ok(v) = row.try_get::<Option<i32>, _>(i) {
            v.map(serde_json::Value::from)
        } else if let Ok(v) = row.try_get::<Option<f64>, _>(i) {
            v.map(serde_json::Value::from)
        } else if let Ok(v) = row.try_get::<Option<bool>, _>(i) {
            v.map(serde_json::Value::Bool)
        } else {
            None
        };

        obj.insert(
            column.name().to_string(),
            value.unwrap_or(serde_json::Value::Null),
        );
    }

    serde_json::Value::Object(obj)
}

/// Drain at most `max_rows` rows from a query stream, noting whether more were available.
pub async fn collect_capped<R, S>(mut stream: S, max_rows: usize) -> Result<QueryOutcome, sqlx::Error>
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
    R: Row,
    usize: ColumnIndex<R>,
    for<'r> Option<String>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<i64>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<i32>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<f64>: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> Option<bool>: Decode<'r, R::Database> + Type<R::Database>,
{
    let mut columns = Vec::new();
    let mut rows = Vec::new();
    let mut truncated = false;

    while let Some(row) = stream.try_next().await? {
        if rows.len() == max_rows {
            truncated = true;
            break;
        }
        if columns.is_empty() {
            columns = row.columns().iter().map(|c| c.name().to_string()).collect();
        }
        rows.push(row_to_json(&row));
    }

    Ok(QueryOutcome::Rows {
        columns,
        rows,
        truncated,
    })
}
