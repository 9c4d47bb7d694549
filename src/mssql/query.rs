use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_util::TryStreamExt;
use tiberius::numeric::Numeric;
use tiberius::{ColumnData, FromSql, Query, QueryItem};
use tracing::{debug, trace};

use super::client::MssqlClient;
use crate::error::SqlFileError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Run `query` and collect the first result set.
///
/// Later result sets of a batch are drained and discarded. A statement that
/// produces no result set at all yields a `ResultSet` without column names.
///
/// # Errors
/// Returns `SqlFileError::ExecutionError` if the server rejects the statement
/// or a row cannot be read.
pub async fn build_result_set(
    client: &mut MssqlClient,
    query: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlFileError> {
    let query_builder = bind_query_params(query, params);

    let mut stream = query_builder.query(client).await.map_err(|e| {
        SqlFileError::ExecutionError(format!("SQL Server query error: {e}"))
    })?;

    let mut result_set = ResultSet::with_capacity(16);
    let mut first_result: Option<usize> = None;
    let mut discarded = 0usize;

    while let Some(item) = stream.try_next().await.map_err(|e| {
        SqlFileError::ExecutionError(format!("SQL Server row fetch error: {e}"))
    })? {
        match item {
            QueryItem::Metadata(meta) => {
                if first_result.is_none() {
                    first_result = Some(meta.result_index());
                    let column_names: Vec<String> =
                        meta.columns().iter().map(|col| col.name().to_string()).collect();
                    result_set.set_column_names(Arc::new(column_names));
                }
            }
            QueryItem::Row(row) => {
                if Some(row.result_index()) == first_result {
                    let values = row.into_iter().map(column_data_to_row_value).collect();
                    result_set.add_row_values(values);
                } else {
                    discarded += 1;
                }
            }
        }
    }

    if discarded > 0 {
        debug!("Discarded {discarded} row(s) from additional result sets");
    }
    Ok(result_set)
}

/// Bind parameters to the query as `@P1`, `@P2`, ... in slice order.
pub fn bind_query_params<'a>(query: &'a str, params: &[RowValues]) -> Query<'a> {
    let mut query_builder = Query::new(query);

    for param in params {
        match param {
            RowValues::Int(i) => query_builder.bind(*i),
            RowValues::Float(f) => query_builder.bind(*f),
            RowValues::Text(s) => query_builder.bind(s.clone()),
            RowValues::Bool(b) => query_builder.bind(*b),
            RowValues::Timestamp(dt) => {
                let formatted = dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string();
                query_builder.bind(formatted);
            }
            RowValues::Null => query_builder.bind(Option::<String>::None),
            RowValues::JSON(jsval) => query_builder.bind(jsval.to_string()),
            RowValues::Blob(bytes) => query_builder.bind(bytes.clone()),
        }
    }

    query_builder
}

/// Map one SQL Server value onto `RowValues`.
pub(crate) fn column_data_to_row_value(data: ColumnData<'static>) -> RowValues {
    match data {
        ColumnData::U8(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I16(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I32(v) => v.map_or(RowValues::Null, |v| RowValues::Int(i64::from(v))),
        ColumnData::I64(v) => v.map_or(RowValues::Null, RowValues::Int),
        ColumnData::F32(v) => v.map_or(RowValues::Null, |v| RowValues::Float(f64::from(v))),
        ColumnData::F64(v) => v.map_or(RowValues::Null, RowValues::Float),
        ColumnData::Bit(v) => v.map_or(RowValues::Null, RowValues::Bool),
        ColumnData::String(v) => {
            v.map_or(RowValues::Null, |s| RowValues::Text(s.into_owned()))
        }
        ColumnData::Guid(v) => v.map_or(RowValues::Null, |g| RowValues::Text(g.to_string())),
        ColumnData::Binary(v) => {
            v.map_or(RowValues::Null, |b| RowValues::Blob(b.into_owned()))
        }
        ColumnData::Numeric(v) => v.map_or(RowValues::Null, numeric_to_row_value),
        ColumnData::Xml(v) => {
            v.map_or(RowValues::Null, |x| RowValues::Text(x.into_owned().into_string()))
        }
        other => temporal_or_text(&other),
    }
}

/// Digits an `f64` always carries through a decimal round trip.
const EXACT_FLOAT_DIGITS: u32 = 15;

// DECIMAL/NUMERIC with up to 15 significant digits fits a float exactly
// enough to print back unchanged; wider values keep their decimal text.
fn numeric_to_row_value(n: Numeric) -> RowValues {
    if n.value().unsigned_abs() < 10u128.pow(EXACT_FLOAT_DIGITS) {
        #[allow(clippy::cast_precision_loss)]
        let value = n.value() as f64 / 10f64.powi(i32::from(n.scale()));
        RowValues::Float(value)
    } else {
        RowValues::Text(n.to_string())
    }
}

// Date/time columns come in several wire types; let tiberius' chrono support
// sort them out.
fn temporal_or_text(data: &ColumnData<'static>) -> RowValues {
    if let Ok(Some(dt)) = NaiveDateTime::from_sql(data) {
        return RowValues::Timestamp(dt);
    }
    if let Ok(Some(dt)) = DateTime::<Utc>::from_sql(data) {
        return RowValues::Timestamp(dt.naive_utc());
    }
    if let Ok(Some(date)) = NaiveDate::from_sql(data) {
        return RowValues::Timestamp(date.and_time(NaiveTime::MIN));
    }
    if let Ok(Some(time)) = NaiveTime::from_sql(data) {
        return RowValues::Text(time.to_string());
    }
    if let Ok(Some(text)) = <&str>::from_sql(data) {
        return RowValues::Text(text.to_string());
    }
    trace!("Unmapped or NULL column value: {data:?}");
    RowValues::Null
}
