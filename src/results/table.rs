use std::collections::HashMap;
use std::fmt;

use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table as ComfyTable};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::result_set::ResultSet;
use super::row::index_columns;
use crate::types::RowValues;

/// A labeled, column-major table built from a [`ResultSet`].
///
/// Row and column counts always match the source result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    data: Vec<Vec<RowValues>>,
    n_rows: usize,
}

impl Table {
    /// Build a table from column names and row-major values.
    ///
    /// Short rows are padded with `NULL`, long rows are truncated.
    #[must_use]
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<RowValues>>) -> Self {
        let n_rows = rows.len();
        let mut data: Vec<Vec<RowValues>> =
            columns.iter().map(|_| Vec::with_capacity(n_rows)).collect();
        for row in rows {
            let mut values = row.into_iter();
            for column in &mut data {
                column.push(values.next().unwrap_or(RowValues::Null));
            }
        }
        Self {
            columns,
            data,
            n_rows,
        }
    }

    /// `(rows, columns)`
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// All values of the first column with this name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[RowValues]> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(&self.data[idx])
    }

    #[must_use]
    pub fn column_at(&self, index: usize) -> Option<&[RowValues]> {
        self.data.get(index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn get(&self, row: usize, column: &str) -> Option<&RowValues> {
        self.column(column)?.get(row)
    }

    /// Values of one row, in column order.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<Vec<&RowValues>> {
        if index >= self.n_rows {
            return None;
        }
        Some(self.data.iter().map(|col| &col[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&RowValues>> + '_ {
        (0..self.n_rows).map(|i| self.data.iter().map(|col| &col[i]).collect())
    }

    /// Column name to index, first occurrence wins.
    #[must_use]
    pub fn column_index(&self) -> HashMap<String, usize> {
        index_columns(&self.columns)
    }
}

impl From<ResultSet> for Table {
    fn from(result_set: ResultSet) -> Self {
        let columns = result_set.columns().to_vec();
        let rows = result_set.results.into_iter().map(|row| row.rows).collect();
        Table::from_rows(columns, rows)
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = ComfyTable::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(self.columns.iter());
        for row in self.rows() {
            table.add_row(row.into_iter().map(ToString::to_string));
        }
        write!(f, "{table}")
    }
}

/// Serializes as a list of `{column: value}` records.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.n_rows))?;
        for row in self.rows() {
            seq.serialize_element(&Record {
                columns: &self.columns,
                values: row,
            })?;
        }
        seq.end()
    }
}

struct Record<'a> {
    columns: &'a [String],
    values: Vec<&'a RowValues>,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
