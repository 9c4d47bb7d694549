use std::collections::HashMap;
use std::sync::Arc;

use super::row::{DbRow, index_columns};
use crate::types::RowValues;

/// The rows and column names produced by one execution call.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<DbRow>,
    column_names: Option<Arc<Vec<String>>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create a new result set with preallocated row capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Arc::new(index_columns(&column_names));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    ///
    /// `None` means the statement produced no result set at all (DDL, DML).
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Column names, empty when the statement returned no result set.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        self.column_names.as_ref().map_or(&[], |names| names.as_slice())
    }

    #[must_use]
    pub fn returns_rows(&self) -> bool {
        self.column_names.is_some()
    }

    /// Add a row to the result set.
    ///
    /// Rows are ignored until column names have been set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(column_names) = &self.column_names {
            let row = DbRow {
                column_names: column_names.clone(),
                rows: row_values,
                column_index_cache: self.column_index.clone(),
            };

            self.results.push(row);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_lookup() {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["id".into(), "name".into()]));
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("a".into())]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("b".into())]);

        assert_eq!(rs.len(), 2);
        assert_eq!(rs.results[1].get("name").and_then(RowValues::as_text), Some("b"));
        assert_eq!(rs.results[0].get_by_index(0), Some(&RowValues::Int(1)));
        assert!(rs.results[0].get("missing").is_none());
    }

    #[test]
    fn rows_without_columns_are_dropped() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty());
        assert!(!rs.returns_rows());
        assert!(rs.columns().is_empty());
    }
}
