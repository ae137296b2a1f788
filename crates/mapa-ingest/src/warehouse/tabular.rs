//! Typed tabular query results and the row decoding boundary

use crate::error::{IngestError, Result};
use std::collections::HashMap;
use tracing::warn;

/// Column type as reported by the warehouse schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    /// Map a BigQuery schema type name
    pub fn from_bigquery(type_name: &str) -> Self {
        match type_name.to_ascii_uppercase().as_str() {
            "INTEGER" | "INT64" => ColumnType::Integer,
            "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => ColumnType::Float,
            "BOOLEAN" | "BOOL" => ColumnType::Boolean,
            _ => ColumnType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A single typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Rows with named, typed columns
#[derive(Debug, Clone, Default)]
pub struct TabularResult {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Cell>>,
}

impl TabularResult {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Cell>>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, column)| (column.name.clone(), i))
            .collect();
        Self {
            columns,
            index,
            rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().enumerate().map(move |(position, cells)| RowRef {
            position,
            index: &self.index,
            cells,
        })
    }

    /// Decode every row as `T`.
    ///
    /// Fails when a column `T` requires is absent; columns `T` does not know
    /// about are reported once and ignored.
    pub fn decode<T: FromRow>(&self) -> Result<Vec<T>> {
        let missing: Vec<&str> = T::COLUMNS
            .iter()
            .copied()
            .filter(|name| !self.index.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(IngestError::decode(
                T::RECORD,
                format!("missing columns: {}", missing.join(", ")),
            ));
        }

        let unknown: Vec<&str> = self
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| !T::COLUMNS.contains(name))
            .collect();
        if !unknown.is_empty() {
            warn!(record = T::RECORD, columns = ?unknown, "Ignoring unexpected warehouse columns");
        }

        self.rows().map(|row| T::from_row(&row)).collect()
    }
}

/// Borrowed view of one row
pub struct RowRef<'a> {
    position: usize,
    index: &'a HashMap<String, usize>,
    cells: &'a [Cell],
}

impl<'a> RowRef<'a> {
    pub fn cell(&self, column: &str) -> Option<&'a Cell> {
        self.index.get(column).and_then(|&i| self.cells.get(i))
    }

    fn error(&self, column: &str, message: impl std::fmt::Display) -> IngestError {
        IngestError::decode(
            format!("row {}", self.position),
            format!("column '{}': {}", column, message),
        )
    }

    /// Text value; integers are rendered as text (identifier columns)
    pub fn get_opt_string(&self, column: &str) -> Result<Option<String>> {
        match self.cell(column) {
            None | Some(Cell::Null) => Ok(None),
            Some(Cell::Text(text)) => Ok(Some(text.clone())),
            Some(Cell::Integer(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.error(column, format!("expected text, got {:?}", other))),
        }
    }

    pub fn get_string(&self, column: &str) -> Result<String> {
        self.get_opt_string(column)?
            .ok_or_else(|| self.error(column, "unexpected null"))
    }

    /// Integer value; numeric text is accepted
    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.cell(column) {
            Some(Cell::Integer(n)) => Ok(*n),
            Some(Cell::Text(text)) => text
                .trim()
                .parse()
                .map_err(|_| self.error(column, format!("'{}' is not an integer", text))),
            Some(Cell::Null) | None => Err(self.error(column, "unexpected null")),
            Some(other) => Err(self.error(column, format!("expected integer, got {:?}", other))),
        }
    }

    pub fn get_i32(&self, column: &str) -> Result<i32> {
        let value = self.get_i64(column)?;
        i32::try_from(value).map_err(|_| self.error(column, format!("{} out of range", value)))
    }

    pub fn get_f64(&self, column: &str) -> Result<f64> {
        match self.cell(column) {
            Some(Cell::Float(x)) => Ok(*x),
            Some(Cell::Integer(n)) => Ok(*n as f64),
            Some(Cell::Text(text)) => text
                .trim()
                .parse()
                .map_err(|_| self.error(column, format!("'{}' is not a number", text))),
            Some(Cell::Null) | None => Err(self.error(column, "unexpected null")),
            Some(other) => Err(self.error(column, format!("expected number, got {:?}", other))),
        }
    }
}

/// A record decodable from a warehouse row
pub trait FromRow: Sized {
    /// Record name used in errors and logs
    const RECORD: &'static str;

    /// Columns the record reads
    const COLUMNS: &'static [&'static str];

    fn from_row(row: &RowRef<'_>) -> Result<Self>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    struct Pair {
        name: String,
        count: i64,
    }

    impl FromRow for Pair {
        const RECORD: &'static str = "pair";
        const COLUMNS: &'static [&'static str] = &["name", "count"];

        fn from_row(row: &RowRef<'_>) -> Result<Self> {
            Ok(Self {
                name: row.get_string("name")?,
                count: row.get_i64("count")?,
            })
        }
    }

    fn result(rows: Vec<Vec<Cell>>) -> TabularResult {
        TabularResult::new(
            vec![
                Column::new("name", ColumnType::Text),
                Column::new("count", ColumnType::Integer),
            ],
            rows,
        )
    }

    #[test]
    fn test_decode_rows() {
        let table = result(vec![vec!["a".into(), 1i64.into()], vec!["b".into(), "2".into()]]);
        let pairs: Vec<Pair> = table.decode().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].name, "b");
        assert_eq!(pairs[1].count, 2);
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let table = TabularResult::new(vec![Column::new("name", ColumnType::Text)], vec![]);
        let err = table.decode::<Pair>().err().unwrap();
        assert!(matches!(err, IngestError::Decode { ref message, .. } if message.contains("count")));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let table = TabularResult::new(
            vec![
                Column::new("name", ColumnType::Text),
                Column::new("count", ColumnType::Integer),
                Column::new("extra", ColumnType::Boolean),
            ],
            vec![vec!["a".into(), 3i64.into(), Cell::Boolean(true)]],
        );
        assert_eq!(table.decode::<Pair>().unwrap()[0].count, 3);
    }

    #[test]
    fn test_null_and_bad_values_are_errors() {
        let table = result(vec![vec!["a".into(), Cell::Null]]);
        assert!(table.decode::<Pair>().is_err());

        let table = result(vec![vec!["a".into(), "many".into()]]);
        assert!(table.decode::<Pair>().is_err());
    }

    #[test]
    fn test_integer_identifier_read_as_text() {
        let table = result(vec![vec![Cell::Integer(3304557), 1i64.into()]]);
        assert_eq!(table.decode::<Pair>().unwrap()[0].name, "3304557");
    }

    #[test]
    fn test_column_type_mapping() {
        assert_eq!(ColumnType::from_bigquery("INT64"), ColumnType::Integer);
        assert_eq!(ColumnType::from_bigquery("float"), ColumnType::Float);
        assert_eq!(ColumnType::from_bigquery("BOOL"), ColumnType::Boolean);
        assert_eq!(ColumnType::from_bigquery("GEOGRAPHY"), ColumnType::Text);
    }
}
