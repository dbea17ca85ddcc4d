use std::{fmt::Debug, sync::Arc};

use crate::SnowflakeError;

use super::{column::Column, convert::decode_json_cell};

#[macro_export]
macro_rules! row {
    ($($val:expr),* $(,)?) => {
        vec![
            $(
                $crate::driver::primitives::cell::ToCellValue::to_cell_value($val)
            ),*
        ]
    };
}

/// Backing storage for a [`Row`]'s cells. The JSON chunk decoder (C1/C3/C4)
/// hands back still-wire-encoded strings decoded lazily per cell; the
/// Arrow loader (C5) already has fully-typed [`CellValue`](super::cell::CellValue)s
/// once a record batch is transformed, so there's nothing left to decode.
enum Storage {
    WireStrings(Vec<Option<String>>),
    Decoded(Vec<super::cell::CellValue>),
}

/// A single row in a [`QueryResult`](`crate::driver::query::QueryResult`)
pub struct Row {
    values: Storage,
    columns: Vec<Arc<Column>>,
    pub idx: i64,
}

impl Row {
    /// Builds a row from its still-wire-encoded cell strings (the JSON
    /// decode path, C1/C3/C4's output shape) plus the column metadata
    /// needed to later decode each cell on demand.
    pub fn new_from_strings(columns: Vec<Arc<Column>>, values: Vec<Option<String>>, idx: i64) -> Self {
        Self {
            values: Storage::WireStrings(values),
            columns,
            idx,
        }
    }

    /// Builds a row from already-decoded cell values (the Arrow decode
    /// path, C5/C6's output shape) — no further per-cell conversion is
    /// needed or possible.
    pub fn new_from_cells(
        columns: Vec<Arc<Column>>,
        values: Vec<super::cell::CellValue>,
        idx: i64,
    ) -> Self {
        Self {
            values: Storage::Decoded(values),
            columns,
            idx,
        }
    }

    pub fn get(&self, idx: usize) -> Result<super::cell::Cell, SnowflakeError> {
        let value = match &self.values {
            Storage::WireStrings(values) => decode_json_cell(&self.columns[idx], values[idx].as_deref())?,
            Storage::Decoded(values) => values[idx].clone(),
        };

        Ok(super::cell::Cell {
            col: self.columns[idx].clone(),
            value,
        })
    }
}

impl IntoIterator for Row {
    type Item = Result<super::cell::Cell, SnowflakeError>;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        let cells: Vec<Result<super::cell::Cell, SnowflakeError>> = match self.values {
            Storage::WireStrings(values) => self
                .columns
                .into_iter()
                .zip(values.into_iter())
                .map(|(col, val_str)| {
                    let value = decode_json_cell(&col, val_str.as_deref())?;
                    Ok(super::cell::Cell { col, value })
                })
                .collect(),
            Storage::Decoded(values) => self
                .columns
                .into_iter()
                .zip(values.into_iter())
                .map(|(col, value)| Ok(super::cell::Cell { col, value }))
                .collect(),
        };

        cells.into_iter()
    }
}

impl Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {{\n")?;
        match &self.values {
            Storage::WireStrings(values) => {
                for (idx, item) in values.iter().enumerate() {
                    let col = self.columns.get(idx).unwrap();
                    let cell_value =
                        decode_json_cell(col, item.as_deref()).unwrap_or(super::cell::CellValue::Null);
                    write!(f, "  {}: {}\n", col.name, cell_value)?;
                }
            }
            Storage::Decoded(values) => {
                for (idx, value) in values.iter().enumerate() {
                    let col = self.columns.get(idx).unwrap();
                    write!(f, "  {}: {}\n", col.name, value)?;
                }
            }
        }
        write!(f, "}}")
    }
}
