use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// An enum for which snowflake type is stored in this column
pub enum ColumnType {
    Fixed,
    Real,
    Decfloat,
    Text,
    Date,
    Variant,
    TimestampLtz,
    TimestampNtz,
    TimestampTz,
    Object,
    Array,
    Map,
    Binary,
    Time,
    Boolean,
    Null,
    Slice,
    ChangeType,
    NotSupported,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
/// Describes a column in a [`QueryResult`](`crate::driver::query::QueryResult`)
///
/// For structured types (`OBJECT`/`ARRAY`/`MAP`), `fields` recursively
/// describes the element/value columns. For `MAP`, `fields[0]` is the key
/// column and `fields[1]` is the value column; for `ARRAY`/`OBJECT`,
/// `fields` lists the element/member columns in server order.
pub struct Column {
    #[serde(rename = "type")]
    pub col_type: ColumnType,
    pub name: String,

    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,

    #[serde(default)]
    pub byte_length: Option<i64>,

    #[serde(default)]
    pub fields: Option<Vec<Arc<Column>>>,
}

impl Column {
    /// Convenience constructor for a leaf (non-structured) column, mostly
    /// useful in tests that build a `Column` by hand instead of
    /// deserializing one from a server response.
    pub fn leaf(name: impl Into<String>, col_type: ColumnType) -> Self {
        Self {
            col_type,
            name: name.into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: None,
        }
    }

    /// The key column of a `MAP`, if this is a `MAP` column with metadata.
    pub fn map_key_field(&self) -> Option<&Arc<Column>> {
        if self.col_type != ColumnType::Map {
            return None;
        }
        self.fields.as_ref().and_then(|f| f.first())
    }

    /// The value column of a `MAP`, if this is a `MAP` column with metadata.
    pub fn map_value_field(&self) -> Option<&Arc<Column>> {
        if self.col_type != ColumnType::Map {
            return None;
        }
        self.fields.as_ref().and_then(|f| f.get(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_fields_are_key_then_value() {
        let col = Column {
            col_type: ColumnType::Map,
            name: "m".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![
                Arc::new(Column::leaf("key", ColumnType::Text)),
                Arc::new(Column::leaf("value", ColumnType::Fixed)),
            ]),
        };

        assert_eq!(col.map_key_field().unwrap().col_type, ColumnType::Text);
        assert_eq!(col.map_value_field().unwrap().col_type, ColumnType::Fixed);
    }

    #[test]
    fn non_map_has_no_map_fields() {
        let col = Column::leaf("x", ColumnType::Text);
        assert!(col.map_key_field().is_none());
        assert!(col.map_value_field().is_none());
    }
}
