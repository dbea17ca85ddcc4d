//! Typed access over a decoded `OBJECT` cell (spec component C7).
//!
//! Rust has no runtime field reflection, so the "scan a structured value
//! into any target type by field name/tag" behavior other drivers implement
//! reflectively is expressed here as a trait contract instead
//! ([`FromStructured`]): the crate supplies the typed getters and
//! nested-aggregate recursion, and a concrete type's `from_structured` body
//! is written (or derived, by an external proc-macro, out of scope here)
//! field by field.

use std::collections::HashMap;
use std::sync::Arc;

#[cfg(feature = "decimal")]
use rust_decimal::prelude::ToPrimitive;

use crate::{
    SnowflakeError,
    errors::ErrorKind,
    kind_error,
    driver::primitives::{
        cell::{Cell, CellValue},
        column::Column,
        convert::{decode_array_elements, decode_map_entries, decode_object_fields},
    },
};

#[cfg(feature = "chrono")]
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};

/// How a Rust struct field maps to a Snowflake `OBJECT`'s wire field name,
/// per spec.md §4.7's `ScanTo` contract. A derive macro (out of scope here)
/// would emit one of these per field from its `sf:"..."` attribute; a
/// hand-written [`FromStructured`] impl passes it explicitly.
#[derive(Debug, Clone, Copy)]
pub enum FieldTag<'a> {
    /// No `sf` tag: the wire name is the Rust field name with its first
    /// letter lowercased (`UserId` -> `userId`).
    Default,
    /// `sf:"wireName"`: use this literal wire name instead.
    Rename(&'a str),
    /// `sf:"-,ignore"`: the field has no wire counterpart and must not be
    /// looked up.
    Ignore,
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A decoded `OBJECT` cell, addressable by field name.
///
/// Built by [`StructuredValue::from_object`] from a column's `fields`
/// metadata and the raw json root Snowflake sent for that cell.
#[derive(Debug, Clone)]
pub struct StructuredValue {
    fields: HashMap<String, Cell>,
    metadata: Vec<Arc<Column>>,
}

impl StructuredValue {
    /// Decodes `root` (an `OBJECT` cell's parsed json) against `col`'s
    /// field metadata into a name-addressable value.
    pub fn from_object(col: &Column, root: &serde_json::Value) -> Result<Self, SnowflakeError> {
        let metadata = col.fields.clone().unwrap_or_default();
        let decoded = decode_object_fields(col, root)?;

        let mut fields = HashMap::with_capacity(decoded.len());
        for (name, value) in decoded {
            let field_col = metadata
                .iter()
                .find(|c| c.name == name)
                .cloned()
                .unwrap_or_else(|| Arc::new(Column::leaf(name.clone(), column_type_of(&value))));
            fields.insert(name, Cell { col: field_col, value });
        }

        Ok(Self { fields, metadata })
    }

    /// The field columns this value was decoded against, in server order.
    pub fn metadata(&self) -> &[Arc<Column>] {
        &self.metadata
    }

    /// The raw decoded cell for `name`, with no type coercion.
    pub fn get_raw(&self, name: &str) -> Option<&Cell> {
        self.fields.get(name)
    }

    fn field_of(&self, name: &str) -> Result<&Cell, SnowflakeError> {
        self.fields
            .get(name)
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "missing structured field", name))
    }

    /// Resolves a Rust struct field to the wire field name `ScanTo` would
    /// look up for it (spec.md §4.7): `rust_field` with its first letter
    /// lowercased by default, overridden by `tag`. `None` means the field
    /// is tagged `sf:"-,ignore"` and has no wire counterpart at all.
    pub fn wire_name(rust_field: &str, tag: FieldTag) -> Option<String> {
        match tag {
            FieldTag::Ignore => None,
            FieldTag::Rename(name) => Some(name.to_string()),
            FieldTag::Default => Some(lowercase_first(rust_field)),
        }
    }

    /// The raw decoded cell for `rust_field`, resolved through [`FieldTag`]
    /// instead of taken as a literal wire name.
    pub fn get_raw_tagged(&self, rust_field: &str, tag: FieldTag) -> Option<&Cell> {
        Self::wire_name(rust_field, tag).and_then(|name| self.fields.get(&name))
    }

    fn field_of_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<&Cell, SnowflakeError> {
        self.get_raw_tagged(rust_field, tag)
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "missing structured field", rust_field))
    }

    pub fn get_string_opt(&self, name: &str) -> Result<Option<String>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Text(v) => Ok(v.clone()),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TEXT", name)),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<String, SnowflakeError> {
        self.get_string_opt(name)?
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "field is null", name))
    }

    pub fn get_bool_opt(&self, name: &str) -> Result<Option<bool>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Boolean(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not BOOLEAN", name)),
        }
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, SnowflakeError> {
        self.get_bool_opt(name)?
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "field is null", name))
    }

    pub fn get_f64_opt(&self, name: &str) -> Result<Option<f64>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Real(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not REAL", name)),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, SnowflakeError> {
        self.get_f64_opt(name)?
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "field is null", name))
    }

    #[cfg(feature = "decimal")]
    pub fn get_i64_opt(&self, name: &str) -> Result<Option<i64>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Fixed(Some(d)) => Ok(Some(d.to_i64().ok_or_else(|| {
                kind_error!(ErrorKind::TypeConversion, "fixed field does not fit in i64", name)
            })?)),
            CellValue::Fixed(None) | CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not FIXED", name)),
        }
    }

    #[cfg(not(feature = "decimal"))]
    pub fn get_i64_opt(&self, name: &str) -> Result<Option<i64>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Fixed(Some(s)) => Ok(Some(s.parse().map_err(|_| {
                kind_error!(ErrorKind::TypeConversion, "fixed field is not an integer", name)
            })?)),
            CellValue::Fixed(None) | CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not FIXED", name)),
        }
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, SnowflakeError> {
        self.get_i64_opt(name)?
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "field is null", name))
    }

    pub fn get_bytes_opt(&self, name: &str) -> Result<Option<Vec<u8>>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Binary(v) => Ok(v.clone()),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not BINARY", name)),
        }
    }

    pub fn get_bytes(&self, name: &str) -> Result<Vec<u8>, SnowflakeError> {
        self.get_bytes_opt(name)?
            .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "field is null", name))
    }

    #[cfg(feature = "chrono")]
    pub fn get_date_opt(&self, name: &str) -> Result<Option<NaiveDate>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Date(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not DATE", name)),
        }
    }

    #[cfg(feature = "chrono")]
    pub fn get_time_opt(&self, name: &str) -> Result<Option<NaiveTime>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::Time(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TIME", name)),
        }
    }

    #[cfg(feature = "chrono")]
    pub fn get_timestamp_tz_opt(
        &self,
        name: &str,
    ) -> Result<Option<DateTime<FixedOffset>>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::TimestampTz(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TIMESTAMP_TZ", name)),
        }
    }

    #[cfg(feature = "chrono")]
    pub fn get_timestamp_ltz_opt(&self, name: &str) -> Result<Option<DateTime<Utc>>, SnowflakeError> {
        match &self.field_of(name)?.value {
            CellValue::TimestampLtz(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TIMESTAMP_LTZ", name)),
        }
    }

    /// Decodes a nested `OBJECT` field into its own addressable value.
    pub fn get_struct(&self, name: &str) -> Result<StructuredValue, SnowflakeError> {
        let cell = self.field_of(name)?;
        match &cell.value {
            CellValue::Object(Some(v)) => StructuredValue::from_object(&cell.col, v),
            CellValue::Object(None) | CellValue::Null => {
                Err(kind_error!(ErrorKind::TypeConversion, "nested struct field is null", name))
            }
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not OBJECT", name)),
        }
    }

    /// Decodes an `ARRAY` field into its per-element [`CellValue`]s.
    pub fn get_array(&self, name: &str) -> Result<Vec<CellValue>, SnowflakeError> {
        let cell = self.field_of(name)?;
        match &cell.value {
            CellValue::Array(Some(v)) => decode_array_elements(&cell.col, v),
            CellValue::Array(None) | CellValue::Null => Ok(Vec::new()),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not ARRAY", name)),
        }
    }

    /// Decodes a `MAP` field into `(key, value)` pairs.
    pub fn get_map(&self, name: &str) -> Result<Vec<(String, CellValue)>, SnowflakeError> {
        let cell = self.field_of(name)?;
        match &cell.value {
            CellValue::Map(Some(v)) => decode_map_entries(&cell.col, v),
            CellValue::Map(None) | CellValue::Null => Ok(Vec::new()),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not MAP", name)),
        }
    }

    /// Decodes an `ARRAY` of `OBJECT` field into one [`StructuredValue`]
    /// per element — the "nested-aggregate recursion" case (an array of
    /// structs, not a struct containing a single nested struct).
    pub fn get_nested(&self, name: &str) -> Result<Vec<StructuredValue>, SnowflakeError> {
        let cell = self.field_of(name)?;
        let element_col = cell
            .col
            .fields
            .as_deref()
            .and_then(|f| f.first())
            .ok_or_else(|| {
                kind_error!(ErrorKind::TypeConversion, "array field missing element metadata", name)
            })?;

        match &cell.value {
            CellValue::Array(Some(v)) => {
                let elems = v
                    .as_array()
                    .ok_or_else(|| kind_error!(ErrorKind::TypeConversion, "ARRAY root is not a json array", name))?;
                elems
                    .iter()
                    .map(|elem| StructuredValue::from_object(element_col, elem))
                    .collect()
            }
            CellValue::Array(None) | CellValue::Null => Ok(Vec::new()),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not ARRAY", name)),
        }
    }

    /// `get_string`, resolving `rust_field` through [`FieldTag`] rather than
    /// taking it as a literal wire name — what a [`FromStructured`] impl
    /// calls for a "simple scalar" dispatch (spec.md §4.7).
    pub fn get_string_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<String, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::Text(Some(v)) => Ok(v.clone()),
            CellValue::Text(None) | CellValue::Null => {
                Err(kind_error!(ErrorKind::TypeConversion, "field is null", rust_field))
            }
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TEXT", rust_field)),
        }
    }

    pub fn get_string_opt_tagged(
        &self,
        rust_field: &str,
        tag: FieldTag,
    ) -> Result<Option<String>, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::Text(v) => Ok(v.clone()),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TEXT", rust_field)),
        }
    }

    pub fn get_bool_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<bool, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::Boolean(Some(v)) => Ok(*v),
            CellValue::Boolean(None) | CellValue::Null => {
                Err(kind_error!(ErrorKind::TypeConversion, "field is null", rust_field))
            }
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not BOOLEAN", rust_field)),
        }
    }

    pub fn get_f64_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<f64, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::Real(Some(v)) => Ok(*v),
            CellValue::Real(None) | CellValue::Null => {
                Err(kind_error!(ErrorKind::TypeConversion, "field is null", rust_field))
            }
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not REAL", rust_field)),
        }
    }

    pub fn get_i64_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<i64, SnowflakeError> {
        let cell = self.field_of_tagged(rust_field, tag)?;
        #[cfg(feature = "decimal")]
        {
            match &cell.value {
                CellValue::Fixed(Some(d)) => d.to_i64().ok_or_else(|| {
                    kind_error!(ErrorKind::TypeConversion, "fixed field does not fit in i64", rust_field)
                }),
                CellValue::Fixed(None) | CellValue::Null => {
                    Err(kind_error!(ErrorKind::TypeConversion, "field is null", rust_field))
                }
                _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not FIXED", rust_field)),
            }
        }
        #[cfg(not(feature = "decimal"))]
        {
            match &cell.value {
                CellValue::Fixed(Some(s)) => s.parse().map_err(|_| {
                    kind_error!(ErrorKind::TypeConversion, "fixed field is not an integer", rust_field)
                }),
                CellValue::Fixed(None) | CellValue::Null => {
                    Err(kind_error!(ErrorKind::TypeConversion, "field is null", rust_field))
                }
                _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not FIXED", rust_field)),
            }
        }
    }

    /// `get_bytes`, resolved through [`FieldTag`] — what a `FromStructured`
    /// impl calls for a "byte-slice field" dispatch (spec.md §4.7).
    pub fn get_bytes_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<Vec<u8>, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::Binary(Some(v)) => Ok(v.clone()),
            CellValue::Binary(None) | CellValue::Null => {
                Err(kind_error!(ErrorKind::TypeConversion, "field is null", rust_field))
            }
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not BINARY", rust_field)),
        }
    }

    #[cfg(feature = "chrono")]
    pub fn get_timestamp_tz_opt_tagged(
        &self,
        rust_field: &str,
        tag: FieldTag,
    ) -> Result<Option<DateTime<FixedOffset>>, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::TimestampTz(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TIMESTAMP_TZ", rust_field)),
        }
    }

    /// `get_time`, resolved through [`FieldTag`] — what a `FromStructured`
    /// impl calls for a "`time`-typed struct field" dispatch (spec.md §4.7).
    #[cfg(feature = "chrono")]
    pub fn get_time_opt_tagged(
        &self,
        rust_field: &str,
        tag: FieldTag,
    ) -> Result<Option<NaiveTime>, SnowflakeError> {
        match &self.field_of_tagged(rust_field, tag)?.value {
            CellValue::Time(v) => Ok(*v),
            CellValue::Null => Ok(None),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not TIME", rust_field)),
        }
    }

    /// `get_struct`, resolved through [`FieldTag`] — the "nested aggregate
    /// field → instantiate, recurse" dispatch from spec.md §4.7.
    pub fn get_struct_tagged(&self, rust_field: &str, tag: FieldTag) -> Result<StructuredValue, SnowflakeError> {
        let cell = self.field_of_tagged(rust_field, tag)?;
        match &cell.value {
            CellValue::Object(Some(v)) => StructuredValue::from_object(&cell.col, v),
            CellValue::Object(None) | CellValue::Null => {
                Err(kind_error!(ErrorKind::TypeConversion, "nested struct field is null", rust_field))
            }
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not OBJECT", rust_field)),
        }
    }

    /// `get_nested`, resolved through [`FieldTag`] — an array-of-structs
    /// nested-aggregate dispatch (spec.md §4.7).
    pub fn get_nested_tagged(
        &self,
        rust_field: &str,
        tag: FieldTag,
    ) -> Result<Vec<StructuredValue>, SnowflakeError> {
        let cell = self.field_of_tagged(rust_field, tag)?;
        let element_col = cell
            .col
            .fields
            .as_deref()
            .and_then(|f| f.first())
            .ok_or_else(|| {
                kind_error!(ErrorKind::TypeConversion, "array field missing element metadata", rust_field)
            })?;

        match &cell.value {
            CellValue::Array(Some(v)) => {
                let elems = v.as_array().ok_or_else(|| {
                    kind_error!(ErrorKind::TypeConversion, "ARRAY root is not a json array", rust_field)
                })?;
                elems
                    .iter()
                    .map(|elem| StructuredValue::from_object(element_col, elem))
                    .collect()
            }
            CellValue::Array(None) | CellValue::Null => Ok(Vec::new()),
            _ => Err(kind_error!(ErrorKind::TypeConversion, "field is not ARRAY", rust_field)),
        }
    }
}

fn column_type_of(value: &CellValue) -> crate::driver::primitives::column::ColumnType {
    use crate::driver::primitives::column::ColumnType;
    match value {
        CellValue::Fixed(_) => ColumnType::Fixed,
        CellValue::Decfloat(_) => ColumnType::Decfloat,
        CellValue::Real(_) => ColumnType::Real,
        CellValue::Text(_) => ColumnType::Text,
        CellValue::Boolean(_) => ColumnType::Boolean,
        CellValue::Variant(_) => ColumnType::Variant,
        CellValue::Object(_) => ColumnType::Object,
        CellValue::Array(_) => ColumnType::Array,
        CellValue::Map(_) => ColumnType::Map,
        CellValue::TimestampLtz(_) => ColumnType::TimestampLtz,
        CellValue::TimestampNtz(_) => ColumnType::TimestampNtz,
        CellValue::TimestampTz(_) => ColumnType::TimestampTz,
        CellValue::Time(_) => ColumnType::Time,
        CellValue::Date(_) => ColumnType::Date,
        CellValue::Binary(_) => ColumnType::Binary,
        CellValue::Null => ColumnType::Null,
        CellValue::Slice(_) => ColumnType::Slice,
        CellValue::ChangeType(_) => ColumnType::ChangeType,
        CellValue::NotSupported(_) => ColumnType::NotSupported,
    }
}

/// Statically typed scan target for a [`StructuredValue`], the
/// non-reflective substitute for other drivers' "scan by field name/tag"
/// behavior (see the module docs). An implementation resolves each of its
/// fields through [`StructuredValue::wire_name`]/the `_tagged` getters
/// (`get_string_tagged`, `get_struct_tagged`, ...) rather than hardcoding
/// the wire field name, so the §4.7 rename/ignore rule is honored uniformly
/// instead of ad hoc per type.
pub trait FromStructured: Sized {
    fn from_structured(value: &StructuredValue) -> Result<Self, SnowflakeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::primitives::column::ColumnType;

    fn leaf_arc(name: &str, t: ColumnType) -> Arc<Column> {
        Arc::new(Column::leaf(name, t))
    }

    #[test]
    fn reads_flat_fields_by_name() {
        let col = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![
                leaf_arc("name", ColumnType::Text),
                leaf_arc("active", ColumnType::Boolean),
            ]),
        };

        let root = serde_json::json!({ "name": "alice", "active": "true" });
        let value = StructuredValue::from_object(&col, &root).unwrap();

        assert_eq!(value.get_string("name").unwrap(), "alice");
        assert!(value.get_bool("active").unwrap());
    }

    #[test]
    fn missing_field_is_type_conversion_error() {
        let col = Column::leaf("o", ColumnType::Object);
        let root = serde_json::json!({});
        let value = StructuredValue::from_object(&col, &root).unwrap();

        let err = value.get_string("missing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeConversion);
    }

    #[test]
    fn recurses_into_nested_object() {
        let inner = Column {
            col_type: ColumnType::Object,
            name: "address".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![leaf_arc("city", ColumnType::Text)]),
        };
        let outer = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![Arc::new(inner)]),
        };

        let root = serde_json::json!({ "address": { "city": "SF" } });
        let value = StructuredValue::from_object(&outer, &root).unwrap();
        let nested = value.get_struct("address").unwrap();
        assert_eq!(nested.get_string("city").unwrap(), "SF");
    }

    #[test]
    fn nested_array_of_objects_decodes_per_element() {
        let item_col = Column {
            col_type: ColumnType::Object,
            name: "item".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![leaf_arc("sku", ColumnType::Text)]),
        };
        let array_col = Column {
            col_type: ColumnType::Array,
            name: "items".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![Arc::new(item_col)]),
        };
        let outer = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![Arc::new(array_col)]),
        };

        let root = serde_json::json!({ "items": [{ "sku": "a" }, { "sku": "b" }] });
        let value = StructuredValue::from_object(&outer, &root).unwrap();
        let items = value.get_nested("items").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].get_string("sku").unwrap(), "b");
    }

    #[test]
    fn wire_name_default_lowercases_first_letter_only() {
        assert_eq!(StructuredValue::wire_name("UserId", FieldTag::Default).unwrap(), "userId");
        assert_eq!(StructuredValue::wire_name("Name", FieldTag::Default).unwrap(), "name");
    }

    #[test]
    fn wire_name_rename_tag_overrides_default() {
        assert_eq!(
            StructuredValue::wire_name("Email", FieldTag::Rename("emailAddress")).unwrap(),
            "emailAddress"
        );
    }

    #[test]
    fn wire_name_ignore_tag_yields_none() {
        assert!(StructuredValue::wire_name("Internal", FieldTag::Ignore).is_none());
    }

    #[test]
    fn get_string_tagged_resolves_default_lowercased_name() {
        let col = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![leaf_arc("userId", ColumnType::Text)]),
        };
        let root = serde_json::json!({ "userId": "u-1" });
        let value = StructuredValue::from_object(&col, &root).unwrap();

        assert_eq!(value.get_string_tagged("UserId", FieldTag::Default).unwrap(), "u-1");
    }

    #[test]
    fn get_string_tagged_honors_rename_tag() {
        let col = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![leaf_arc("emailAddress", ColumnType::Text)]),
        };
        let root = serde_json::json!({ "emailAddress": "a@example.com" });
        let value = StructuredValue::from_object(&col, &root).unwrap();

        assert_eq!(
            value
                .get_string_tagged("Email", FieldTag::Rename("emailAddress"))
                .unwrap(),
            "a@example.com"
        );
    }

    /// A hand-written `FromStructured` impl in the shape a derive macro
    /// would emit: each field resolved through its [`FieldTag`], with an
    /// `sf:"-,ignore"`-tagged field never looked up at all.
    struct Account {
        user_id: String,
        email: String,
    }

    impl FromStructured for Account {
        fn from_structured(value: &StructuredValue) -> Result<Self, SnowflakeError> {
            Ok(Account {
                user_id: value.get_string_tagged("user_id", FieldTag::Default)?,
                email: value.get_string_tagged("Email", FieldTag::Rename("emailAddress"))?,
            })
        }
    }

    #[test]
    fn from_structured_impl_scans_via_tagged_getters() {
        let col = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![
                leaf_arc("user_id", ColumnType::Text),
                leaf_arc("emailAddress", ColumnType::Text),
            ]),
        };
        let root = serde_json::json!({ "user_id": "u-1", "emailAddress": "a@example.com", "internal": "secret" });
        let value = StructuredValue::from_object(&col, &root).unwrap();

        let account = Account::from_structured(&value).unwrap();
        assert_eq!(account.user_id, "u-1");
        assert_eq!(account.email, "a@example.com");
    }

    #[test]
    fn get_struct_tagged_recurses_through_rename() {
        let inner = Column {
            col_type: ColumnType::Object,
            name: "homeAddress".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![leaf_arc("city", ColumnType::Text)]),
        };
        let outer = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![Arc::new(inner)]),
        };

        let root = serde_json::json!({ "homeAddress": { "city": "SF" } });
        let value = StructuredValue::from_object(&outer, &root).unwrap();
        let nested = value
            .get_struct_tagged("Address", FieldTag::Rename("homeAddress"))
            .unwrap();
        assert_eq!(nested.get_string("city").unwrap(), "SF");
    }
}
