//! Bidirectional wire↔native value conversion (spec component C6).
//!
//! This module merges and generalizes what the teacher split across
//! `row.rs::cast_snowflake_to_rust_type` (JSON wire → native) and
//! `cell.rs::Into<Option<String>>` (native → wire, used for binds). It adds
//! the Arrow-side decode the teacher never wrote, and the structured
//! (OBJECT/ARRAY/MAP) walkers the JSON path only partially covered (the
//! teacher decoded a structured cell straight into a `serde_json::Value`
//! with no further typing).

use std::str::FromStr;

#[cfg(feature = "chrono")]
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
#[cfg(feature = "decimal")]
use rust_decimal::Decimal;

use crate::{
    SnowflakeError,
    driver::primitives::{
        cell::CellValue,
        column::{Column, ColumnType},
    },
    error, this_errors,
};

/// Decodes one JSON-wire cell (a nullable string) into a [`CellValue`],
/// dispatching on the column's declared [`ColumnType`]. `raw` is `None` for
/// a wire `null`.
pub fn decode_json_cell(col: &Column, raw: Option<&str>) -> Result<CellValue, SnowflakeError> {
    let Some(raw) = raw else {
        return Ok(super::cell::get_null_from_column(col));
    };

    match col.col_type {
        #[cfg(feature = "decimal")]
        ColumnType::Fixed | ColumnType::Decfloat => {
            let decimal = this_errors!(
                "failed to convert FIXED/DECFLOAT to Decimal",
                Decimal::from_str(raw)
            );

            if col.col_type == ColumnType::Fixed {
                Ok(CellValue::Fixed(Some(decimal)))
            } else {
                Ok(CellValue::Decfloat(Some(decimal)))
            }
        }

        #[cfg(not(feature = "decimal"))]
        ColumnType::Fixed | ColumnType::Decfloat => Ok(CellValue::Text(Some(raw.to_string()))),

        #[cfg(feature = "chrono")]
        ColumnType::Date => {
            let days = this_errors!("failed to decode DATE to i32", i32::from_str(raw));
            Ok(CellValue::Date(days_since_epoch_to_date(days)))
        }

        #[cfg(feature = "chrono")]
        ColumnType::Time => {
            let (seconds, nanoseconds) = split_seconds_and_scaled_fraction(raw, col.scale)?;
            Ok(CellValue::Time(NaiveTime::from_num_seconds_from_midnight_opt(
                seconds, nanoseconds,
            )))
        }

        #[cfg(feature = "chrono")]
        ColumnType::TimestampLtz => {
            let (seconds, nanoseconds) = split_seconds_and_scaled_fraction(raw, col.scale)?;
            let ts = Utc.timestamp_opt(seconds, nanoseconds).single();
            Ok(CellValue::TimestampLtz(ts))
        }

        #[cfg(feature = "chrono")]
        ColumnType::TimestampNtz => {
            let (seconds, nanoseconds) = split_seconds_and_scaled_fraction(raw, col.scale)?;
            let ts = DateTime::from_timestamp(seconds, nanoseconds).map(|dt| dt.naive_utc());
            Ok(CellValue::TimestampNtz(ts))
        }

        #[cfg(feature = "chrono")]
        ColumnType::TimestampTz => {
            let (nanos_str, offset) = raw.split_once(' ').ok_or(error!("malformed TIMESTAMP_TZ"))?;

            // Unlike TIMESTAMP_NTZ/LTZ's dotted "seconds.fraction" form, the
            // wire sends TIMESTAMP_TZ's instant as a single nanosecond-scale
            // integer (spec.md §4.6/§8's "1549491451123456789 1080" vector).
            let nanos =
                this_errors!("failed to convert TIMESTAMP_TZ nanos to i64", i64::from_str(nanos_str));
            let seconds = nanos.div_euclid(1_000_000_000);
            let nanoseconds = nanos.rem_euclid(1_000_000_000) as u32;

            let offset_plus_1440 =
                this_errors!("failed to convert TIMESTAMP_TZ offset to i32", i32::from_str(offset));
            let offset_minutes = offset_plus_1440 - 1440;

            let tz_offset = FixedOffset::east_opt(offset_minutes * 60)
                .ok_or(error!(format!("invalid offset in TIMESTAMP_TZ {offset_plus_1440}")))?;

            let ts = tz_offset.timestamp_opt(seconds, nanoseconds).single();
            Ok(CellValue::TimestampTz(ts))
        }

        #[cfg(not(feature = "chrono"))]
        ColumnType::Date
        | ColumnType::Time
        | ColumnType::TimestampLtz
        | ColumnType::TimestampNtz
        | ColumnType::TimestampTz => Ok(CellValue::Text(Some(raw.to_string()))),

        ColumnType::Boolean => Ok(CellValue::Boolean(Some(raw == "true"))),
        ColumnType::Real => Ok(this_errors!(
            "failed to convert from REAL to f64",
            f64::from_str(raw).map(Some).map(CellValue::Real)
        )),

        ColumnType::Object => {
            let value: serde_json::Value = this_errors!(
                "failed to convert from OBJECT to json",
                serde_json::from_str(raw)
            );
            Ok(CellValue::Object(Some(value)))
        }
        ColumnType::Array => {
            let value: serde_json::Value = this_errors!(
                "failed to convert from ARRAY to json",
                serde_json::from_str(raw)
            );
            Ok(CellValue::Array(Some(value)))
        }
        ColumnType::Map => {
            let value: serde_json::Value = this_errors!(
                "failed to convert from MAP to json",
                serde_json::from_str(raw)
            );
            Ok(CellValue::Map(Some(value)))
        }
        ColumnType::Variant => {
            let value: serde_json::Value = this_errors!(
                "failed to convert from VARIANT to json",
                serde_json::from_str(raw)
            );
            Ok(CellValue::Variant(Some(value)))
        }

        ColumnType::Binary => Ok(this_errors!(
            "failed to decode BINARY to Vec<u8>",
            hex::decode(raw).map(Some).map(CellValue::Binary)
        )),

        ColumnType::Null => Ok(CellValue::Null),
        ColumnType::Text => Ok(CellValue::Text(Some(raw.to_string()))),
        ColumnType::ChangeType => Ok(CellValue::ChangeType(Some(raw.to_string()))),
        ColumnType::NotSupported => Ok(CellValue::NotSupported(Some(raw.to_string()))),
        ColumnType::Slice => Err(error!("encountered a SLICE type, unsure how to handle")),
    }
}

/// Splits `"<seconds>[.<fraction>]"` into whole seconds and a fraction
/// scaled up to nanoseconds according to the column's declared `scale`
/// (server sends `scale` significant fractional digits; anything short of
/// 9 digits needs scaling up to a full nanosecond count).
fn split_seconds_and_scaled_fraction(
    raw: &str,
    scale: Option<i64>,
) -> Result<(i64, u32), SnowflakeError> {
    let mut parts = raw.splitn(2, '.');
    let whole = parts.next().unwrap_or(raw);
    let seconds =
        this_errors!("failed to convert seconds component to i64", i64::from_str(whole));

    let nanoseconds = match parts.next() {
        Some(fraction_str) if !fraction_str.is_empty() => {
            let mut fraction = this_errors!(
                "failed to convert fractional component to u32",
                u32::from_str(fraction_str)
            );
            if let Some(scale) = scale
                && scale < 9
            {
                fraction *= 10u32.pow((9 - scale) as u32);
            }
            fraction
        }
        _ => 0,
    };

    Ok((seconds, nanoseconds))
}

#[cfg(feature = "chrono")]
fn days_since_epoch_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + EPOCH_DAYS_FROM_CE)
}

#[cfg(feature = "chrono")]
const EPOCH_DAYS_FROM_CE: i32 = 719_163; // 1970-01-01 expressed as days-from-CE

/// Encodes a native [`CellValue`] into its wire string form, used when
/// serializing prepared-statement binds (spec component C9 depends on
/// this). Mirrors the teacher's `Into<Option<String>>` impl, pulled out so
/// it lives next to the decode side instead of as a `std::convert::Into`
/// impl on the value type itself.
pub fn encode_cell(value: CellValue) -> Option<String> {
    match value {
        CellValue::Text(data) => data,
        CellValue::Boolean(data) => data.map(|x| x.to_string()),
        CellValue::Real(data) => data.map(|x| x.to_string()),

        #[cfg(feature = "decimal")]
        CellValue::Fixed(data) | CellValue::Decfloat(data) => data.map(|x| x.to_string()),
        #[cfg(not(feature = "decimal"))]
        CellValue::Fixed(data) | CellValue::Decfloat(data) => data,

        CellValue::Variant(data)
        | CellValue::Array(data)
        | CellValue::Map(data)
        | CellValue::Object(data)
        | CellValue::Slice(data) => data.map(|x| x.to_string()),
        CellValue::Null => None,

        #[cfg(feature = "chrono")]
        CellValue::TimestampLtz(date_time) => date_time.map(|ts| {
            let seconds = (ts.timestamp() as i128) * 1_000_000_000i128;
            let nanoseconds = ts.timestamp_subsec_nanos() as i128;
            (seconds + nanoseconds).to_string()
        }),
        #[cfg(feature = "chrono")]
        CellValue::TimestampNtz(naive_date_time) => naive_date_time.map(|ts| {
            let ts = ts.and_utc();
            let seconds = (ts.timestamp() as i128) * 1_000_000_000i128;
            let nanoseconds = ts.timestamp_subsec_nanos() as i128;
            (seconds + nanoseconds).to_string()
        }),
        #[cfg(feature = "chrono")]
        CellValue::TimestampTz(date_time) => date_time.map(|ts| {
            let offset_minutes_plus_1440 = ts.offset().local_minus_utc() / 60 + 1440;
            let seconds = ts.timestamp() as i128;
            let nanoseconds = ts.timestamp_subsec_nanos() as i128;
            let nanos = (seconds * 1_000_000_000) + nanoseconds;
            format!("{nanos} {offset_minutes_plus_1440}")
        }),
        #[cfg(feature = "chrono")]
        CellValue::Time(naive_time) => naive_time.map(|time| {
            let seconds = time.num_seconds_from_midnight() as i128;
            let nanoseconds = time.nanosecond() as i128;
            ((seconds * 1_000_000_000) + nanoseconds).to_string()
        }),
        #[cfg(feature = "chrono")]
        CellValue::Date(naive_date) => naive_date.and_then(|date| {
            date.and_hms_opt(0, 0, 0)
                .map(|x| x.and_utc().timestamp_millis())
                .map(|x| x.to_string())
        }),

        #[cfg(not(feature = "chrono"))]
        CellValue::Date(x)
        | CellValue::Time(x)
        | CellValue::TimestampTz(x)
        | CellValue::TimestampLtz(x)
        | CellValue::TimestampNtz(x) => x,

        CellValue::Binary(data) => data.map(|x| hex::encode(x)),
        CellValue::ChangeType(data) => data,
        CellValue::NotSupported(data) => data,
    }
}

/// Decodes a structured `OBJECT` cell's JSON root (already a `serde_json`
/// map) into per-field [`CellValue`]s, redecoding each leaf with the
/// matching entry in `col.fields` by name. Spec §4.6's "OBJECT decode"
/// contract.
pub fn decode_object_fields(
    col: &Column,
    root: &serde_json::Value,
) -> Result<Vec<(String, CellValue)>, SnowflakeError> {
    let obj = root
        .as_object()
        .ok_or(error!("OBJECT root is not a json object"))?;

    let field_cols = col
        .fields
        .as_deref()
        .ok_or(error!("OBJECT column is missing field metadata"))?;

    let mut out = Vec::with_capacity(obj.len());
    for field_col in field_cols {
        let raw = obj.get(&field_col.name);
        let value = decode_json_value_as(field_col, raw)?;
        out.push((field_col.name.clone(), value));
    }
    Ok(out)
}

/// Decodes an `ARRAY` cell's JSON root into a `Vec<CellValue>`, one per
/// element, typed against `col.fields[0]` (the element type).
pub fn decode_array_elements(
    col: &Column,
    root: &serde_json::Value,
) -> Result<Vec<CellValue>, SnowflakeError> {
    let arr = root
        .as_array()
        .ok_or(error!("ARRAY root is not a json array"))?;

    let element_col = col
        .fields
        .as_deref()
        .and_then(|f| f.first())
        .ok_or(error!("ARRAY column is missing element metadata"))?;

    arr.iter()
        .map(|elem| decode_json_value_as(element_col, Some(elem)))
        .collect()
}

/// Decodes a `MAP` cell's JSON root (a json object, since map keys are
/// `text`/`fixed`) into `(key, value)` pairs, with the value redecoded
/// against `col.fields[1]` (the declared value type).
pub fn decode_map_entries(
    col: &Column,
    root: &serde_json::Value,
) -> Result<Vec<(String, CellValue)>, SnowflakeError> {
    let obj = root.as_object().ok_or(error!("MAP root is not a json object"))?;

    let value_col = col
        .map_value_field()
        .ok_or(error!("MAP column is missing value metadata"))?;

    obj.iter()
        .map(|(k, v)| Ok((k.clone(), decode_json_value_as(value_col, Some(v))?)))
        .collect()
}

/// Recursively decodes one `serde_json::Value` (already-parsed, as opposed
/// to [`decode_json_cell`] which parses a wire string) against a column's
/// declared type. Used by the structured walkers above when recursing into
/// nested OBJECT/ARRAY/MAP members.
fn decode_json_value_as(
    col: &Column,
    raw: Option<&serde_json::Value>,
) -> Result<CellValue, SnowflakeError> {
    let Some(raw) = raw else {
        return Ok(super::cell::get_null_from_column(col));
    };
    if raw.is_null() {
        return Ok(super::cell::get_null_from_column(col));
    }

    match col.col_type {
        ColumnType::Object => Ok(CellValue::Object(Some(raw.clone()))),
        ColumnType::Array => Ok(CellValue::Array(Some(raw.clone()))),
        ColumnType::Map => Ok(CellValue::Map(Some(raw.clone()))),
        _ => {
            // Nested leaves still arrive wire-encoded as strings even
            // though they sit inside an already-parsed json tree, matching
            // the server's "everything scalar is a string" convention.
            let as_str = match raw {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            decode_json_cell(col, Some(as_str.as_str()))
        }
    }
}

#[cfg(feature = "arrow")]
pub mod arrow_decode {
    use super::*;
    use arrow_array::{
        Array, BinaryArray, BooleanArray, Decimal128Array, Float64Array, Int8Array, Int16Array,
        Int32Array, Int64Array, StringArray, StructArray,
    };

    /// Scale boundary below which a temporal Arrow column is wire-encoded
    /// as a plain scaled `Int64`, and at/above which it is a `{epoch,
    /// fraction[, timezone_idx]}` struct (spec §4.6).
    const SCALED_INT64_MAX_SCALE: i64 = 3;

    /// Decodes row `row_idx` of `array` into a [`CellValue`] per `col`'s
    /// declared type, dispatching between the scaled-int64 and struct wire
    /// shapes for temporal types as described in spec.md §4.6.
    pub fn decode_arrow_cell(
        col: &Column,
        array: &dyn Array,
        row_idx: usize,
    ) -> Result<CellValue, SnowflakeError> {
        if array.is_null(row_idx) {
            return Ok(super::super::cell::get_null_from_column(col));
        }

        match col.col_type {
            ColumnType::Fixed | ColumnType::Decfloat => decode_fixed(col, array, row_idx),
            ColumnType::Real => {
                let arr = downcast::<Float64Array>(array, "REAL")?;
                Ok(CellValue::Real(Some(arr.value(row_idx))))
            }
            ColumnType::Boolean => {
                let arr = downcast::<BooleanArray>(array, "BOOLEAN")?;
                Ok(CellValue::Boolean(Some(arr.value(row_idx))))
            }
            ColumnType::Text | ColumnType::ChangeType | ColumnType::NotSupported => {
                let arr = downcast::<StringArray>(array, "TEXT")?;
                let s = arr.value(row_idx).to_string();
                Ok(match col.col_type {
                    ColumnType::ChangeType => CellValue::ChangeType(Some(s)),
                    ColumnType::NotSupported => CellValue::NotSupported(Some(s)),
                    _ => CellValue::Text(Some(s)),
                })
            }
            ColumnType::Binary => {
                let arr = downcast::<BinaryArray>(array, "BINARY")?;
                Ok(CellValue::Binary(Some(arr.value(row_idx).to_vec())))
            }
            ColumnType::Object | ColumnType::Array | ColumnType::Map | ColumnType::Variant => {
                let arr = downcast::<StringArray>(array, "structured-as-json")?;
                let value: serde_json::Value = this_errors!(
                    "failed to parse structured arrow cell as json",
                    serde_json::from_str(arr.value(row_idx))
                );
                Ok(match col.col_type {
                    ColumnType::Object => CellValue::Object(Some(value)),
                    ColumnType::Array => CellValue::Array(Some(value)),
                    ColumnType::Map => CellValue::Map(Some(value)),
                    _ => CellValue::Variant(Some(value)),
                })
            }

            #[cfg(feature = "chrono")]
            ColumnType::Date => {
                let arr = downcast::<Int32Array>(array, "DATE")?;
                Ok(CellValue::Date(super::days_since_epoch_to_date(
                    arr.value(row_idx),
                )))
            }
            #[cfg(feature = "chrono")]
            ColumnType::Time => {
                let (seconds, nanos) = epoch_and_fraction(col, array, row_idx, None)?;
                Ok(CellValue::Time(NaiveTime::from_num_seconds_from_midnight_opt(
                    seconds as u32,
                    nanos,
                )))
            }
            #[cfg(feature = "chrono")]
            ColumnType::TimestampNtz => {
                let (seconds, nanos) = epoch_and_fraction(col, array, row_idx, None)?;
                Ok(CellValue::TimestampNtz(
                    DateTime::from_timestamp(seconds, nanos).map(|dt| dt.naive_utc()),
                ))
            }
            #[cfg(feature = "chrono")]
            ColumnType::TimestampLtz => {
                let (seconds, nanos) = epoch_and_fraction(col, array, row_idx, None)?;
                Ok(CellValue::TimestampLtz(Utc.timestamp_opt(seconds, nanos).single()))
            }
            #[cfg(feature = "chrono")]
            ColumnType::TimestampTz => {
                let mut tz_idx = None;
                let (seconds, nanos) = epoch_and_fraction(col, array, row_idx, Some(&mut tz_idx))?;
                let offset_minutes = tz_idx.unwrap_or(1440) - 1440;
                let offset = FixedOffset::east_opt(offset_minutes * 60)
                    .ok_or(error!(format!("invalid arrow TIMESTAMP_TZ offset {offset_minutes}")))?;
                Ok(CellValue::TimestampTz(offset.timestamp_opt(seconds, nanos).single()))
            }

            #[cfg(not(feature = "chrono"))]
            ColumnType::Date
            | ColumnType::Time
            | ColumnType::TimestampLtz
            | ColumnType::TimestampNtz
            | ColumnType::TimestampTz => Ok(CellValue::Text(None)),

            ColumnType::Null => Ok(CellValue::Null),
            ColumnType::Slice => Err(error!("encountered a SLICE type, unsure how to handle")),
        }
    }

    fn downcast<'a, T: 'static>(array: &'a dyn Array, what: &'static str) -> Result<&'a T, SnowflakeError> {
        array
            .as_any()
            .downcast_ref::<T>()
            .ok_or(error!(format!("expected arrow array for {what}, got a different physical type")))
    }

    fn decode_fixed(col: &Column, array: &dyn Array, row_idx: usize) -> Result<CellValue, SnowflakeError> {
        let scale = col.scale.unwrap_or(0);

        if let Some(arr) = array.as_any().downcast_ref::<Decimal128Array>() {
            let raw = arr.value(row_idx);
            return Ok(decimal_from_i128(col, raw, scale));
        }

        let raw_i64 = if let Some(arr) = array.as_any().downcast_ref::<Int8Array>() {
            arr.value(row_idx) as i64
        } else if let Some(arr) = array.as_any().downcast_ref::<Int16Array>() {
            arr.value(row_idx) as i64
        } else if let Some(arr) = array.as_any().downcast_ref::<Int32Array>() {
            arr.value(row_idx) as i64
        } else if let Some(arr) = array.as_any().downcast_ref::<Int64Array>() {
            arr.value(row_idx)
        } else {
            return Err(error!("unsupported arrow physical type for FIXED/DECFLOAT"));
        };

        Ok(decimal_from_i128(col, raw_i64 as i128, scale))
    }

    #[cfg(feature = "decimal")]
    fn decimal_from_i128(col: &Column, raw: i128, scale: i64) -> CellValue {
        let decimal = Decimal::from_i128_with_scale(raw, scale.max(0) as u32);
        if col.col_type == ColumnType::Decfloat {
            CellValue::Decfloat(Some(decimal))
        } else {
            CellValue::Fixed(Some(decimal))
        }
    }

    #[cfg(not(feature = "decimal"))]
    fn decimal_from_i128(col: &Column, raw: i128, scale: i64) -> CellValue {
        let formatted = format_scaled_i128(raw, scale);
        if col.col_type == ColumnType::Decfloat {
            CellValue::Decfloat(Some(formatted))
        } else {
            CellValue::Fixed(Some(formatted))
        }
    }

    #[cfg(not(feature = "decimal"))]
    fn format_scaled_i128(raw: i128, scale: i64) -> String {
        if scale <= 0 {
            return raw.to_string();
        }
        let scale = scale as u32;
        let negative = raw < 0;
        let magnitude = raw.unsigned_abs();
        let divisor = 10i128.unsigned_abs().pow(scale);
        let whole = magnitude / divisor;
        let frac = magnitude % divisor;
        let sign = if negative { "-" } else { "" };
        format!("{sign}{whole}.{frac:0width$}", width = scale as usize)
    }

    /// Reads the scaled-int64-or-struct temporal wire shape described in
    /// spec.md §4.6 and returns `(epoch_seconds, fraction_nanos)`. When
    /// `tz_idx_out` is `Some`, also extracts the struct's `timezone_idx`
    /// child (only present for `TIMESTAMP_TZ`).
    fn epoch_and_fraction(
        col: &Column,
        array: &dyn Array,
        row_idx: usize,
        tz_idx_out: Option<&mut Option<i32>>,
    ) -> Result<(i64, u32), SnowflakeError> {
        let scale = col.scale.unwrap_or(0);

        if scale <= SCALED_INT64_MAX_SCALE {
            let arr = downcast::<Int64Array>(array, "scaled temporal int64")?;
            let raw = arr.value(row_idx);
            let scale_factor = 10i64.pow((9 - scale.clamp(0, 9)) as u32);
            let total_nanos = raw as i128 * scale_factor as i128;
            let seconds = (total_nanos / 1_000_000_000) as i64;
            let nanos = (total_nanos.rem_euclid(1_000_000_000)) as u32;
            return Ok((seconds, nanos));
        }

        let arr = downcast::<StructArray>(array, "temporal struct")?;
        let epoch_arr = downcast::<Int64Array>(arr.column_by_name("epoch").ok_or(error!(
            "temporal struct is missing epoch field"
        ))?, "epoch")?;
        let fraction_arr = downcast::<Int32Array>(
            arr.column_by_name("fraction")
                .ok_or(error!("temporal struct is missing fraction field"))?,
            "fraction",
        )?;

        if let Some(out) = tz_idx_out {
            let tz_arr = downcast::<Int32Array>(
                arr.column_by_name("timezoneIdx")
                    .or_else(|| arr.column_by_name("timezone_idx"))
                    .ok_or(error!("timestamp_tz struct is missing timezoneIdx field"))?,
                "timezoneIdx",
            )?;
            *out = Some(tz_arr.value(row_idx));
        }

        Ok((epoch_arr.value(row_idx), fraction_arr.value(row_idx) as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    fn col(t: ColumnType, scale: Option<i64>) -> Column {
        Column {
            col_type: t,
            name: "c".into(),
            precision: None,
            scale,
            nullable: true,
            byte_length: None,
            fields: None,
        }
    }

    #[test]
    fn null_decodes_to_sentinel_not_empty_string() {
        let c = col(ColumnType::Text, None);
        let v = decode_json_cell(&c, None).unwrap();
        match v {
            CellValue::Text(None) => {}
            other => panic!("expected Text(None), got {other:?}"),
        }
    }

    #[cfg(feature = "decimal")]
    #[test]
    fn fixed_scale_preserves_fraction_digits() {
        let c = col(ColumnType::Fixed, Some(5));
        let v = decode_json_cell(&c, Some("1.05430")).unwrap();
        match v {
            CellValue::Fixed(Some(d)) => {
                let s = d.to_string();
                let frac = s.split('.').nth(1).unwrap();
                assert_eq!(frac.len(), 5);
            }
            other => panic!("expected Fixed(Some(..)), got {other:?}"),
        }
    }

    #[cfg(feature = "chrono")]
    #[test]
    fn timestamp_tz_round_trips_offset() {
        let c = col(ColumnType::TimestampTz, Some(9));
        let v = decode_json_cell(&c, Some("1549491451123456789 1080")).unwrap();
        match v {
            CellValue::TimestampTz(Some(ts)) => {
                assert_eq!(ts.offset().local_minus_utc(), -21600);
                assert_eq!(ts.timestamp(), 1549491451);
                assert_eq!(ts.timestamp_subsec_nanos(), 123456789);
            }
            other => panic!("expected TimestampTz(Some(..)), got {other:?}"),
        }

        let wire = encode_cell(v).unwrap();
        assert_eq!(wire, "1549491451123456789 1080");
    }

    #[test]
    fn object_decode_matches_fields_by_name() {
        let value_col = col(ColumnType::Fixed, Some(0));
        let parent = Column {
            col_type: ColumnType::Object,
            name: "o".into(),
            precision: None,
            scale: None,
            nullable: true,
            byte_length: None,
            fields: Some(vec![StdArc::new(Column {
                name: "age".into(),
                ..value_col
            })]),
        };

        let root: serde_json::Value = serde_json::json!({ "age": "42" });
        let fields = decode_object_fields(&parent, &root).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "age");
    }
}
