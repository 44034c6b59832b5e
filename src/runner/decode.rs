//! Column decoding from sqlx rows to JSON values.
//!
//! Conversion runs in two phases: `categorize_type` classifies the
//! engine-reported column type, then a per-engine ladder extracts the value
//! with `try_get` over progressively wider Rust types. A value that fails
//! every rung decodes as JSON null instead of failing the whole row.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo};

use crate::models::DatabaseType;

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    Uuid,
    DateTime,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    match lower.as_str() {
        // SQLite's NUMERIC affinity stores floats
        "numeric" if db == DatabaseType::SQLite => return TypeCategory::Float,
        "bool" | "boolean" => return TypeCategory::Boolean,
        "datetime" | "date" | "time" | "timetz" => return TypeCategory::DateTime,
        // MySQL YEAR decodes as an integer
        "year" => return TypeCategory::Integer,
        "real" | "float4" | "float8" => return TypeCategory::Float,
        "json" | "jsonb" => return TypeCategory::Json,
        "uuid" => return TypeCategory::Uuid,
        "bytea" => return TypeCategory::Binary,
        _ => {}
    }

    // Substring checks, ordered so DECIMAL/NUMERIC and TIMESTAMP win over
    // the broader integer and float matches
    if lower.contains("decimal") || lower.contains("numeric") {
        TypeCategory::Decimal
    } else if lower.contains("timestamp") {
        TypeCategory::DateTime
    } else if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        TypeCategory::Integer
    } else if lower.contains("float") || lower.contains("double") {
        TypeCategory::Float
    } else if lower.contains("blob") || lower.contains("binary") {
        TypeCategory::Binary
    } else {
        // Everything else (varchar, text, char, enum, ...) decodes as text
        TypeCategory::Unknown
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

/// `Type` and `Decode` impls routing DECIMAL/NUMERIC columns through the
/// engine's text representation.
macro_rules! impl_raw_decimal {
    ($db:ty) => {
        impl Type<$db> for RawDecimal {
            fn type_info() -> <$db as sqlx::Database>::TypeInfo {
                <String as Type<$db>>::type_info()
            }

            fn compatible(ty: &<$db as sqlx::Database>::TypeInfo) -> bool {
                let name = ty.name().to_lowercase();
                name.contains("decimal") || name.contains("numeric")
            }
        }

        impl<'r> Decode<'r, $db> for RawDecimal {
            fn decode(
                value: <$db as sqlx::Database>::ValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as Decode<'r, $db>>::decode(value)?;
                Ok(RawDecimal(s.to_string()))
            }
        }
    };
}

impl_raw_decimal!(sqlx::MySql);
impl_raw_decimal!(sqlx::Postgres);

// =============================================================================
// Shared Decode Plumbing
// =============================================================================

/// Expands to the first `try_get` rung that yields a value, mapped into
/// JSON by the paired function. NULL and undecodable values come back as
/// JSON null.
macro_rules! decode_ladder {
    ($row:expr, $idx:expr, { $($ty:ty => $map:expr),+ $(,)? }) => {
        'ladder: {
            $(
                if let Ok(Some(v)) = $row.try_get::<Option<$ty>, _>($idx) {
                    break 'ladder ($map)(v);
                }
            )+
            JsonValue::Null
        }
    };
}

fn int_json(v: impl Into<serde_json::Number>) -> JsonValue {
    JsonValue::Number(v.into())
}

/// NaN and infinity have no JSON number form, those render as strings.
fn float_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn decimal_json(fetched: Result<Option<RawDecimal>, sqlx::Error>) -> JsonValue {
    match fetched {
        Ok(Some(v)) => JsonValue::String(v.0),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            tracing::error!("Failed to decode DECIMAL value: {:?}", e);
            JsonValue::Null
        }
    }
}

/// Text fallback. Columns whose declared type mentions JSON get one parse
/// attempt, some engines report JSON columns as plain text.
fn text_json(fetched: Result<Option<String>, sqlx::Error>, type_name: &str) -> JsonValue {
    match fetched.ok().flatten() {
        Some(v) => {
            if type_name.to_lowercase().contains("json") {
                if let Ok(parsed) = serde_json::from_str::<JsonValue>(&v) {
                    return parsed;
                }
            }
            JsonValue::String(v)
        }
        None => JsonValue::Null,
    }
}

/// Decode binary data to a JSON string: UTF-8 text when the bytes are valid
/// UTF-8, base64 otherwise.
pub fn decode_binary_value(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

// =============================================================================
// Row to JSON
// =============================================================================

/// Trait for converting database rows to JSON maps.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                (col.name().to_string(), mysql_value(self, idx, type_name))
            })
            .collect()
    }
}

impl RowToJson for PgRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                (col.name().to_string(), pg_value(self, idx, type_name))
            })
            .collect()
    }
}

impl RowToJson for SqliteRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                (col.name().to_string(), sqlite_value(self, idx, type_name))
            })
            .collect()
    }
}

fn mysql_value(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
    match categorize_type(type_name, DatabaseType::MySQL) {
        TypeCategory::Decimal => decimal_json(row.try_get::<Option<RawDecimal>, _>(idx)),
        TypeCategory::Integer => {
            if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
                return JsonValue::Null;
            }
            decode_ladder!(row, idx, {
                i8 => int_json,
                i16 => int_json,
                i32 => int_json,
                i64 => int_json,
                u8 => int_json,
                u16 => int_json,
                u32 => int_json,
                u64 => int_json,
            })
        }
        TypeCategory::Boolean => decode_ladder!(row, idx, { bool => JsonValue::Bool }),
        TypeCategory::Float => decode_ladder!(row, idx, {
            f64 => float_json,
            f32 => |v: f32| float_json(f64::from(v)),
        }),
        TypeCategory::Binary => decode_ladder!(row, idx, {
            Vec<u8> => |v: Vec<u8>| decode_binary_value(&v),
        }),
        TypeCategory::Json => decode_ladder!(row, idx, { JsonValue => |v: JsonValue| v }),
        TypeCategory::DateTime => {
            if let Ok(None) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
                return JsonValue::Null;
            }
            decode_ladder!(row, idx, {
                NaiveDateTime => |v: NaiveDateTime| JsonValue::String(v.to_string()),
                DateTime<Utc> => |v: DateTime<Utc>| JsonValue::String(v.to_rfc3339()),
                NaiveDate => |v: NaiveDate| JsonValue::String(v.to_string()),
                NaiveTime => |v: NaiveTime| JsonValue::String(v.to_string()),
            })
        }
        _ => text_json(row.try_get::<Option<String>, _>(idx), type_name),
    }
}

fn pg_value(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
    match categorize_type(type_name, DatabaseType::PostgreSQL) {
        TypeCategory::Decimal => decimal_json(row.try_get::<Option<RawDecimal>, _>(idx)),
        TypeCategory::Integer => {
            if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
                return JsonValue::Null;
            }
            decode_ladder!(row, idx, {
                i16 => int_json,
                i32 => int_json,
                i64 => int_json,
            })
        }
        TypeCategory::Boolean => decode_ladder!(row, idx, { bool => JsonValue::Bool }),
        TypeCategory::Float => decode_ladder!(row, idx, {
            f64 => float_json,
            f32 => |v: f32| float_json(f64::from(v)),
        }),
        TypeCategory::Binary => decode_ladder!(row, idx, {
            Vec<u8> => |v: Vec<u8>| decode_binary_value(&v),
        }),
        TypeCategory::Json => decode_ladder!(row, idx, { JsonValue => |v: JsonValue| v }),
        TypeCategory::Uuid => decode_ladder!(row, idx, { String => JsonValue::String }),
        TypeCategory::DateTime => {
            if let Ok(None) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
                return JsonValue::Null;
            }
            decode_ladder!(row, idx, {
                NaiveDateTime => |v: NaiveDateTime| JsonValue::String(v.to_string()),
                DateTime<Utc> => |v: DateTime<Utc>| JsonValue::String(v.to_rfc3339()),
                NaiveDate => |v: NaiveDate| JsonValue::String(v.to_string()),
                NaiveTime => |v: NaiveTime| JsonValue::String(v.to_string()),
            })
        }
        _ => decode_ladder!(row, idx, { String => JsonValue::String }),
    }
}

fn sqlite_value(row: &SqliteRow, idx: usize, type_name: &str) -> JsonValue {
    match categorize_type(type_name, DatabaseType::SQLite) {
        TypeCategory::Integer => {
            if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
                return JsonValue::Null;
            }
            decode_ladder!(row, idx, {
                i64 => int_json,
                i32 => int_json,
            })
        }
        TypeCategory::Boolean => decode_ladder!(row, idx, { bool => JsonValue::Bool }),
        // NUMERIC affinity lands here as well
        TypeCategory::Float | TypeCategory::Decimal => {
            decode_ladder!(row, idx, { f64 => float_json })
        }
        TypeCategory::Binary => decode_ladder!(row, idx, {
            Vec<u8> => |v: Vec<u8>| decode_binary_value(&v),
        }),
        // SQLite stores date/time as TEXT, INTEGER, or REAL
        TypeCategory::DateTime => decode_ladder!(row, idx, {
            String => JsonValue::String,
            NaiveDateTime => |v: NaiveDateTime| JsonValue::String(v.to_string()),
            i64 => int_json,
        }),
        _ => text_json(row.try_get::<Option<String>, _>(idx), type_name),
    }
}
