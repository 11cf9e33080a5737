//! Bind values and scanned column values.
//!
//! [`Value`] is the single dialect-neutral representation used both for
//! placeholder arguments produced while compiling a query and for column
//! values returned by a driver cursor. [`FromValue`] converts a scanned value
//! back into a Rust type.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::fmt;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A bind argument or a scanned column value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in conversion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Time(_) => "time",
            Value::Json(_) => "json",
        }
    }

    /// Render the value as an inline SQL literal.
    ///
    /// Only used for log interpolation; compiled statements always bind.
    pub fn to_sql_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => quote_literal(s),
            Value::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Value::Time(t) => quote_literal(&t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            Value::Json(j) => quote_literal(&j.to_string()),
        }
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "{b:?}"),
            Value::Time(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Json(j) => write!(f, "{j}"),
        }
    }
}

macro_rules! impl_from_value_variant {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $cast)?)
                }
            }
        )*
    };
}

impl_from_value_variant! {
    bool => Bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    DateTime<Utc> => Time,
    serde_json::Value => Json,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Time(v.and_utc())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Time(v.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
    }
}

impl From<uuid::Uuid> for Value {
    fn from(v: uuid::Uuid) -> Self {
        Value::Text(v.to_string())
    }
}

/// Decimals travel as text so no precision is lost before the server
/// parses them.
impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Text(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

type BindResult = Result<IsNull, Box<dyn std::error::Error + Sync + Send>>;

fn is_text_type(ty: &Type) -> bool {
    <&str as ToSql>::accepts(ty)
}

fn bind_int(i: i64, ty: &Type, out: &mut BytesMut) -> BindResult {
    if *ty == Type::INT2 {
        i16::try_from(i)?.to_sql(ty, out)
    } else if *ty == Type::INT4 {
        i32::try_from(i)?.to_sql(ty, out)
    } else if *ty == Type::OID {
        u32::try_from(i)?.to_sql(ty, out)
    } else if *ty == Type::FLOAT4 {
        (i as f32).to_sql(ty, out)
    } else if *ty == Type::FLOAT8 {
        (i as f64).to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::from(i).to_sql(ty, out)
    } else if is_text_type(ty) {
        i.to_string().to_sql(ty, out)
    } else {
        i.to_sql_checked(ty, out)
    }
}

fn bind_float(f: f64, ty: &Type, out: &mut BytesMut) -> BindResult {
    if *ty == Type::FLOAT4 {
        (f as f32).to_sql(ty, out)
    } else if *ty == Type::NUMERIC {
        Decimal::try_from(f)?.to_sql(ty, out)
    } else if *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8 {
        // Only whole numbers inside the i64 range narrow to an integer column.
        if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            bind_int(f as i64, ty, out)
        } else {
            Err(format!("cannot bind non-integral float {f} as {ty}").into())
        }
    } else if is_text_type(ty) {
        f.to_string().to_sql(ty, out)
    } else {
        f.to_sql_checked(ty, out)
    }
}

/// `accepts` is permissive because the variant is only known at bind time.
/// Each variant checks the parameter type itself and fails with a
/// `WrongType` (or a range error) instead of sending mismatched bytes.
impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> BindResult {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => bind_int(*i, ty, out),
            Value::Float(f) => bind_float(*f, ty, out),
            Value::Text(s) => {
                if *ty == Type::UUID {
                    uuid::Uuid::parse_str(s)?.to_sql(ty, out)
                } else if *ty == Type::JSON || *ty == Type::JSONB {
                    serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out)
                } else if *ty == Type::NUMERIC {
                    s.trim().parse::<Decimal>()?.to_sql(ty, out)
                } else {
                    s.to_sql_checked(ty, out)
                }
            }
            Value::Bytes(b) => b.to_sql_checked(ty, out),
            Value::Time(t) => {
                if *ty == Type::TIMESTAMP {
                    t.naive_utc().to_sql(ty, out)
                } else if *ty == Type::DATE {
                    t.date_naive().to_sql(ty, out)
                } else {
                    t.to_sql_checked(ty, out)
                }
            }
            Value::Json(j) => {
                if is_text_type(ty) {
                    j.to_string().to_sql(ty, out)
                } else {
                    j.to_sql_checked(ty, out)
                }
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Destination kind inferred during the declare phase of row
/// materialization.
///
/// Every declared column is scanned into a nullable slot of this kind
/// before the row callback reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Bool,
    Int32,
    Int64,
    Float64,
    String,
    Time,
    /// No typed slot: the raw column value is handed to [`FromValue`].
    Raw,
}

impl ScanKind {
    /// Normalize a driver value into the slot representation of this kind.
    ///
    /// NULL always passes through. Any other value that cannot represent
    /// the kind is an error.
    pub fn scan(self, value: Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        match self {
            ScanKind::Bool => bool::from_value(value).map(Value::Bool),
            ScanKind::Int32 => i32::from_value(value).map(|v| Value::Int(v as i64)),
            ScanKind::Int64 => i64::from_value(value).map(Value::Int),
            ScanKind::Float64 => f64::from_value(value).map(Value::Float),
            ScanKind::String => String::from_value(value).map(Value::Text),
            ScanKind::Time => DateTime::<Utc>::from_value(value).map(Value::Time),
            ScanKind::Raw => Ok(value),
        }
    }
}

/// Conversion from a scanned [`Value`] into a Rust type.
///
/// Implement this for custom column types (for example JSON documents) to
/// make them usable with `Row::scan_into`.
pub trait FromValue: Sized {
    /// Slot kind used for this type during the declare phase.
    const KIND: ScanKind = ScanKind::Raw;

    /// Convert a non-NULL value.
    fn from_value(value: Value) -> Result<Self, String>;

    /// Value to produce for SQL NULL.
    fn from_null() -> Result<Self, String> {
        Err(format!(
            "cannot scan NULL into {}",
            std::any::type_name::<Self>()
        ))
    }

    /// Convert any value, dispatching NULL to [`FromValue::from_null`].
    fn from_nullable(value: Value) -> Result<Self, String> {
        if value.is_null() {
            Self::from_null()
        } else {
            Self::from_value(value)
        }
    }
}

fn mismatch<T>(value: &Value) -> String {
    format!(
        "cannot convert {} into {}",
        value.type_name(),
        std::any::type_name::<T>()
    )
}

impl FromValue for bool {
    const KIND: ScanKind = ScanKind::Bool;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Text(ref s) => match s.as_str() {
                "1" | "t" | "true" | "TRUE" => Ok(true),
                "0" | "f" | "false" | "FALSE" => Ok(false),
                _ => Err(mismatch::<bool>(&value)),
            },
            other => Err(mismatch::<bool>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(false)
    }
}

impl FromValue for i64 {
    const KIND: ScanKind = ScanKind::Int64;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(b as i64),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch::<i64>(&value)),
            other => Err(mismatch::<i64>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(0)
    }
}

impl FromValue for i32 {
    const KIND: ScanKind = ScanKind::Int32;

    fn from_value(value: Value) -> Result<Self, String> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide).map_err(|_| format!("value {wide} out of range for i32"))
    }

    fn from_null() -> Result<Self, String> {
        Ok(0)
    }
}

impl FromValue for f64 {
    const KIND: ScanKind = ScanKind::Float64;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch::<f64>(&value)),
            other => Err(mismatch::<f64>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(0.0)
    }
}

impl FromValue for String {
    const KIND: ScanKind = ScanKind::String;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| e.to_string()),
            Value::Json(j) => Ok(j.to_string()),
            v @ (Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Time(_)) => {
                Ok(v.to_string())
            }
            Value::Null => Err(mismatch::<String>(&Value::Null)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(String::new())
    }
}

impl FromValue for DateTime<Utc> {
    const KIND: ScanKind = ScanKind::Time;

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Time(t) => Ok(t),
            Value::Text(ref s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").map(|t| t.and_utc())
                })
                .map_err(|_| mismatch::<DateTime<Utc>>(&value)),
            other => Err(mismatch::<DateTime<Utc>>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(DateTime::<Utc>::default())
    }
}

impl FromValue for NaiveDateTime {
    const KIND: ScanKind = ScanKind::Time;

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<Utc>::from_value(value).map(|t| t.naive_utc())
    }

    fn from_null() -> Result<Self, String> {
        Ok(NaiveDateTime::default())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch::<Vec<u8>>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(Vec::new())
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(Decimal::from(i)),
            Value::Float(f) => Decimal::try_from(f).map_err(|e| e.to_string()),
            Value::Text(ref s) => s.trim().parse().map_err(|_| mismatch::<Decimal>(&value)),
            other => Err(mismatch::<Decimal>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(Decimal::ZERO)
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| e.to_string()),
            Value::Bytes(b) => serde_json::from_slice(&b).map_err(|e| e.to_string()),
            other => Err(mismatch::<serde_json::Value>(&other)),
        }
    }

    fn from_null() -> Result<Self, String> {
        Ok(serde_json::Value::Null)
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }

    fn from_null() -> Result<Self, String> {
        Ok(Value::Null)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ScanKind = T::KIND;

    fn from_value(value: Value) -> Result<Self, String> {
        T::from_value(value).map(Some)
    }

    fn from_null() -> Result<Self, String> {
        Ok(None)
    }
}

/// JSON column decoded with serde.
///
/// ```ignore
/// let mut questions = Json(Vec::<Question>::new());
/// row.scan_into(&mut questions, &forms.questions);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        let parsed = match value {
            Value::Json(j) => serde_json::from_value(j),
            Value::Text(s) => serde_json::from_str(&s),
            Value::Bytes(b) => serde_json::from_slice(&b),
            other => return Err(mismatch::<T>(&other)),
        };
        parsed.map(Json).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_postgres::types::FromSql;

    fn bind(value: Value, ty: &Type) -> Result<Vec<u8>, String> {
        let mut out = BytesMut::new();
        value
            .to_sql_checked(ty, &mut out)
            .map(|_| out.to_vec())
            .map_err(|e| e.to_string())
    }

    fn numeric(raw: &[u8]) -> Decimal {
        Decimal::from_sql(&Type::NUMERIC, raw).unwrap()
    }

    #[test]
    fn float_binds_to_integer_only_when_whole() {
        let err = bind(Value::Float(2.5), &Type::INT8).unwrap_err();
        assert!(err.contains("non-integral"), "{err}");
        assert_eq!(bind(Value::Float(3.0), &Type::INT8), Ok(3i64.to_be_bytes().to_vec()));
        assert_eq!(bind(Value::Float(-2.0), &Type::INT4), Ok((-2i32).to_be_bytes().to_vec()));
        assert!(bind(Value::Float(f64::NAN), &Type::INT2).is_err());
    }

    #[test]
    fn numbers_bind_to_numeric_as_decimals() {
        let raw = bind(Value::Int(5), &Type::NUMERIC).unwrap();
        assert_ne!(raw, 5i64.to_be_bytes().to_vec());
        assert_eq!(numeric(&raw), Decimal::from(5));

        let raw = bind(Value::Float(2.5), &Type::NUMERIC).unwrap();
        assert_eq!(numeric(&raw), Decimal::new(25, 1));

        let raw = bind(Value::from(Decimal::new(1250, 2)), &Type::NUMERIC).unwrap();
        assert_eq!(numeric(&raw).to_string(), "12.50");
    }

    #[test]
    fn integers_narrow_with_range_checks() {
        assert_eq!(bind(Value::Int(7), &Type::INT2), Ok(7i16.to_be_bytes().to_vec()));
        assert!(bind(Value::Int(70_000), &Type::INT2).is_err());
        assert_eq!(bind(Value::Int(2), &Type::FLOAT8), Ok(2f64.to_be_bytes().to_vec()));
        assert_eq!(bind(Value::Int(42), &Type::TEXT), Ok(b"42".to_vec()));
    }

    #[test]
    fn mismatched_variants_are_rejected() {
        assert!(bind(Value::Bool(true), &Type::INT4).is_err());
        assert!(bind(Value::Text("x".into()), &Type::INT8).is_err());
        assert!(bind(Value::Bytes(vec![1]), &Type::TEXT).is_err());
        assert!(bind(Value::Text("not a number".into()), &Type::NUMERIC).is_err());
        assert!(bind(Value::Int(1), &Type::BOOL).is_err());
    }

    #[test]
    fn null_binds_to_any_type() {
        let mut out = BytesMut::new();
        let is_null = Value::Null.to_sql_checked(&Type::NUMERIC, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn decimal_scans_from_text_and_numbers() {
        assert_eq!(Decimal::from_value(Value::Text("10.25".into())), Ok(Decimal::new(1025, 2)));
        assert_eq!(Decimal::from_value(Value::Int(3)), Ok(Decimal::from(3)));
        assert_eq!(f64::from_value(Value::from(Decimal::new(15, 1))), Ok(1.5));
    }

    #[test]
    fn literal_rendering_escapes_quotes() {
        assert_eq!(Value::from("it's").to_sql_literal(), "'it''s'");
        assert_eq!(Value::from(true).to_sql_literal(), "TRUE");
        assert_eq!(Value::Null.to_sql_literal(), "NULL");
        assert_eq!(Value::from(vec![0xABu8, 0x01]).to_sql_literal(), "X'AB01'");
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(3i32)), Value::Int(3));
    }

    #[test]
    fn scan_kind_normalizes() {
        assert_eq!(ScanKind::Bool.scan(Value::Int(1)), Ok(Value::Bool(true)));
        assert_eq!(ScanKind::Float64.scan(Value::Int(2)), Ok(Value::Float(2.0)));
        assert_eq!(ScanKind::String.scan(Value::Int(7)), Ok(Value::Text("7".into())));
        assert_eq!(ScanKind::Int64.scan(Value::Null), Ok(Value::Null));
        assert!(ScanKind::Int64.scan(Value::Text("abc".into())).is_err());
        assert!(ScanKind::Int32.scan(Value::Int(i64::MAX)).is_err());
    }

    #[test]
    fn null_yields_zero_value_or_none() {
        assert_eq!(i64::from_nullable(Value::Null), Ok(0));
        assert_eq!(String::from_nullable(Value::Null), Ok(String::new()));
        assert_eq!(Option::<bool>::from_nullable(Value::Null), Ok(None));
        assert!(Json::<Vec<i32>>::from_nullable(Value::Null).is_err());
    }

    #[test]
    fn json_wrapper_decodes_text() {
        let decoded = Json::<Vec<i32>>::from_value(Value::Text("[1,2,3]".into())).unwrap();
        assert_eq!(decoded.0, vec![1, 2, 3]);
    }

    #[test]
    fn time_parses_from_text() {
        let t = DateTime::<Utc>::from_value(Value::Text("2024-03-01 10:20:30".into())).unwrap();
        assert_eq!(t.format("%Y-%m-%d %H:%M:%S").to_string(), "2024-03-01 10:20:30");
    }
}
