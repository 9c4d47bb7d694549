use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Values that can be stored in a result row or passed as a template parameter.
///
/// ```rust
/// use mssql_sqlfile::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Parse a command-line style value: integers, floats, `true`/`false`,
    /// `null`, anything else is text.
    #[must_use]
    pub fn parse_loose(raw: &str) -> RowValues {
        if let Ok(i) = raw.parse::<i64>() {
            RowValues::Int(i)
        } else if let Ok(f) = raw.parse::<f64>() {
            RowValues::Float(f)
        } else if raw.eq_ignore_ascii_case("true") {
            RowValues::Bool(true)
        } else if raw.eq_ignore_ascii_case("false") {
            RowValues::Bool(false)
        } else if raw.eq_ignore_ascii_case("null") {
            RowValues::Null
        } else {
            RowValues::Text(raw.to_string())
        }
    }
}

/// Plain text form used by literal substitution and table display. Nothing is
/// quoted or escaped.
impl fmt::Display for RowValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowValues::Int(i) => write!(f, "{i}"),
            RowValues::Float(v) => write!(f, "{v}"),
            RowValues::Text(s) => f.write_str(s),
            RowValues::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
            RowValues::Timestamp(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            RowValues::Null => f.write_str("NULL"),
            RowValues::JSON(v) => write!(f, "{v}"),
            RowValues::Blob(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

macro_rules! row_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RowValues {
                fn from(value: $ty) -> Self {
                    RowValues::$variant(value.into())
                }
            }
        )*
    };
}

row_value_from! {
    i64 => Int,
    i32 => Int,
    i16 => Int,
    u8 => Int,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    JsonValue => JSON,
    Vec<u8> => Blob,
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Named parameters for a SQL template.
///
/// ```rust
/// use mssql_sqlfile::prelude::*;
///
/// let params = SqlParams::new().with("id", 5).with("name", "alice");
/// assert_eq!(params.get("id"), Some(&RowValues::Int(5)));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlParams {
    values: BTreeMap<String, RowValues>,
}

impl SqlParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RowValues>) {
        self.values.insert(name.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.values.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for SqlParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = SqlParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}
