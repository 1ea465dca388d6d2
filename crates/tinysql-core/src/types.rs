//! SQL Server column types and parameter type declarations.

use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// SQL Server data types, named after the server's own type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    BigInt,
    Binary,
    Bit,
    Char,
    DateTime,
    Decimal,
    Float,
    Image,
    Int,
    Money,
    NChar,
    NText,
    NVarChar,
    Real,
    UniqueIdentifier,
    SmallDateTime,
    SmallInt,
    SmallMoney,
    Text,
    Timestamp,
    TinyInt,
    VarBinary,
    VarChar,
    Variant,
    Xml,
    Udt,
    Structured,
    Date,
    Time,
    DateTime2,
    DateTimeOffset,
}

impl SqlType {
    /// The type name as it appears in a `DECLARE` statement.
    pub const fn name(self) -> &'static str {
        match self {
            SqlType::BigInt => "BigInt",
            SqlType::Binary => "Binary",
            SqlType::Bit => "Bit",
            SqlType::Char => "Char",
            SqlType::DateTime => "DateTime",
            SqlType::Decimal => "Decimal",
            SqlType::Float => "Float",
            SqlType::Image => "Image",
            SqlType::Int => "Int",
            SqlType::Money => "Money",
            SqlType::NChar => "NChar",
            SqlType::NText => "NText",
            SqlType::NVarChar => "NVarChar",
            SqlType::Real => "Real",
            SqlType::UniqueIdentifier => "UniqueIdentifier",
            SqlType::SmallDateTime => "SmallDateTime",
            SqlType::SmallInt => "SmallInt",
            SqlType::SmallMoney => "SmallMoney",
            SqlType::Text => "Text",
            SqlType::Timestamp => "Timestamp",
            SqlType::TinyInt => "TinyInt",
            SqlType::VarBinary => "VarBinary",
            SqlType::VarChar => "VarChar",
            SqlType::Variant => "Variant",
            SqlType::Xml => "Xml",
            SqlType::Udt => "Udt",
            SqlType::Structured => "Structured",
            SqlType::Date => "Date",
            SqlType::Time => "Time",
            SqlType::DateTime2 => "DateTime2",
            SqlType::DateTimeOffset => "DateTimeOffset",
        }
    }

    /// Character types that take a `(n)` or `(MAX)` length.
    pub const fn is_variable_text(self) -> bool {
        matches!(
            self,
            SqlType::NVarChar | SqlType::VarChar | SqlType::Text | SqlType::NText
        )
    }

    pub const fn is_fixed_text(self) -> bool {
        matches!(self, SqlType::Char | SqlType::NChar)
    }

    /// Date types never carry a precision in a declaration.
    pub const fn is_date(self) -> bool {
        matches!(
            self,
            SqlType::DateTime | SqlType::DateTime2 | SqlType::DateTimeOffset
        )
    }

    /// Whether literals of this declared type are written single-quoted.
    pub const fn is_quoted(self) -> bool {
        matches!(
            self,
            SqlType::NVarChar
                | SqlType::VarChar
                | SqlType::Text
                | SqlType::NText
                | SqlType::Char
                | SqlType::NChar
                | SqlType::DateTime
                | SqlType::DateTime2
                | SqlType::DateTimeOffset
                | SqlType::SmallDateTime
                | SqlType::Date
                | SqlType::Time
                | SqlType::UniqueIdentifier
                | SqlType::Xml
        )
    }

    /// The zero value for a non-nullable column of this type, or `None` for
    /// reference-like types that default to NULL.
    pub fn default_value(self) -> Option<Value> {
        let value = match self {
            SqlType::Bit => Value::Bool(false),
            SqlType::TinyInt => Value::TinyInt(0),
            SqlType::SmallInt => Value::SmallInt(0),
            SqlType::Int => Value::Int(0),
            SqlType::BigInt => Value::BigInt(0),
            SqlType::Real => Value::Float(0.0),
            SqlType::Float => Value::Double(0.0),
            SqlType::Decimal | SqlType::Money | SqlType::SmallMoney => {
                Value::Decimal(Decimal::ZERO)
            }
            SqlType::DateTime | SqlType::DateTime2 | SqlType::SmallDateTime => {
                Value::DateTime(NaiveDateTime::default())
            }
            SqlType::Date => Value::Date(NaiveDate::default()),
            SqlType::Time => Value::Time(NaiveTime::default()),
            SqlType::UniqueIdentifier => Value::Guid(Uuid::nil()),
            _ => return None,
        };
        Some(value)
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A declared column type: SQL type plus optional length, precision and scale.
///
/// `length: None` (or `Some(0)`) means `MAX` for variable-length text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub sql_type: SqlType,
    #[serde(default)]
    pub length: Option<u32>,
    #[serde(default)]
    pub precision: Option<u8>,
    #[serde(default)]
    pub scale: Option<u8>,
}

impl ColumnType {
    pub const fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            length: None,
            precision: None,
            scale: None,
        }
    }

    pub const fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub const fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Infer a declared type from a value when no metadata is available.
    pub fn for_value(value: &Value) -> Self {
        let sql_type = match value {
            Value::Bool(_) => SqlType::Bit,
            Value::TinyInt(_) => SqlType::TinyInt,
            Value::SmallInt(_) => SqlType::SmallInt,
            Value::Int(_) => SqlType::Int,
            Value::BigInt(_) => SqlType::BigInt,
            Value::Float(_) => SqlType::Real,
            Value::Double(_) => SqlType::Float,
            Value::Decimal(_) => SqlType::Decimal,
            Value::Bytes(_) => SqlType::VarBinary,
            Value::Date(_) => SqlType::Date,
            Value::Time(_) => SqlType::Time,
            Value::DateTime(_) => SqlType::DateTime,
            Value::DateTimeOffset(_) => SqlType::DateTimeOffset,
            Value::Guid(_) => SqlType::UniqueIdentifier,
            Value::Xml(_) => SqlType::Xml,
            Value::Null | Value::Text(_) | Value::List(_) | Value::Table(_) => SqlType::NVarChar,
        };
        Self::new(sql_type)
    }

    /// Render the type for a parameter declaration.
    ///
    /// `value` is consulted only for `VarBinary`, whose length is taken from
    /// the bound bytes.
    pub fn declaration(&self, value: Option<&Value>) -> String {
        let mut sql = self.sql_type.name().to_string();
        let ty = self.sql_type;
        if ty.is_variable_text() {
            match self.length {
                Some(n) if n > 0 => sql.push_str(&format!("({})", n)),
                _ => sql.push_str("(MAX)"),
            }
        } else if ty.is_fixed_text() {
            if let Some(n) = self.length.filter(|n| *n > 0) {
                sql.push_str(&format!("({})", n));
            }
        } else if ty == SqlType::VarBinary {
            if let Some(Value::Bytes(bytes)) = value {
                sql.push_str(&format!("({})", bytes.len()));
            }
        } else if let Some(p) = self.precision.filter(|p| *p > 0) {
            if !ty.is_date() {
                match self.scale {
                    Some(s) => sql.push_str(&format!("({}, {})", p, s)),
                    None => sql.push_str(&format!("({})", p)),
                }
            }
        }
        sql
    }
}

impl From<SqlType> for ColumnType {
    fn from(sql_type: SqlType) -> Self {
        Self::new(sql_type)
    }
}
