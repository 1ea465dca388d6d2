//! Literal rendering.
//!
//! Values are written inline into the batch text. The rules match what SQL
//! Server parses back to the same value regardless of session settings:
//! sortable dates, `0x` binary, doubled quotes and culture-aware numbers.

use std::fmt::Write;

use tinysql_core::{ColumnType, Culture, Error, Result, TypeError, Value};

/// chrono pattern of the sortable `s` date format.
pub const SORTABLE_DATE: &str = "%Y-%m-%dT%H:%M:%S";

/// Render a value without surrounding quotes.
pub fn render_value(value: &Value, culture: &Culture) -> Result<String> {
    if matches!(value, Value::Float(_) | Value::Double(_)) && !value.as_f64().is_some_and(f64::is_finite) {
        return Err(non_finite(value));
    }
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::TinyInt(v) => v.to_string(),
        Value::SmallInt(v) => v.to_string(),
        Value::Int(v) => v.to_string(),
        Value::BigInt(v) => v.to_string(),
        Value::Float(v) => culture.format_number(&v.to_string()),
        Value::Double(v) => culture.format_number(&v.to_string()),
        Value::Decimal(v) => culture.format_number(&v.to_string()),
        Value::Text(s) | Value::Xml(s) => s.replace('\'', "''"),
        Value::Bytes(bytes) => {
            let mut hex = String::with_capacity(2 + bytes.len() * 2);
            hex.push_str("0x");
            for b in bytes {
                let _ = write!(hex, "{:02x}", b);
            }
            hex
        }
        Value::Date(d) => d.and_hms_opt(0, 0, 0).unwrap_or_default().format(SORTABLE_DATE).to_string(),
        Value::Time(t) => t.format("%H:%M:%S").to_string(),
        Value::DateTime(dt) => dt.format(SORTABLE_DATE).to_string(),
        Value::DateTimeOffset(dt) => dt.naive_local().format(SORTABLE_DATE).to_string(),
        Value::Guid(g) => g.to_string(),
        Value::List(items) => render_list(items, culture)?,
        Value::Table(_) => {
            return Err(Error::Type(TypeError {
                expected: "a scalar value",
                actual: value.type_name().to_string(),
                column: None,
            }));
        }
    };
    Ok(text)
}

/// NaN and the infinities have no T-SQL literal.
fn non_finite(value: &Value) -> Error {
    Error::Type(TypeError {
        expected: "a finite number",
        actual: format!("{} {}", value.type_name(), value.as_f64().unwrap_or_default()),
        column: None,
    })
}

/// Items of an `IN (...)` list: each quoted by its own kind, no `N` prefix.
fn render_list(items: &[Value], culture: &Culture) -> Result<String> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let q = if item.is_quoted_kind() { "'" } else { "" };
        parts.push(format!("{q}{}{q}", render_value(item, culture)?));
    }
    Ok(parts.join(","))
}

/// Whether a literal is quoted: by its own kind, or by the declared type once
/// one is known. NULL and binary are never quoted.
pub fn is_quoted(value: &Value, declared: Option<ColumnType>) -> bool {
    match value {
        Value::Null | Value::Bytes(_) | Value::List(_) => false,
        _ => value.is_quoted_kind() || declared.is_some_and(|t| t.sql_type.is_quoted()),
    }
}

/// Render a value as a comparison or `SET` operand: `N'text'` or bare.
pub fn literal(value: &Value, declared: Option<ColumnType>, culture: &Culture) -> Result<String> {
    let text = render_value(value, culture)?;
    if is_quoted(value, declared) {
        Ok(format!("N'{}'", text))
    } else {
        Ok(text)
    }
}
