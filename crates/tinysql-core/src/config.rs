//! Builder configuration: culture, default schema and result handling.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Schema assumed for bare table names.
pub const DEFAULT_SCHEMA: &str = "dbo";

/// Number and date formatting rules applied to literals and assembled rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Culture {
    /// Culture name such as `en-US`; empty for the invariant culture
    pub name: String,
    /// Separator written between the integer and fractional digits
    pub decimal_separator: char,
    /// chrono pattern for the general (`G`) date format
    pub general_date: String,
}

impl Culture {
    pub fn en_us() -> Self {
        Self {
            name: "en-US".to_string(),
            decimal_separator: '.',
            general_date: "%-m/%-d/%Y %-I:%M:%S %p".to_string(),
        }
    }

    pub fn invariant() -> Self {
        Self {
            name: String::new(),
            decimal_separator: '.',
            general_date: "%m/%d/%Y %H:%M:%S".to_string(),
        }
    }

    pub fn da_dk() -> Self {
        Self {
            name: "da-DK".to_string(),
            decimal_separator: ',',
            general_date: "%d-%m-%Y %H:%M:%S".to_string(),
        }
    }

    /// Replace the `.` of an already formatted number with this culture's separator.
    pub fn format_number(&self, formatted: &str) -> String {
        if self.decimal_separator == '.' {
            formatted.to_string()
        } else {
            formatted.replace('.', &self.decimal_separator.to_string())
        }
    }

    /// Format a timestamp with the general date pattern.
    pub fn format_general_date(&self, value: &NaiveDateTime) -> String {
        value.format(&self.general_date).to_string()
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::en_us()
    }
}

/// How date values are materialized into assembled rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateHandling {
    /// Keep the executor's date values
    #[default]
    Raw,
    /// Convert to text with the sortable `yyyy-MM-ddTHH:mm:ss` pattern
    ToString,
    /// Convert to text with the culture's general date pattern
    Localized,
}

/// What the compiler does with select-list entries whose output names collide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectListDedup {
    /// Rename the later entry to `<table>_<column>`
    #[default]
    Rename,
    /// Drop the later entry
    Remove,
}

/// Configuration carried by a builder and inherited by builders it creates.
///
/// # Example
///
/// ```
/// use tinysql_core::{Culture, DateHandling, SqlConfig};
///
/// let config = SqlConfig::new()
///     .culture(Culture::da_dk())
///     .date_handling(DateHandling::Localized);
/// assert_eq!(config.default_schema, "dbo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlConfig {
    pub culture: Culture,
    pub default_schema: String,
    pub date_handling: DateHandling,
    pub select_list_dedup: SelectListDedup,
}

impl SqlConfig {
    /// Create a configuration with en-US formatting and the `dbo` schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the culture used for number and date formatting.
    pub fn culture(mut self, culture: Culture) -> Self {
        self.culture = culture;
        self
    }

    /// Set the schema assumed for bare table names.
    pub fn default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn date_handling(mut self, handling: DateHandling) -> Self {
        self.date_handling = handling;
        self
    }

    pub fn select_list_dedup(mut self, dedup: SelectListDedup) -> Self {
        self.select_list_dedup = dedup;
        self
    }

    /// Whether `schema` is the default schema (and may be omitted).
    pub fn is_default_schema(&self, schema: &str) -> bool {
        schema.eq_ignore_ascii_case(&self.default_schema)
    }
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            culture: Culture::default(),
            default_schema: DEFAULT_SCHEMA.to_string(),
            date_handling: DateHandling::default(),
            select_list_dedup: SelectListDedup::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = SqlConfig::default();
        assert_eq!(config.culture.name, "en-US");
        assert_eq!(config.default_schema, "dbo");
        assert_eq!(config.date_handling, DateHandling::Raw);
        assert!(config.is_default_schema("DBO"));
    }

    #[test]
    fn test_general_dates_per_culture() {
        assert_eq!(Culture::en_us().format_general_date(&sample()), "3/7/2024 2:05:09 PM");
        assert_eq!(Culture::da_dk().format_general_date(&sample()), "07-03-2024 14:05:09");
    }

    #[test]
    fn test_decimal_separator() {
        assert_eq!(Culture::en_us().format_number("12.5"), "12.5");
        assert_eq!(Culture::da_dk().format_number("12.5"), "12,5");
    }

    #[test]
    fn test_builder_setters() {
        let config = SqlConfig::new()
            .default_schema("sales")
            .select_list_dedup(SelectListDedup::Remove);
        assert_eq!(config.default_schema, "sales");
        assert_eq!(config.select_list_dedup, SelectListDedup::Remove);
    }
}
