//! Table Schema (`schema` header key).
//!
//! Only the shape of the schema is checked: required keys, the closed set of field types and the
//! formats each type allows. The schema is never checked against the payload.

use serde::{Deserialize, Serialize};

use crate::error::CsvyResult;
use crate::types::{DataType, Field, Schema};

use super::{SCHEMA_KEY, shape_error};

/// Field types defined by Table Schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Date,
    Time,
    Datetime,
    Year,
    Yearmonth,
    Duration,
    Geopoint,
    Geojson,
    Any,
}

const STRING_FORMATS: &[&str] = &["default", "email", "uri", "binary", "uuid"];
const GEOPOINT_FORMATS: &[&str] = &["default", "array", "object"];
const GEOJSON_FORMATS: &[&str] = &["default", "topojson"];
const DEFAULT_FORMATS: &[&str] = &["default"];

impl FieldType {
    /// Formats accepted for this type. `None` means any format string is accepted.
    fn allowed_formats(self) -> Option<&'static [&'static str]> {
        match self {
            Self::String => Some(STRING_FORMATS),
            Self::Date | Self::Time | Self::Datetime => None,
            Self::Geopoint => Some(GEOPOINT_FORMATS),
            Self::Geojson => Some(GEOJSON_FORMATS),
            _ => Some(DEFAULT_FORMATS),
        }
    }

    /// The in-memory [`DataType`] used when loading a column of this type.
    pub fn data_type(self) -> DataType {
        match self {
            Self::Integer => DataType::Int64,
            Self::Number => DataType::Float64,
            Self::Boolean => DataType::Bool,
            _ => DataType::Utf8,
        }
    }
}

/// Value constraints of a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_yaml::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_yaml::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Allowed values.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<serde_yaml::Value>>,
}

/// One entry of `schema.fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Column name.
    pub name: String,
    /// Column type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    // number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_char: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_char: Option<String>,
    // number, integer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bare_number: Option<bool>,
    // boolean
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub false_values: Option<Vec<String>>,
}

impl FieldDescriptor {
    /// Create a descriptor with only `name` and `type` set.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            format: None,
            title: None,
            description: None,
            example: None,
            constraints: None,
            decimal_char: None,
            group_char: None,
            bare_number: None,
            true_values: None,
            false_values: None,
        }
    }

    fn validate(&self, index: usize) -> CsvyResult<()> {
        if let (Some(format), Some(allowed)) = (&self.format, self.field_type.allowed_formats()) {
            if !allowed.contains(&format.as_str()) {
                return Err(shape_error(
                    SCHEMA_KEY,
                    format!(
                        "field {index} ('{}'): format '{format}' is not valid for type {:?}, expected one of {allowed:?}",
                        self.name, self.field_type
                    ),
                ));
            }
        }
        for (label, value) in [("decimalChar", &self.decimal_char), ("groupChar", &self.group_char)] {
            if let Some(value) = value {
                if value.chars().count() != 1 {
                    return Err(shape_error(
                        SCHEMA_KEY,
                        format!("field {index} ('{}'): {label} must be a single character", self.name),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// The `schema` header entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    /// Column descriptions, in payload order.
    pub fields: Vec<FieldDescriptor>,
    /// Strings treated as missing values. Table Schema defaults this to `[""]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_values: Option<Vec<String>>,
}

impl TableSchema {
    /// Create a schema from field descriptors.
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self {
            fields,
            missing_values: None,
        }
    }

    /// Check per-field format rules.
    pub fn validate(&self) -> CsvyResult<()> {
        self.fields
            .iter()
            .enumerate()
            .try_for_each(|(i, field)| field.validate(i))
    }

    /// Build the [`Schema`] used to load the payload into a [`crate::types::DataSet`].
    pub fn to_schema(&self) -> Schema {
        Schema::new(
            self.fields
                .iter()
                .map(|f| Field::new(f.name.clone(), f.field_type.data_type()))
                .collect(),
        )
    }
}
