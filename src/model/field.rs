//! Field model: one column binding between a term and a file position

use serde::{Deserialize, Serialize};

use super::term::Term;

/// Closed set of declared field data types
///
/// Derived from a declared type string; anything unrecognized or absent maps
/// to `String`. The type is carried through to generated descriptors but is
/// not enforced during reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    #[default]
    String,
    Int,
    Decimal,
    Bool,
    Date,
    Uri,
}

impl DataType {
    /// Map a declared type string onto the closed set.
    pub fn from_declared(declared: &str) -> Self {
        let name = declared
            .trim()
            .rsplit(':')
            .next()
            .unwrap_or(declared)
            .to_lowercase();
        match name.as_str() {
            "int" | "integer" | "long" | "short" => DataType::Int,
            "decimal" | "double" | "float" | "number" => DataType::Decimal,
            "bool" | "boolean" => DataType::Bool,
            "date" | "datetime" | "time" => DataType::Date,
            "uri" | "url" | "anyuri" => DataType::Uri,
            _ => DataType::String,
        }
    }

    /// Declared name used when generating a descriptor.
    pub fn declared_name(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Int => "integer",
            DataType::Decimal => "decimal",
            DataType::Bool => "boolean",
            DataType::Date => "date",
            DataType::Uri => "uri",
        }
    }
}

/// One column binding in a file schema
///
/// A field without an index has no column position and always resolves to
/// its default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Term this column is keyed by
    pub term: Term,
    /// 0-based position in the physical row, independent across files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Value used when the cell is absent, empty or the field has no index
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub data_type: DataType,
    /// Delimiter splitting a single cell into multiple values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multi_value_delimiter: Option<String>,
    /// Reference to a controlled vocabulary describing allowed values;
    /// resolution is an external concern.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_ref: Option<String>,
}

impl Field {
    pub fn new(term: Term) -> Self {
        Self {
            term,
            index: None,
            default_value: None,
            data_type: DataType::String,
            multi_value_delimiter: None,
            vocabulary_ref: None,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_declared() {
        assert_eq!(DataType::from_declared("xs:integer"), DataType::Int);
        assert_eq!(DataType::from_declared("Boolean"), DataType::Bool);
        assert_eq!(DataType::from_declared("double"), DataType::Decimal);
        assert_eq!(DataType::from_declared("dateTime"), DataType::Date);
        assert_eq!(DataType::from_declared("anyURI"), DataType::Uri);
        assert_eq!(DataType::from_declared("varchar"), DataType::String);
        assert_eq!(DataType::from_declared(""), DataType::String);
    }
}
