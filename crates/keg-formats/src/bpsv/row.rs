use crate::bpsv::schema::BpsvSchema;
use crate::bpsv::types::{BpsvError, BpsvValue};
use std::collections::HashMap;

/// A single row of BPSV data
#[derive(Debug, Clone)]
pub struct BpsvRow {
    /// Parsed values in order
    values: Vec<BpsvValue>,
    /// Raw string values for serialization
    raw_values: Vec<String>,
}

impl BpsvRow {
    /// Create a new row from raw values and schema
    pub fn parse(raw_values: Vec<String>, schema: &BpsvSchema) -> Result<Self, BpsvError> {
        // Validate field count
        if raw_values.len() != schema.field_count() {
            return Err(BpsvError::FieldCountMismatch {
                expected: schema.field_count(),
                actual: raw_values.len(),
            });
        }

        // Parse values according to schema
        let mut values = Vec::new();
        for (i, raw) in raw_values.iter().enumerate() {
            let field = schema
                .get_field(i)
                .ok_or(BpsvError::ColumnIndexOutOfBounds(i))?;
            let value = BpsvValue::parse(raw, field.field_type)?;
            values.push(value);
        }

        Ok(Self { values, raw_values })
    }

    /// Create a row from pre-parsed values
    pub fn from_values(values: Vec<BpsvValue>) -> Self {
        let raw_values = values
            .iter()
            .map(std::string::ToString::to_string)
            .collect();
        Self { values, raw_values }
    }

    /// Get value by index
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BpsvValue> {
        self.values.get(index)
    }

    /// Get raw string value by index
    #[must_use]
    pub fn get_raw(&self, index: usize) -> Option<&str> {
        self.raw_values.get(index).map(std::string::String::as_str)
    }

    /// Get value by field name (requires schema)
    #[must_use]
    pub fn get_by_name<'a>(&'a self, name: &str, schema: &BpsvSchema) -> Option<&'a BpsvValue> {
        schema
            .get_field_index(name)
            .and_then(|index| self.values.get(index))
    }

    /// Get raw string value by field name (requires schema)
    ///
    /// This is useful for HEX fields where you need the raw hex string
    /// rather than the parsed bytes.
    #[must_use]
    pub fn get_raw_by_name<'a>(&'a self, name: &str, schema: &BpsvSchema) -> Option<&'a str> {
        schema
            .get_field_index(name)
            .and_then(|index| self.raw_values.get(index).map(String::as_str))
    }

    /// Get all values
    #[must_use]
    pub fn values(&self) -> &[BpsvValue] {
        &self.values
    }

    /// Get all raw values
    #[must_use]
    pub fn raw_values(&self) -> &[String] {
        &self.raw_values
    }

    /// Convert row to map using schema field names
    #[must_use]
    pub fn to_map(&self, schema: &BpsvSchema) -> HashMap<String, BpsvValue> {
        let mut map = HashMap::new();
        for (i, field) in schema.fields().iter().enumerate() {
            if let Some(value) = self.values.get(i) {
                map.insert(field.name.clone(), value.clone());
            }
        }
        map
    }

    /// Format row as pipe-separated string
    #[must_use]
    pub fn to_line(&self) -> String {
        self.raw_values.join("|")
    }

    /// Get the number of values in this row
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if row is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
