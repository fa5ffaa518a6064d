use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ClassUnit, FieldDetail};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("class {0} not found in the application model")]
    UnknownClass(String),
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read-only queryable view of the monolith produced by the
/// static-analysis front end. The generation core never mutates it.
pub trait AppModel: Send + Sync {
    fn get_class_source(&self, full_name: &str) -> Result<String, ModelError>;
    fn get_field_details(&self, full_name: &str) -> Result<Vec<FieldDetail>, ModelError>;
    fn get_input_types(&self, full_name: &str) -> Result<Vec<String>, ModelError>;
    fn get_output_types(&self, full_name: &str) -> Result<Vec<String>, ModelError>;
    fn get_field_types(&self, full_name: &str) -> Result<Vec<String>, ModelError>;

    /// Convenience: read a class as a `ClassUnit`.
    fn get_class_unit(&self, full_name: &str) -> Result<ClassUnit, ModelError> {
        let source = self.get_class_source(full_name)?;
        Ok(ClassUnit::new(full_name, source))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClassRecord {
    source: String,
    #[serde(default)]
    fields: Vec<FieldDetail>,
    #[serde(default)]
    input_types: Vec<String>,
    #[serde(default)]
    output_types: Vec<String>,
    #[serde(default)]
    field_types: Vec<String>,
}

/// In-memory application model, loadable from the analysis export (a JSON
/// object mapping fully qualified class names to their records).
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppModel {
    classes: HashMap<String, ClassRecord>,
}

impl InMemoryAppModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let classes: HashMap<String, ClassRecord> = serde_json::from_str(json)?;
        Ok(Self { classes })
    }

    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn insert_class(
        &mut self,
        full_name: impl Into<String>,
        source: impl Into<String>,
        fields: Vec<FieldDetail>,
    ) {
        self.classes.insert(
            full_name.into(),
            ClassRecord {
                source: source.into(),
                fields,
                ..ClassRecord::default()
            },
        );
    }

    pub fn set_reference_types(
        &mut self,
        full_name: &str,
        input_types: Vec<String>,
        output_types: Vec<String>,
        field_types: Vec<String>,
    ) {
        if let Some(record) = self.classes.get_mut(full_name) {
            record.input_types = input_types;
            record.output_types = output_types;
            record.field_types = field_types;
        }
    }

    fn record(&self, full_name: &str) -> Result<&ClassRecord, ModelError> {
        self.classes
            .get(full_name)
            .ok_or_else(|| ModelError::UnknownClass(full_name.to_string()))
    }
}

impl AppModel for InMemoryAppModel {
    fn get_class_source(&self, full_name: &str) -> Result<String, ModelError> {
        Ok(self.record(full_name)?.source.clone())
    }

    fn get_field_details(&self, full_name: &str) -> Result<Vec<FieldDetail>, ModelError> {
        Ok(self.record(full_name)?.fields.clone())
    }

    fn get_input_types(&self, full_name: &str) -> Result<Vec<String>, ModelError> {
        Ok(self.record(full_name)?.input_types.clone())
    }

    fn get_output_types(&self, full_name: &str) -> Result<Vec<String>, ModelError> {
        Ok(self.record(full_name)?.output_types.clone())
    }

    fn get_field_types(&self, full_name: &str) -> Result<Vec<String>, ModelError> {
        Ok(self.record(full_name)?.field_types.clone())
    }
}
