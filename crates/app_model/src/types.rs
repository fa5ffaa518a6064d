use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Refactoring approach decided for an API-boundary class during planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproachType {
    IdBased,
    DtoBased,
}

/// A class read from the source model. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassUnit {
    pub simple_name: String,
    pub full_name: String,
    pub source: String,
}

impl ClassUnit {
    pub fn new(full_name: impl Into<String>, source: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let simple_name = simple_name_of(&full_name).to_string();
        Self {
            simple_name,
            full_name,
            source: source.into(),
        }
    }
}

/// One field of a class, as reported by the static analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDetail {
    pub variable_name: String,
    pub type_name: String,
    /// True when the field's type comes from a library rather than the
    /// application itself. Library-typed fields are not part of DTOs.
    #[serde(default)]
    pub from_library: bool,
}

/// Planned names and metadata for one class selected for API-boundary
/// refactoring. Created during planning, read-only during generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedApiClass {
    pub full_name: String,
    pub simple_name: String,
    pub package_name: String,
    pub decision: ApproachType,
    pub microservice_id: String,
    pub proto_package: String,
    pub proto_filename: String,
    pub service_name: String,
    pub server_name: String,
    pub client_name: String,
    pub mapper_name: String,
    pub dto_name: String,
    #[serde(default)]
    pub referenced_classes: BTreeSet<String>,
}

impl PlannedApiClass {
    /// Derive the planned artifact names for a class from its fully
    /// qualified name, the base package of the application and the
    /// approach decision.
    pub fn new(
        full_name: impl Into<String>,
        microservice_id: impl Into<String>,
        decision: ApproachType,
        base_package: &str,
    ) -> Self {
        let full_name = full_name.into();
        let simple_name = simple_name_of(&full_name).to_string();
        let package_name = package_of(&full_name).to_string();
        let proto_package = format!(
            "{base_package}.generated.proto.{}",
            simple_name.to_lowercase()
        );
        let mapper_name = match decision {
            ApproachType::DtoBased => {
                format!("{base_package}.generated.server.{simple_name}Mapper")
            }
            // ID-based refactoring shares a single mapper helper class.
            ApproachType::IdBased => format!("{base_package}.generated.helpers.IDMapper"),
        };
        Self {
            service_name: format!("{proto_package}.{simple_name}Service"),
            server_name: format!("{base_package}.generated.server.{simple_name}Impl"),
            client_name: format!("{base_package}.generated.client.{simple_name}"),
            dto_name: format!("{simple_name}DTO"),
            proto_filename: format!("{}.proto", camel_to_snake(&simple_name)),
            proto_package,
            mapper_name,
            full_name,
            simple_name,
            package_name,
            decision,
            microservice_id: microservice_id.into(),
            referenced_classes: BTreeSet::new(),
        }
    }

    pub fn with_references<I, S>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.referenced_classes = refs.into_iter().map(Into::into).collect();
        self
    }

    /// Simple (unqualified) name of the planned server class.
    pub fn server_simple_name(&self) -> &str {
        simple_name_of(&self.server_name)
    }

    /// Simple (unqualified) name of the planned client class.
    pub fn client_simple_name(&self) -> &str {
        simple_name_of(&self.client_name)
    }

    /// Simple (unqualified) name of the planned mapper class.
    pub fn mapper_simple_name(&self) -> &str {
        simple_name_of(&self.mapper_name)
    }
}

/// Last segment of a dotted name.
pub fn simple_name_of(full_name: &str) -> &str {
    full_name.rsplit('.').next().unwrap_or(full_name)
}

/// Everything before the last segment of a dotted name.
pub fn package_of(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(idx) => &full_name[..idx],
        None => "",
    }
}

/// `OrderManager` -> `order_manager`.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            for lower in c.to_lowercase() {
                out.push(lower);
            }
        } else {
            out.push(c);
        }
    }
    out
}
