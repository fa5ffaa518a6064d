use std::collections::BTreeMap;

use log::warn;

use crate::model::ModelError;
use crate::types::{ApproachType, PlannedApiClass};

/// Outgoing references of a class, bucketed by the refactoring approach of
/// the referenced class. Used purely as prompt context and recomputed for
/// every prompt.
#[derive(Debug, Clone, Default)]
pub struct ReferenceMap {
    pub idbased: BTreeMap<String, PlannedApiClass>,
    pub dto: BTreeMap<String, PlannedApiClass>,
}

impl ReferenceMap {
    pub fn is_empty(&self) -> bool {
        self.idbased.is_empty() && self.dto.is_empty()
    }
}

/// Bucket the referenced classes of `class_name` by their own approach
/// decision. A referenced class that is not itself an API-boundary class is
/// dropped with a warning: it is not part of the generated contract surface.
///
/// Pure over the `api_classes` snapshot passed in; callers refactoring
/// classes concurrently must hand in the snapshot valid at call start.
pub fn resolve_references(
    class_name: &str,
    api_classes: &BTreeMap<String, PlannedApiClass>,
) -> Result<ReferenceMap, ModelError> {
    let planned = api_classes
        .get(class_name)
        .ok_or_else(|| ModelError::UnknownClass(class_name.to_string()))?;
    let mut mapping = ReferenceMap::default();
    for referenced in &planned.referenced_classes {
        match api_classes.get(referenced) {
            Some(api) => {
                let bucket = match api.decision {
                    ApproachType::IdBased => &mut mapping.idbased,
                    ApproachType::DtoBased => &mut mapping.dto,
                };
                bucket.insert(referenced.clone(), api.clone());
            }
            None => {
                warn!(
                    "Class {} is referenced by {} but not found in API classes.",
                    referenced, class_name
                );
            }
        }
    }
    Ok(mapping)
}
