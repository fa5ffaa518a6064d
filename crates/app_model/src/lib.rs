//! Read-only model of the monolith under decomposition.
//!
//! Holds the class/method/field view produced by the static-analysis front
//! end, the per-class refactoring plan (`PlannedApiClass`) and the
//! reference resolver that buckets outgoing references by refactoring
//! approach.

pub mod model;
pub mod resolver;
pub mod types;

pub use model::{AppModel, InMemoryAppModel, ModelError};
pub use resolver::{resolve_references, ReferenceMap};
pub use types::{
    camel_to_snake, package_of, simple_name_of, ApproachType, ClassUnit, FieldDetail,
    PlannedApiClass,
};
