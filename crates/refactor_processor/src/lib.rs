//! Per-class refactoring orchestration.
//!
//! Sequences proto generation ahead of the concurrent server/client
//! fan-out, drives batches of classes with checkpointed progress, and
//! hosts the compilation-driven repair loop that feeds build errors back
//! into correction prompts.

pub mod artifact;
pub mod class_refactor;
pub mod driver;
pub mod hooks;
pub mod methods;
pub mod pkg_config;
pub mod validation;

pub use artifact::{GeneratedFile, MS_ROOT_PLACEHOLDER};
pub use class_refactor::{ClassRefactor, RefactorOutput, RefactorRequest};
pub use driver::{ArtifactSink, BatchDriver, BatchReport};
pub use hooks::PromptHooks;
pub use methods::{check_class, exclude_getters_setters, simple_method_names};
pub use validation::{CompileLoop, CompileLoopOutcome};
