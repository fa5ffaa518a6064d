//! Compilation-log analysis for the correction loop.
//!
//! The compiler sandbox answers pass/fail; this crate answers "is this
//! still the same failure as before". Logs are normalized (timestamps and
//! other volatile build output removed, lines sorted) so that two runs of
//! the same failing build compare equal even when the build tool
//! interleaves output differently.

pub mod build_runner;
pub mod comparator;

pub use build_runner::{BuildError, BuildRunner, CompileOutcome, Compiler};
pub use comparator::LogComparator;
