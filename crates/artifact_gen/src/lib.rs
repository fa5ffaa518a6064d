//! Generic artifact-generation state machine.
//!
//! Every generated artifact (proto file, server class, client class) runs
//! through the same loop: generate, verify, correct up to a bounded number
//! of attempts, postprocess. What varies per artifact kind (prompt
//! construction and the verification predicate) is supplied through
//! [`GenHooks`]; the engine itself stays generic.

pub mod cleanup;
pub mod engine;
pub mod invoker;

pub use cleanup::strip_code_fence;
pub use engine::{GenEngine, GenError, GenHooks, GenState, Prompts, Verification};
pub use invoker::{CachedInvoker, Exchange};
