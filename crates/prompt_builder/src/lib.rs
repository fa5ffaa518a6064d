//! Prompt construction for gRPC boundary generation.
//!
//! Each prompt family carries a basename and a version; both are embedded
//! in the response-cache suffix so that revising a prompt naturally
//! invalidates the cached exchanges produced with the old wording.

pub mod builders;
pub mod context;
pub mod kinds;
pub mod mapper;
pub mod suffix;
mod templates;

pub use builders::{
    client_prompt, correction_prompt, grpc_parsing_prompt, proto_parsing_prompt, proto_prompt,
    server_prompt, BuiltPrompt,
};
pub use context::format_reference_context;
pub use kinds::PromptKind;
pub use mapper::render_dto_mapper;
pub use suffix::cache_suffix;
