use serde::{Deserialize, Serialize};

/// Structured response of the parsing model when converting a free-text
/// proto generation answer into a usable record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoSolution {
    /// Explanation of the refactoring steps taken.
    #[serde(default)]
    pub explanation: String,
    /// Source code of the proto file.
    pub proto_code: String,
    /// Name of the proto file.
    pub file_name: String,
    /// Name of the gRPC service.
    pub service_name: String,
    #[serde(default)]
    pub additional_comments: String,
}

/// Structured response of the parsing model for a generated gRPC server or
/// client class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcSolution {
    /// Simple name of the server or client class.
    pub class_name: String,
    /// Package of the server or client class.
    pub package_name: String,
    /// Source code of the server or client class.
    pub source_code: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub additional_comments: String,
}
