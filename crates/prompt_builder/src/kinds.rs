/// The prompt families used by the pipeline. Each one is versioned; the
/// version participates in the cache suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    IdProto,
    IdServer,
    IdClient,
    DtoProto,
    DtoServer,
    DtoClient,
    ProtoParsing,
    GrpcParsing,
    Correction,
}

impl PromptKind {
    pub fn basename(self) -> &'static str {
        match self {
            PromptKind::IdProto => "using_id_grpc_proto",
            PromptKind::IdServer => "using_id_grpc_server",
            PromptKind::IdClient => "using_id_grpc_client",
            PromptKind::DtoProto => "using_dto_grpc_proto",
            PromptKind::DtoServer => "using_dto_grpc_server",
            PromptKind::DtoClient => "using_dto_grpc_client",
            PromptKind::ProtoParsing => "proto_parsing",
            PromptKind::GrpcParsing => "grpc_parsing",
            PromptKind::Correction => "correction",
        }
    }

    pub fn version(self) -> &'static str {
        match self {
            PromptKind::IdProto | PromptKind::DtoProto => "0.0.5",
            PromptKind::IdServer | PromptKind::DtoServer => "0.0.4",
            PromptKind::IdClient | PromptKind::DtoClient => "0.0.4",
            PromptKind::ProtoParsing => "0.0.3",
            PromptKind::GrpcParsing => "0.0.3",
            PromptKind::Correction => "0.0.1",
        }
    }

    /// Directory segment for the cache suffix: `<basename>-<version>`.
    pub fn dir_name(self) -> String {
        format!("{}-{}", self.basename(), self.version())
    }
}
