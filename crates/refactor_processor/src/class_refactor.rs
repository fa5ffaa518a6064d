use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use app_model::{resolve_references, ApproachType, AppModel, FieldDetail, PlannedApiClass};
use artifact_gen::{CachedInvoker, GenEngine};
use llm_requester::{GrpcSolution, ProtoSolution};
use log::{error, info, warn};
use prompt_builder::{
    client_prompt, grpc_parsing_prompt, proto_parsing_prompt, proto_prompt, render_dto_mapper,
    server_prompt,
};
use serde_json::json;
use tokio::sync::Semaphore;

use crate::artifact::GeneratedFile;
use crate::hooks::PromptHooks;
use crate::methods::{check_class, exclude_getters_setters, simple_method_names};

/// One class to refactor, as handed over by the planning phase.
#[derive(Debug, Clone)]
pub struct RefactorRequest {
    pub class_name: String,
    pub method_names: Vec<String>,
    pub client_microservices: BTreeSet<String>,
}

/// Artifacts produced for one class. Server and client failures are
/// captured per key; a missing proto never reaches this type because a
/// proto failure aborts the whole call.
#[derive(Debug, Default)]
pub struct RefactorOutput {
    pub class_name: String,
    pub proto: Option<GeneratedFile>,
    pub mapper: Option<GeneratedFile>,
    pub server: Option<GeneratedFile>,
    pub server_error: Option<String>,
    pub clients: BTreeMap<String, GeneratedFile>,
    pub client_errors: BTreeMap<String, String>,
}

impl RefactorOutput {
    pub fn has_failures(&self) -> bool {
        self.server_error.is_some() || !self.client_errors.is_empty()
    }

    /// Compact summary for the checkpoint's partial-results slot.
    pub fn summary(&self) -> serde_json::Value {
        json!({
            "proto": self.proto.as_ref().map(|f| f.file_name.clone()),
            "mapper": self.mapper.as_ref().map(|f| f.file_name.clone()),
            "server": self.server.as_ref().map(|f| f.file_name.clone()),
            "server_error": self.server_error,
            "clients": self.clients.keys().collect::<Vec<_>>(),
            "client_errors": self.client_errors,
        })
    }
}

/// Per-class driver: proto first, then the server and per-consumer client
/// generations fanned out behind a bounded pool.
pub struct ClassRefactor {
    model: Arc<dyn AppModel>,
    api_classes: Arc<BTreeMap<String, PlannedApiClass>>,
    engine: Arc<GenEngine>,
    parser: CachedInvoker,
}

impl ClassRefactor {
    pub fn new(
        model: Arc<dyn AppModel>,
        api_classes: Arc<BTreeMap<String, PlannedApiClass>>,
        engine: Arc<GenEngine>,
        parser: CachedInvoker,
    ) -> Self {
        Self {
            model,
            api_classes,
            engine,
            parser,
        }
    }

    pub fn api_classes(&self) -> &BTreeMap<String, PlannedApiClass> {
        &self.api_classes
    }

    pub async fn refactor_class(&self, request: &RefactorRequest) -> Result<RefactorOutput> {
        let api = self
            .api_classes
            .get(&request.class_name)
            .ok_or_else(|| anyhow!("class {} has no refactoring plan", request.class_name))?
            .clone();
        check_class(self.model.as_ref(), &self.api_classes, &request.class_name);

        let references = resolve_references(&request.class_name, &self.api_classes)?;
        let source = self.model.get_class_source(&request.class_name)?;
        let methods = simple_method_names(&request.method_names);

        // DTO classes filter accessor methods and carry their own
        // (non-library) fields into the contract.
        let (exposed_methods, dto_fields) = match api.decision {
            ApproachType::IdBased => (methods, Vec::new()),
            ApproachType::DtoBased => {
                let fields = self.model.get_field_details(&request.class_name)?;
                let field_names: BTreeSet<String> =
                    fields.iter().map(|f| f.variable_name.clone()).collect();
                let mut dto_fields: Vec<FieldDetail> =
                    fields.into_iter().filter(|f| !f.from_library).collect();
                dto_fields.sort_by(|a, b| a.variable_name.cmp(&b.variable_name));
                (exclude_getters_setters(&methods, &field_names), dto_fields)
            }
        };

        info!(
            "Refactoring {} ({:?}, {} exposed methods, {} consumers)",
            request.class_name,
            api.decision,
            exposed_methods.len(),
            request.client_microservices.len()
        );

        // Step 1: the proto contract. Everything downstream embeds this
        // exchange, so a failure here is fatal with no partial artifacts.
        let built = proto_prompt(&api, &source, &exposed_methods, &dto_fields, &references);
        let state = self
            .engine
            .run(&PromptHooks::new(built))
            .await
            .with_context(|| format!("proto generation failed for {}", request.class_name))?;
        let final_response = state.final_response.clone().unwrap_or_default();
        let parsing = proto_parsing_prompt(&api, &final_response);
        let solution: ProtoSolution = self
            .parser
            .parse(&parsing.system, &parsing.user, &parsing.suffix)
            .await
            .with_context(|| format!("proto parsing failed for {}", request.class_name))?;
        let proto = GeneratedFile::proto(&api.proto_filename, &solution.proto_code);
        let proto_exchange = state
            .generation_exchange()
            .ok_or_else(|| anyhow!("proto generation produced no exchange"))?
            .clone();

        // The DTO mapper is deterministic template output, rendered once
        // and shared as context by the server and every client.
        let mapper = match api.decision {
            ApproachType::DtoBased => Some(GeneratedFile::java_class(
                &api.mapper_name,
                render_dto_mapper(&api, &dto_fields),
            )),
            ApproachType::IdBased => None,
        };
        let mapper_source = mapper.as_ref().map(|m| m.content.clone());

        // Step 2: server plus one client per consumer, concurrently. The
        // pool keeps the server and first client racing while remaining
        // clients queue behind it.
        let pool_size = match api.decision {
            ApproachType::IdBased => (1 + request.client_microservices.len()).min(2),
            ApproachType::DtoBased => 2,
        };
        let pool = Arc::new(Semaphore::new(pool_size.max(1)));

        let server_handle = {
            let pool = pool.clone();
            let engine = self.engine.clone();
            let parser = self.parser.clone();
            let api = api.clone();
            let references = references.clone();
            let mapper_source = mapper_source.clone();
            let proto_exchange = proto_exchange.clone();
            tokio::spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("worker pool closed: {e}"))?;
                let built = server_prompt(
                    &api,
                    &proto_exchange.prompt,
                    &proto_exchange.response,
                    mapper_source.as_deref(),
                    &references,
                );
                let state = engine.run(&PromptHooks::new(built)).await?;
                let response = state.final_response.unwrap_or_default();
                let parsing = grpc_parsing_prompt(&api, &response, "server", None);
                let solution: GrpcSolution = parser
                    .parse(&parsing.system, &parsing.user, &parsing.suffix)
                    .await?;
                Ok::<GeneratedFile, anyhow::Error>(GeneratedFile::java_class(
                    &api.server_name,
                    solution.source_code,
                ))
            })
        };

        let mut client_handles = Vec::with_capacity(request.client_microservices.len());
        for client_ms in &request.client_microservices {
            let pool = pool.clone();
            let engine = self.engine.clone();
            let parser = self.parser.clone();
            let api = api.clone();
            let references = references.clone();
            let mapper_source = mapper_source.clone();
            let proto_exchange = proto_exchange.clone();
            let exposed = exposed_methods.clone();
            let client_key = client_ms.clone();
            let client_ms = client_ms.clone();
            let handle = tokio::spawn(async move {
                let _permit = pool
                    .acquire_owned()
                    .await
                    .map_err(|e| anyhow!("worker pool closed: {e}"))?;
                let built = client_prompt(
                    &api,
                    &proto_exchange.prompt,
                    &proto_exchange.response,
                    &client_ms,
                    &exposed,
                    mapper_source.as_deref(),
                    &references,
                );
                let state = engine.run(&PromptHooks::new(built)).await?;
                let response = state.final_response.unwrap_or_default();
                let parsing = grpc_parsing_prompt(&api, &response, "client", Some(&client_ms));
                let solution: GrpcSolution = parser
                    .parse(&parsing.system, &parsing.user, &parsing.suffix)
                    .await?;
                Ok::<GeneratedFile, anyhow::Error>(GeneratedFile::java_class(
                    &api.client_name,
                    solution.source_code,
                ))
            });
            client_handles.push((client_key, handle));
        }

        // Barrier: the result mapping is assembled only after every task
        // resolved, failures captured per key.
        let mut output = RefactorOutput {
            class_name: request.class_name.clone(),
            proto: Some(proto),
            mapper,
            ..RefactorOutput::default()
        };
        match server_handle.await {
            Ok(Ok(file)) => output.server = Some(file),
            Ok(Err(e)) => {
                error!("Server generation failed for {}: {e:#}", request.class_name);
                output.server_error = Some(format!("{e:#}"));
            }
            Err(e) => {
                error!("Server task panicked for {}: {e}", request.class_name);
                output.server_error = Some(e.to_string());
            }
        }
        for (client_ms, handle) in client_handles {
            match handle.await {
                Ok(Ok(file)) => {
                    output.clients.insert(client_ms, file);
                }
                Ok(Err(e)) => {
                    error!(
                        "Client generation failed for {} (consumer {client_ms}): {e:#}",
                        request.class_name
                    );
                    output.client_errors.insert(client_ms, format!("{e:#}"));
                }
                Err(e) => {
                    error!(
                        "Client task panicked for {} (consumer {client_ms}): {e}",
                        request.class_name
                    );
                    output.client_errors.insert(client_ms, e.to_string());
                }
            }
        }
        if output.has_failures() {
            warn!(
                "Refactoring {} finished with partial results ({} client failures)",
                request.class_name,
                output.client_errors.len()
            );
        }
        Ok(output)
    }
}
