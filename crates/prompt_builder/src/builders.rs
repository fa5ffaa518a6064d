use app_model::{package_of, ApproachType, FieldDetail, PlannedApiClass, ReferenceMap};

use crate::context::format_reference_context;
use crate::kinds::PromptKind;
use crate::suffix::cache_suffix;
use crate::templates;

/// A fully rendered prompt together with the cache suffix it should be
/// stored under.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub system: String,
    pub user: String,
    pub suffix: String,
}

/// Proto-contract generation prompt. Branches on the approach decision of
/// the class; `fields` is only consulted for DTO-based classes.
pub fn proto_prompt(
    api: &PlannedApiClass,
    class_source: &str,
    methods: &[String],
    fields: &[FieldDetail],
    references: &ReferenceMap,
) -> BuiltPrompt {
    let methods_list = methods.join(", ");
    let reference_context = format_reference_context(references);
    let (kind, user) = match api.decision {
        ApproachType::IdBased => {
            let user = templates::fill(
                templates::ID_PROTO_USER,
                &[
                    ("class_full_name", &api.full_name),
                    ("class_source", class_source),
                    ("methods", &methods_list),
                    ("proto_package", &api.proto_package),
                    ("service_name", &api.service_name),
                    ("reference_context", &reference_context),
                ],
            );
            (PromptKind::IdProto, user)
        }
        ApproachType::DtoBased => {
            let fields_list = fields
                .iter()
                .map(|f| format!("{}: {}", f.variable_name, f.type_name))
                .collect::<Vec<_>>()
                .join(", ");
            let user = templates::fill(
                templates::DTO_PROTO_USER,
                &[
                    ("class_full_name", &api.full_name),
                    ("class_source", class_source),
                    ("methods", &methods_list),
                    ("fields", &fields_list),
                    ("dto_name", &api.dto_name),
                    ("proto_package", &api.proto_package),
                    ("service_name", &api.service_name),
                    ("reference_context", &reference_context),
                ],
            );
            (PromptKind::DtoProto, user)
        }
    };
    BuiltPrompt {
        system: templates::GEN_SYSTEM.to_string(),
        user,
        suffix: cache_suffix(&api.package_name, kind, &api.simple_name, None),
    }
}

/// Server implementation prompt. Embeds the proto prompt and response
/// verbatim so the model reproduces the agreed contract instead of
/// reinventing it.
pub fn server_prompt(
    api: &PlannedApiClass,
    proto_prompt_text: &str,
    proto_response: &str,
    mapper_source: Option<&str>,
    references: &ReferenceMap,
) -> BuiltPrompt {
    let kind = match api.decision {
        ApproachType::IdBased => PromptKind::IdServer,
        ApproachType::DtoBased => PromptKind::DtoServer,
    };
    let user = templates::fill(
        templates::SERVER_USER,
        &[
            ("class_full_name", &api.full_name),
            ("proto_prompt", proto_prompt_text),
            ("proto_response", proto_response),
            ("server_name", &api.server_name),
            ("server_package", package_of(&api.server_name)),
            ("microservice_uid", &api.microservice_id),
            ("mapper_section", &mapper_section(mapper_source)),
            ("reference_context", &format_reference_context(references)),
        ],
    );
    BuiltPrompt {
        system: templates::GEN_SYSTEM.to_string(),
        user,
        suffix: cache_suffix(&api.package_name, kind, &api.simple_name, None),
    }
}

/// Client stub prompt for one consuming microservice. The suffix is
/// partitioned by the consumer so concurrent client generations of the same
/// class never share cache entries.
#[allow(clippy::too_many_arguments)]
pub fn client_prompt(
    api: &PlannedApiClass,
    proto_prompt_text: &str,
    proto_response: &str,
    client_microservice: &str,
    exposed_methods: &[String],
    mapper_source: Option<&str>,
    references: &ReferenceMap,
) -> BuiltPrompt {
    let kind = match api.decision {
        ApproachType::IdBased => PromptKind::IdClient,
        ApproachType::DtoBased => PromptKind::DtoClient,
    };
    let method_section = if exposed_methods.is_empty() {
        String::new()
    } else {
        format!(" ({})", exposed_methods.join(", "))
    };
    let user = templates::fill(
        templates::CLIENT_USER,
        &[
            ("class_full_name", &api.full_name),
            ("proto_prompt", proto_prompt_text),
            ("proto_response", proto_response),
            ("client_name", &api.client_name),
            ("client_package", package_of(&api.client_name)),
            ("client_ms", client_microservice),
            ("microservice_uid", &api.microservice_id),
            ("method_section", &method_section),
            ("mapper_section", &mapper_section(mapper_source)),
            ("reference_context", &format_reference_context(references)),
        ],
    );
    BuiltPrompt {
        system: templates::GEN_SYSTEM.to_string(),
        user,
        suffix: cache_suffix(
            &api.package_name,
            kind,
            &api.simple_name,
            Some(client_microservice),
        ),
    }
}

/// Correction prompt for an artifact that failed verification. The suffix
/// nests under the original generation's suffix so corrected exchanges sit
/// next to the one they repair.
pub fn correction_prompt(
    original_prompt: &str,
    original_response: &str,
    feedback: &str,
    base_suffix: &str,
) -> BuiltPrompt {
    let user = templates::fill(
        templates::CORRECTION_USER,
        &[
            ("original_prompt", original_prompt),
            ("original_response", original_response),
            ("feedback", feedback),
        ],
    );
    BuiltPrompt {
        system: templates::CORRECTION_SYSTEM.to_string(),
        user,
        suffix: format!("{base_suffix}/{}", PromptKind::Correction.dir_name()),
    }
}

/// Structured-extraction prompt for a proto generation answer.
pub fn proto_parsing_prompt(api: &PlannedApiClass, response: &str) -> BuiltPrompt {
    BuiltPrompt {
        system: templates::PARSING_SYSTEM.to_string(),
        user: templates::fill(templates::PROTO_PARSING_USER, &[("response", response)]),
        suffix: cache_suffix(
            &api.package_name,
            PromptKind::ProtoParsing,
            &api.simple_name,
            None,
        ),
    }
}

/// Structured-extraction prompt for a server or client generation answer.
/// `mode` names the artifact ("server" or "client") and keeps the two parse
/// results for one class apart in the cache.
pub fn grpc_parsing_prompt(
    api: &PlannedApiClass,
    response: &str,
    mode: &str,
    client_microservice: Option<&str>,
) -> BuiltPrompt {
    BuiltPrompt {
        system: templates::PARSING_SYSTEM.to_string(),
        user: templates::fill(
            templates::GRPC_PARSING_USER,
            &[("response", response), ("mode", mode)],
        ),
        suffix: cache_suffix(
            &api.package_name,
            PromptKind::GrpcParsing,
            &format!("{}-{mode}", api.simple_name),
            client_microservice,
        ),
    }
}

fn mapper_section(mapper_source: Option<&str>) -> String {
    match mapper_source {
        Some(src) => format!(
            "\nThe DTO mapper below is already generated; use it for all \
             entity/DTO conversion instead of writing your own:\n```java\n{src}\n```\n"
        ),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_model::ApproachType;

    fn dto_api() -> PlannedApiClass {
        PlannedApiClass::new("com.app.Order", "ms-orders", ApproachType::DtoBased, "com.app")
    }

    fn id_api() -> PlannedApiClass {
        PlannedApiClass::new("com.app.UserRegistry", "ms-users", ApproachType::IdBased, "com.app")
    }

    #[test]
    fn dto_proto_prompt_names_the_dto_and_fields() {
        let fields = vec![FieldDetail {
            variable_name: "status".into(),
            type_name: "String".into(),
            from_library: false,
        }];
        let built = proto_prompt(
            &dto_api(),
            "class Order {}",
            &["ship".into()],
            &fields,
            &ReferenceMap::default(),
        );
        assert!(built.user.contains("OrderDTO"));
        assert!(built.user.contains("status: String"));
        assert!(built.user.contains("ship"));
        assert!(built.suffix.contains("using_dto_grpc_proto-0.0.5"));
        assert!(!built.user.contains("{class_full_name}"));
        assert!(!built.user.contains("{reference_context}"));
    }

    #[test]
    fn id_proto_prompt_asks_for_object_identifiers() {
        let built = proto_prompt(
            &id_api(),
            "class UserRegistry {}",
            &["register".into()],
            &[],
            &ReferenceMap::default(),
        );
        assert!(built.user.contains("RefactoredObjectID"));
        assert!(built.suffix.starts_with("com/app/using_id_grpc_proto/"));
    }

    #[test]
    fn server_prompt_embeds_the_proto_exchange_verbatim() {
        let built = server_prompt(
            &dto_api(),
            "PROTO PROMPT TEXT",
            "PROTO RESPONSE TEXT",
            Some("class OrderMapper {}"),
            &ReferenceMap::default(),
        );
        assert!(built.user.contains("PROTO PROMPT TEXT"));
        assert!(built.user.contains("PROTO RESPONSE TEXT"));
        assert!(built.user.contains("class OrderMapper {}"));
        assert!(built.user.contains("com.app.generated.server.OrderImpl"));
    }

    #[test]
    fn client_prompts_for_two_consumers_use_disjoint_suffixes() {
        let api = dto_api();
        let a = client_prompt(&api, "p", "r", "ms-billing", &[], None, &ReferenceMap::default());
        let b = client_prompt(&api, "p", "r", "ms-shipping", &[], None, &ReferenceMap::default());
        assert_ne!(a.suffix, b.suffix);
        assert!(a.user.contains("ms-billing"));
    }

    #[test]
    fn correction_suffix_nests_under_the_original() {
        let built = correction_prompt("orig p", "orig r", "does not compile", "com/app/x/Order");
        assert!(built.suffix.starts_with("com/app/x/Order/correction-"));
        assert!(built.user.contains("does not compile"));
    }

    #[test]
    fn parsing_prompts_keep_server_and_client_results_apart() {
        let api = dto_api();
        let s = grpc_parsing_prompt(&api, "answer", "server", None);
        let c = grpc_parsing_prompt(&api, "answer", "client", Some("ms-billing"));
        assert_ne!(s.suffix, c.suffix);
        assert!(s.user.contains("server"));
        assert!(proto_parsing_prompt(&api, "answer").user.contains("proto_code"));
    }
}
