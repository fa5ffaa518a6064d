//! Raw prompt templates. Placeholders use `{name}` and are substituted by
//! [`fill`]; keep placeholder names in sync with the builder functions.

pub(crate) const GEN_SYSTEM: &str = "\
You are an expert Java and gRPC engineer working on the decomposition of a \
monolithic Java application into microservices. You produce complete, \
compilable artifacts and never omit code with placeholders.";

pub(crate) const CORRECTION_SYSTEM: &str = "\
You are an expert Java and gRPC engineer. You receive an artifact you \
previously generated together with a failure report, and you return a \
corrected version of the complete artifact.";

pub(crate) const PARSING_SYSTEM: &str = "\
You convert free-form answers into strict JSON. Reply with a single JSON \
object and nothing else: no prose, no markdown fence.";

pub(crate) const ID_PROTO_USER: &str = "\
The class `{class_full_name}` is being exposed as a remote gRPC API using \
the ID-based approach: remote methods exchange object identifiers \
(RefactoredObjectID messages), never full object graphs.

Class source:
```java
{class_source}
```

Methods to expose: {methods}

Write a proto3 file for package `{proto_package}` defining service \
`{service_name}` with one rpc per exposed method. Represent every \
application-typed parameter and return value as an object identifier \
message.
{reference_context}";

pub(crate) const DTO_PROTO_USER: &str = "\
The class `{class_full_name}` is being exposed as a remote gRPC API using \
the DTO-based approach: remote methods exchange `{dto_name}` messages that \
mirror the entity's own fields.

Class source:
```java
{class_source}
```

Methods to expose: {methods}
Fields to carry in the DTO message: {fields}

Write a proto3 file for package `{proto_package}` defining the \
`{dto_name}` message with the listed fields and service `{service_name}` \
with one rpc per exposed method.
{reference_context}";

pub(crate) const SERVER_USER: &str = "\
Below is the prompt and the answer that produced the proto contract for \
class `{class_full_name}`. Treat the proto contract as ground truth.

--- proto generation prompt ---
{proto_prompt}
--- proto generation response ---
{proto_response}
--- end ---

Implement the gRPC server class `{server_name}` (package \
`{server_package}`) for microservice `{microservice_uid}`, extending the \
generated service base class and delegating to the original \
`{class_full_name}` implementation.
{mapper_section}{reference_context}";

pub(crate) const CLIENT_USER: &str = "\
Below is the prompt and the answer that produced the proto contract for \
class `{class_full_name}`. Treat the proto contract as ground truth.

--- proto generation prompt ---
{proto_prompt}
--- proto generation response ---
{proto_response}
--- end ---

Implement the gRPC client class `{client_name}` (package \
`{client_package}`) used by microservice `{client_ms}` to call the API \
hosted on microservice `{microservice_uid}`. The client must expose the \
same local signatures as the original class{method_section} and hide all \
gRPC plumbing.
{mapper_section}{reference_context}";

pub(crate) const CORRECTION_USER: &str = "\
You previously answered the prompt below and the result failed \
verification.

--- original prompt ---
{original_prompt}
--- original response ---
{original_response}
--- failure report ---
{feedback}
--- end ---

Return the corrected, complete artifact.";

pub(crate) const PROTO_PARSING_USER: &str = "\
Extract the proto file from the answer below and reply with a JSON object \
with exactly these string fields: \"explanation\", \"proto_code\", \
\"file_name\", \"service_name\", \"additional_comments\".

--- answer ---
{response}
--- end ---";

pub(crate) const GRPC_PARSING_USER: &str = "\
Extract the generated {mode} class from the answer below and reply with a \
JSON object with exactly these string fields: \"class_name\", \
\"package_name\", \"source_code\", \"explanation\", \
\"additional_comments\".

--- answer ---
{response}
--- end ---";

/// Substitute `{name}` placeholders. Unknown placeholders are left in
/// place so a forgotten substitution is visible in the cached prompt.
pub(crate) fn fill(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in substitutions {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_replaces_all_occurrences() {
        let out = fill("{a} and {a} but not {b}", &[("a", "x")]);
        assert_eq!(out, "x and x but not {b}");
    }
}
