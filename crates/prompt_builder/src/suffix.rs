use crate::kinds::PromptKind;

/// Build the semantic cache suffix for one prompt:
/// `<base package as path>/<basename>/<basename>-<version>[/<client ms>]/<class>`.
///
/// Client prompts insert the consuming microservice so that concurrent
/// client generations of the same class write to disjoint directories.
pub fn cache_suffix(
    base_package: &str,
    kind: PromptKind,
    class_simple_name: &str,
    client_microservice: Option<&str>,
) -> String {
    let mut parts = vec![
        base_package.replace('.', "/"),
        kind.basename().to_string(),
        kind.dir_name(),
    ];
    if let Some(ms) = client_microservice {
        parts.push(ms.to_string());
    }
    parts.push(class_simple_name.to_string());
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_layout_matches_the_cache_partitioning() {
        assert_eq!(
            cache_suffix("com.app", PromptKind::IdProto, "Order", None),
            "com/app/using_id_grpc_proto/using_id_grpc_proto-0.0.5/Order"
        );
    }

    #[test]
    fn client_suffixes_are_partitioned_by_microservice() {
        let a = cache_suffix("com.app", PromptKind::DtoClient, "Order", Some("ms-billing"));
        let b = cache_suffix("com.app", PromptKind::DtoClient, "Order", Some("ms-shipping"));
        assert_ne!(a, b);
        assert!(a.contains("/ms-billing/"));
    }
}
