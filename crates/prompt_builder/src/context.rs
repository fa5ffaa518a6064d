use app_model::ReferenceMap;

/// Render the resolved references of a class as prompt context. Empty maps
/// produce an empty string so the templates stay clean for leaf classes.
pub fn format_reference_context(references: &ReferenceMap) -> String {
    if references.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "\nThe class references other API-boundary classes. Calls to them must \
         go through their generated clients:\n",
    );
    for api in references.idbased.values() {
        out.push_str(&format!(
            "- `{}` (ID-based): use client `{}`, service `{}`; pass object \
             identifiers, never the object itself.\n",
            api.full_name, api.client_name, api.service_name
        ));
    }
    for api in references.dto.values() {
        out.push_str(&format!(
            "- `{}` (DTO-based): use client `{}`, service `{}`; exchange `{}` \
             messages converted with `{}`.\n",
            api.full_name, api.client_name, api.service_name, api.dto_name, api.mapper_name
        ));
    }
    out
}
