use std::collections::BTreeMap;
use std::collections::BTreeSet;

use app_model::{AppModel, PlannedApiClass};
use log::warn;
use regex::Regex;

/// Reduce raw method identifiers (possibly qualified as
/// `com.app.Order::ship`) to sorted, deduplicated simple names.
pub fn simple_method_names(raw: &[String]) -> Vec<String> {
    let mut names: BTreeSet<String> = raw
        .iter()
        .map(|m| match m.rsplit("::").next() {
            Some(simple) => simple.to_string(),
            None => m.clone(),
        })
        .collect();
    names.retain(|n| !n.is_empty());
    names.into_iter().collect()
}

/// Drop accessor methods that shadow DTO field access: a method counts as
/// an accessor when it matches `get`/`set`/`is` followed by a capitalized
/// suffix whose lower-cased form names one of the class's own fields.
pub fn exclude_getters_setters(methods: &[String], field_names: &BTreeSet<String>) -> Vec<String> {
    let accessor = Regex::new(r"^(get|set|is)([A-Z][^.]*)?").expect("hard-coded pattern");
    methods
        .iter()
        .filter(|method| {
            let Some(captures) = accessor.captures(method) else {
                return true;
            };
            let Some(suffix) = captures.get(2) else {
                return true;
            };
            let field = lower_first(suffix.as_str());
            !field_names.contains(&field)
        })
        .cloned()
        .collect()
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Diagnostic pass before refactoring a class: cross-API-class type
/// relationships can produce malformed contracts, so they are reported
/// but never block generation. Returns the warnings it logged.
pub fn check_class(
    model: &dyn AppModel,
    api_classes: &BTreeMap<String, PlannedApiClass>,
    class_name: &str,
) -> Vec<String> {
    let mut warnings = Vec::new();
    let probes: [(&str, Result<Vec<String>, _>); 3] = [
        ("input type", model.get_input_types(class_name)),
        ("output type", model.get_output_types(class_name)),
        ("field type", model.get_field_types(class_name)),
    ];
    for (kind, types) in probes {
        let Ok(types) = types else { continue };
        for referenced in types {
            if referenced != class_name && api_classes.contains_key(&referenced) {
                let message = format!(
                    "Class {class_name} has {kind} {referenced} which is itself an API class; \
                     the generated contract may be malformed."
                );
                warn!("{message}");
                warnings.push(message);
            }
        }
    }
    warnings
}
