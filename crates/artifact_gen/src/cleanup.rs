use log::warn;
use regex::Regex;

/// Strip a single triple-backtick block if the model wrapped its answer in
/// one. An empty result is reported but still returned as an empty string;
/// callers must check for emptiness.
pub fn strip_code_fence(code: &str) -> String {
    let pattern = Regex::new(r"(?s)```(\S*)\n(.*?)\n```").expect("hard-coded pattern");
    if let Some(captures) = pattern.captures(code) {
        warn!(
            "Found code enclosed in {} block",
            captures.get(1).map(|m| m.as_str()).unwrap_or("")
        );
        return captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }
    if code.trim().is_empty() {
        warn!("Code is empty");
        return String::new();
    }
    code.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_java_block_is_unwrapped() {
        let fenced = "```java\npublic class A {}\n```";
        assert_eq!(strip_code_fence(fenced), "public class A {}");
    }

    #[test]
    fn fenced_block_without_language_tag_is_unwrapped() {
        let fenced = "```\nsyntax = \"proto3\";\n```";
        assert_eq!(strip_code_fence(fenced), "syntax = \"proto3\";");
    }

    #[test]
    fn unfenced_code_passes_through() {
        assert_eq!(strip_code_fence("class A {}"), "class A {}");
    }

    #[test]
    fn whitespace_only_input_becomes_empty() {
        assert_eq!(strip_code_fence("   \n  "), "");
    }
}
