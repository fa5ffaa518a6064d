use log::debug;
use regex::Regex;
use similar::TextDiff;

/// Normalizes and compares compilation logs from Maven/Gradle/javac runs.
pub struct LogComparator {
    timestamp_patterns: Vec<Regex>,
    noise_patterns: Vec<Regex>,
}

impl Default for LogComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl LogComparator {
    pub fn new() -> Self {
        let timestamp_patterns = [
            // ISO format: 2024-01-15T10:30:45.123Z
            r"\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?",
            // Bracketed: [10:30:45] or [2024-01-15 10:30:45]
            r"\[\d{2}:\d{2}:\d{2}\]",
            r"\[\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\]",
            // Gradle: 10:30:45.123
            r"\d{2}:\d{2}:\d{2}\.\d{3}",
            // General clock times, optionally with AM/PM
            r"\d{1,2}:\d{2}:\d{2}(?:\.\d{3})?(?:\s*[AP]M)?",
            // Bare dates
            r"\d{4}-\d{2}-\d{2}",
            r"\d{2}/\d{2}/\d{4}",
        ];
        let noise_patterns = [
            // Elapsed time: "Execution time: 1.234s", "took 5.67 seconds"
            r"(?i)(?:execution time|took|completed in)[:\s]+\d+(?:\.\d+)?\s*(?:milliseconds|seconds|ms|s)\b",
            // Bare durations: "950ms", "1.2s", "3 seconds"
            r"(?i)\d+(?:\.\d+)?\s*(?:milliseconds|seconds|ms|s)\b",
            // Memory figures
            r"(?i)(?:memory|heap)[:\s]+\d+(?:\.\d+)?(?:MB|GB|KB)",
            // Process/thread ids
            r"(?i)(?:PID|TID|Thread)[:\s#]+\d+",
            // Build session ids or hashes
            r"(?i)(?:session|build|task)[:\s-]+[a-f0-9]{8,}",
            // Temp file references
            r"/tmp/[a-zA-Z0-9_-]+",
            r"\\temp\\[a-zA-Z0-9_-]+",
            // Injected line-number prefixes ("L27: ")
            r"L\d+\s*:\s*",
        ];
        Self {
            timestamp_patterns: compile_all(&timestamp_patterns),
            noise_patterns: compile_all(&noise_patterns),
        }
    }

    /// Strip volatile tokens, drop blank lines and sort what remains.
    /// Sorting makes the comparison insensitive to non-deterministic
    /// interleaving of build-tool output.
    pub fn normalize_segment(&self, log: &str) -> String {
        let mut normalized = log.to_string();
        for pattern in &self.timestamp_patterns {
            normalized = pattern.replace_all(&normalized, "[TIMESTAMP]").into_owned();
        }
        for pattern in &self.noise_patterns {
            normalized = pattern.replace_all(&normalized, "[BUILD_DATA]").into_owned();
        }
        let mut lines: Vec<&str> = normalized
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        lines.sort_unstable();
        lines.join("\n")
    }

    /// Extract compiler/build-tool failure lines with their immediate
    /// context.
    pub fn extract_errors(&self, log: &str) -> Vec<String> {
        let lines: Vec<&str> = log.lines().collect();
        let mut errors = Vec::new();
        for (i, raw) in lines.iter().enumerate() {
            let line = raw.trim();
            let lower = line.to_lowercase();
            if lower.contains("error:") {
                errors.push(line.to_string());
                // Keep the preceding location line when it is not a
                // bracketed status line.
                if i > 0 {
                    let prev = lines[i - 1].trim();
                    if !prev.is_empty() && !prev.starts_with('[') {
                        errors.push(prev.to_string());
                    }
                }
            } else if line.contains("[ERROR]")
                && ["compilation", "compile", "error"]
                    .iter()
                    .any(|kw| lower.contains(kw))
            {
                errors.push(line.to_string());
            } else if line.starts_with("> ") && lower.contains("error") {
                errors.push(line.to_string());
            } else if ["compilation failed", "build failed", "cannot find symbol"]
                .iter()
                .any(|kw| lower.contains(kw))
            {
                errors.push(line.to_string());
            }
        }
        errors
    }

    /// Whether a correction attempt actually changed the failure. By
    /// default only the normalized, sorted extracted error sets are
    /// compared; `compare_full_log` opts into comparing the whole
    /// normalized log instead.
    pub fn has_error_changed(
        &self,
        previous_log: &str,
        current_log: &str,
        compare_full_log: bool,
    ) -> bool {
        if compare_full_log {
            return self.normalize_segment(previous_log) != self.normalize_segment(current_log);
        }
        let previous = self.normalized_errors(previous_log);
        let current = self.normalized_errors(current_log);
        debug!(
            "Comparing {} previous error lines against {} current",
            previous.len(),
            current.len()
        );
        previous != current
    }

    /// Normalized representation of a log for persistence/inspection.
    pub fn normalize_log(&self, log: &str, compare_full_log: bool) -> String {
        if compare_full_log {
            self.normalize_segment(log)
        } else {
            let mut errors = self.extract_errors(log);
            errors.sort_unstable();
            errors
                .iter()
                .map(|e| self.normalize_segment(e))
                .collect::<Vec<_>>()
                .join("\n")
        }
    }

    /// Human-readable unified diff of the extracted-and-normalized error
    /// lists, or an empty string when nothing changed.
    pub fn error_diff(&self, previous_log: &str, current_log: &str) -> String {
        let previous = self.normalized_errors(previous_log).join("\n");
        let current = self.normalized_errors(current_log).join("\n");
        if previous == current {
            return String::new();
        }
        TextDiff::from_lines(&previous, &current)
            .unified_diff()
            .header("previous compilation", "current compilation")
            .to_string()
    }

    fn normalized_errors(&self, log: &str) -> Vec<String> {
        let mut errors: Vec<String> = self
            .extract_errors(log)
            .iter()
            .map(|e| self.normalize_segment(e))
            .collect();
        errors.sort_unstable();
        errors
    }
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("hard-coded pattern"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAVEN_FAIL_A: &str = "\
[10:30:45] [INFO] Compiling 12 source files
/app/src/main/java/com/app/Order.java
[ERROR] COMPILATION ERROR :
Order.java:[27,8] error: cannot find symbol
[INFO] Total time: 3.214s";

    const MAVEN_FAIL_B: &str = "\
[11:02:01] [INFO] Compiling 12 source files
[INFO] Total time: 2.108s
Order.java:[27,8] error: cannot find symbol
/app/src/main/java/com/app/Order.java
[ERROR] COMPILATION ERROR :";

    #[test]
    fn reordered_logs_with_different_timestamps_compare_equal() {
        let cmp = LogComparator::new();
        assert_eq!(
            cmp.normalize_log(MAVEN_FAIL_A, false),
            cmp.normalize_log(MAVEN_FAIL_B, false)
        );
        assert!(!cmp.has_error_changed(MAVEN_FAIL_A, MAVEN_FAIL_B, false));
    }

    #[test]
    fn a_new_error_is_detected() {
        let cmp = LogComparator::new();
        let current = format!("{MAVEN_FAIL_A}\nStatus.java:[3,1] error: ';' expected");
        assert!(cmp.has_error_changed(MAVEN_FAIL_A, &current, false));
        let diff = cmp.error_diff(MAVEN_FAIL_A, &current);
        assert!(diff.contains("';' expected"));
        assert!(diff.contains("previous compilation"));
    }

    #[test]
    fn unchanged_errors_produce_an_empty_diff() {
        let cmp = LogComparator::new();
        assert_eq!(cmp.error_diff(MAVEN_FAIL_A, MAVEN_FAIL_B), "");
    }

    #[test]
    fn gradle_and_generic_markers_are_extracted() {
        let cmp = LogComparator::new();
        let log = "\
> Task :compileJava FAILED
> error: incompatible types
some note
Compilation failed; see the compiler error output for details.";
        let errors = cmp.extract_errors(log);
        assert!(errors.iter().any(|e| e.contains("incompatible types")));
        assert!(errors.iter().any(|e| e.contains("Compilation failed")));
    }

    #[test]
    fn full_log_mode_sees_non_error_churn() {
        let cmp = LogComparator::new();
        let a = "[INFO] Compiling 12 source files";
        let b = "[INFO] Compiling 13 source files";
        assert!(cmp.has_error_changed(a, b, true));
        // No error lines, so the default mode reports no change.
        assert!(!cmp.has_error_changed(a, b, false));
    }

    #[test]
    fn timestamps_and_durations_are_masked() {
        let cmp = LogComparator::new();
        let normalized = cmp.normalize_segment("[10:30:45] build took 5.67 seconds");
        assert!(!normalized.contains("10:30:45"));
        assert!(!normalized.contains("5.67"));
        assert!(!normalized.contains("seconds"));
    }

    #[test]
    fn logs_differing_only_in_elapsed_time_normalize_equal() {
        let cmp = LogComparator::new();
        let a = "[INFO] BUILD SUCCESS\n[INFO] Total time: 3.214 s\ncompileJava took 950ms";
        let b = "[INFO] BUILD SUCCESS\n[INFO] Total time: 12.008 s\ncompileJava took 3 seconds";
        assert_eq!(cmp.normalize_segment(a), cmp.normalize_segment(b));
        assert!(!cmp.has_error_changed(a, b, true));
    }
}
