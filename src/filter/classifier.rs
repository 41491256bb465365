use regex::Regex;

/// Predicate over a single log line.
pub trait LineClassifier: Send + Sync {
    fn matches(&self, line: &str) -> bool;
}

const Z2M_DEBUG: &str = r"^\[[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}\]\s+debug:";

/// Recognizes Zigbee2MQTT debug-level lines, e.g.
/// `[2024-01-01 10:00:00] debug: z2m: Received MQTT message`.
#[derive(Debug, Clone)]
pub struct DebugLineClassifier {
    pattern: Regex,
}

impl DebugLineClassifier {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(Z2M_DEBUG).expect("debug line pattern is valid"),
        }
    }
}

impl Default for DebugLineClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LineClassifier for DebugLineClassifier {
    fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_lines() {
        let classifier = DebugLineClassifier::new();
        assert!(classifier.matches("[2024-01-01 10:00:00] debug: \tz2m: Received MQTT message"));
        assert!(classifier.matches("[2024-01-01 10:00:00]  debug: spaced"));
        assert!(classifier.matches("[2024-01-01 10:00:00]\tdebug: tabbed"));
    }

    #[test]
    fn test_other_levels_do_not_match() {
        let classifier = DebugLineClassifier::new();
        assert!(!classifier.matches("[2024-01-01 10:00:00] info: \tz2m: Connected"));
        assert!(!classifier.matches("[2024-01-01 10:00:00] error: failed"));
    }

    #[test]
    fn test_case_sensitive() {
        let classifier = DebugLineClassifier::new();
        assert!(!classifier.matches("[2024-01-01 10:00:00] DEBUG: loud"));
    }

    #[test]
    fn test_requires_bracketed_prefix() {
        let classifier = DebugLineClassifier::new();
        assert!(!classifier.matches("2024-01-01 10:00:00 debug: unbracketed"));
        assert!(!classifier.matches("[2024-01-01 10:00:00]debug: no gap"));
        assert!(!classifier.matches("note [2024-01-01 10:00:00] debug: mid-line"));
        assert!(!classifier.matches(""));
    }
}
