//! Keyword-based classification
//!
//! Deterministic, zero-I/O category detection used whenever LLM
//! classification is disabled or fails. Matching is case-insensitive substring
//! search, so `"class"` also matches `"classic"`; that looseness is accepted
//! since this path only runs as a fallback.

use super::Category;

/// Programming-related keywords
pub const CODE_KEYWORDS: &[&str] = &[
    "code", "programming", "function", "class", "method", "algorithm", "debug", "error", "bug",
    "syntax", "compile", "runtime", "api", "database", "sql", "javascript", "python", "java",
    "c++", "html", "css", "react", "node", "docker", "git", "deploy", "server", "client",
    "frontend", "backend", "framework", "library",
];

/// Creative-writing keywords
pub const CREATIVE_KEYWORDS: &[&str] = &[
    "story", "poem", "creative", "fiction", "narrative", "character", "plot", "scene",
    "dialogue", "description", "imagine", "write", "compose", "artistic", "expressive",
    "emotional", "metaphor", "simile", "rhyme", "verse", "prose", "novel", "short story",
];

/// Keyword classifier
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a query by keyword presence
    ///
    /// A code keyword wins over a creative keyword; no match is `General`.
    pub fn classify(&self, query: &str) -> Category {
        let query_lower = query.to_lowercase();

        if contains_any(&query_lower, CODE_KEYWORDS) {
            Category::Code
        } else if contains_any(&query_lower, CREATIVE_KEYWORDS) {
            Category::Creative
        } else {
            Category::General
        }
    }
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_keyword_routes_to_code() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("Write a Python function to sort a list"),
            Category::Code
        );
        assert_eq!(classifier.classify("Debug this JavaScript"), Category::Code);
    }

    #[test]
    fn test_code_beats_creative() {
        // "write" and "story" are creative, "api" is code
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("write a story about an api"),
            Category::Code
        );
    }

    #[test]
    fn test_creative_keyword_routes_to_creative() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("Compose a poem about the sea"),
            Category::Creative
        );
        assert_eq!(
            classifier.classify("Tell me a short story"),
            Category::Creative
        );
    }

    #[test]
    fn test_no_keyword_is_general() {
        let classifier = KeywordClassifier::new();
        assert_eq!(
            classifier.classify("What is the weather like today?"),
            Category::General
        );
        assert_eq!(classifier.classify(""), Category::General);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("SQL JOIN help"), Category::Code);
        assert_eq!(classifier.classify("A METAPHOR for love"), Category::Creative);
    }

    #[test]
    fn test_substring_matching() {
        // "classic" contains "class"
        let classifier = KeywordClassifier::new();
        assert_eq!(classifier.classify("a classic car"), Category::Code);
    }

    #[test]
    fn test_keyword_sets_are_lowercase() {
        for keyword in CODE_KEYWORDS.iter().chain(CREATIVE_KEYWORDS) {
            assert_eq!(*keyword, keyword.to_lowercase());
        }
    }
}
