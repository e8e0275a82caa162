//! Keyword classification of reported vulnerabilities.
//!
//! The report name is consulted first; the free-text details only decide when the
//! name alone matches no rule. Rules are evaluated in declaration order, so narrow
//! classes (SQL injection) precede broader ones that share vocabulary.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{Category, Classification};

struct Rule {
    category: Category,
    pattern: Regex,
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    let table: &[(Category, &str)] = &[
        (
            Category::SqlInjection,
            r"(?i)\b(sql\s*-?\s*injection|sqli|blind\s+sql|union\s+select|nosql\s+injection)\b",
        ),
        (
            Category::Xss,
            r"(?i)(\bxss\b|cross[\s-]*site\s+scripting|script\s+injection|html\s+injection|<script)",
        ),
        (
            Category::PathTraversal,
            r"(?i)(path\s+traversal|directory\s+traversal|\.\./|\blfi\b|local\s+file\s+inclusion|null\s+byte)",
        ),
        (
            Category::MissingSecurityHeaders,
            r"(?i)(security\s+headers?|content[\s-]security[\s-]policy|\bcsp\b|x-frame-options|strict-transport-security|\bhsts\b|x-content-type-options|clickjacking)",
        ),
        (
            Category::BrokenAuth,
            r"(?i)(broken\s+auth|authentication|\blogin\b|password|credential|brute[\s-]*force|\bjwt\b|session\s+(fixation|hijack)|2fa|two[\s-]factor)",
        ),
        (
            Category::SecurityMisconfig,
            r"(?i)(misconfig|directory\s+listing|stack\s+trace|debug\s+mode|verbose\s+error|\bcors\b|exposed\s+(admin|metrics|endpoint)|default\s+config)",
        ),
        (
            Category::SensitiveDataExposure,
            r"(?i)(sensitive\s+data|information\s+disclosure|data\s+exposure|\bleak|confidential\s+document)",
        ),
    ];

    table
        .iter()
        .filter_map(|(category, pattern)| {
            Regex::new(pattern).ok().map(|pattern| Rule { category: *category, pattern })
        })
        .collect()
});

fn match_text(text: &str) -> Option<Category> {
    RULES.iter().find(|r| r.pattern.is_match(text)).map(|r| r.category)
}

/// Map a reported vulnerability to a category and automatable flag.
///
/// Pure and deterministic; unmatched input yields `Unknown` / not automatable.
pub fn classify(name: &str, details: &str) -> Classification {
    match match_text(name).or_else(|| match_text(details)) {
        Some(category) => Classification {
            category,
            automatable: category.is_automatable(),
        },
        None => Classification::unknown(),
    }
}
