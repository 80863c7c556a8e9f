use regex::Regex;

use crate::models::{Category, Rule, Transaction};

const MAX_SUGGESTIONS: usize = 3;
const INCOME_FALLBACK: &str = "Revenue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub category: String,
    pub confidence: Confidence,
    pub rule_id: Option<i64>,
}

pub const MATCH_TYPES: &[&str] = &["contains", "starts_with", "regex"];

pub fn matches(text: &str, pattern: &str, match_type: &str) -> bool {
    let text_upper = text.to_uppercase();
    let pat_upper = pattern.to_uppercase();
    match match_type {
        "contains" => text_upper.contains(&pat_upper),
        "starts_with" => text_upper.starts_with(&pat_upper),
        "regex" => Regex::new(&format!("(?i){pattern}"))
            .map(|re| re.is_match(text))
            .unwrap_or(false),
        _ => false,
    }
}

/// Keyword-based category guesses for one transaction. Rules are expected
/// in priority order (highest first). A rule hit on the counterparty counts
/// more than a hit on the free-text reference.
pub fn suggest(txn: &Transaction, rules: &[Rule], taxonomy: &[Category]) -> Vec<Suggestion> {
    let known = |label: &str| taxonomy.iter().any(|c| c.label == label);
    let mut out: Vec<Suggestion> = Vec::new();

    for rule in rules {
        if !known(&rule.category) {
            continue;
        }
        let confidence = if matches(txn.counterparty(), &rule.pattern, &rule.match_type) {
            Confidence::High
        } else if matches(&txn.reference, &rule.pattern, &rule.match_type) {
            Confidence::Medium
        } else {
            continue;
        };
        match out.iter_mut().find(|s| s.category == rule.category) {
            Some(existing) if existing.confidence < confidence => {
                existing.confidence = confidence;
                existing.rule_id = Some(rule.id);
            }
            Some(_) => {}
            None => out.push(Suggestion {
                category: rule.category.clone(),
                confidence,
                rule_id: Some(rule.id),
            }),
        }
    }

    if txn.is_inflow() && known(INCOME_FALLBACK) && !out.iter().any(|s| s.category == INCOME_FALLBACK) {
        out.push(Suggestion {
            category: INCOME_FALLBACK.to_string(),
            confidence: Confidence::Low,
            rule_id: None,
        });
    }

    // stable: equal confidence keeps rule priority order
    out.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    out.truncate(MAX_SUGGESTIONS);
    out
}
