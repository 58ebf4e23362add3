//! Category assignment for transactions
//!
//! Precedence: manual override → user rules → default rules → "Uncategorized".
//! Within each rule list the first pattern that finds a match wins.

use chrono::Utc;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::models::{CategoryRule, UNCATEGORIZED};
use crate::store::Overrides;

/// Compile a rule pattern with its case-sensitivity flag
///
/// Used to reject invalid patterns before a rule is stored.
pub fn compile_pattern(pattern: &str, case_sensitive: bool) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()?)
}

/// Millisecond-timestamp ID for a new rule, bumped until unique among `rules`
pub fn next_rule_id(rules: &[CategoryRule]) -> String {
    let mut millis = Utc::now().timestamp_millis();
    while rules.iter().any(|r| r.id == millis.to_string()) {
        millis += 1;
    }
    millis.to_string()
}

/// Where a category came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum CategorySource {
    Override,
    Rule { rule_id: String },
    Uncategorized,
}

/// A category together with the reason it was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Categorization {
    pub category: String,
    #[serde(flatten)]
    pub source: CategorySource,
}

struct CompiledRule {
    id: String,
    category: String,
    regex: Regex,
}

/// Rule matcher built once per categorization pass
pub struct Categorizer {
    rules: Vec<CompiledRule>,
}

impl Categorizer {
    /// Build from user rules followed by default rules
    ///
    /// Stored patterns are expected to be valid; one that fails to compile
    /// (e.g. a hand-edited file) is skipped.
    pub fn new(user_rules: &[CategoryRule], default_rules: &[CategoryRule]) -> Self {
        let rules = user_rules
            .iter()
            .chain(default_rules)
            .filter_map(|rule| match compile_pattern(&rule.pattern, rule.case_sensitive) {
                Ok(regex) => Some(CompiledRule {
                    id: rule.id.clone(),
                    category: rule.category.clone(),
                    regex,
                }),
                Err(e) => {
                    warn!(rule_id = %rule.id, pattern = %rule.pattern, "Skipping invalid rule: {}", e);
                    None
                }
            })
            .collect();

        Self { rules }
    }

    /// Number of usable rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Category for a transaction
    pub fn categorize(&self, description: &str, transaction_id: &str, overrides: &Overrides) -> String {
        self.explain(description, transaction_id, overrides).category
    }

    /// Category for a transaction, with the override or rule that produced it
    pub fn explain(
        &self,
        description: &str,
        transaction_id: &str,
        overrides: &Overrides,
    ) -> Categorization {
        if let Some(category) = overrides.get(transaction_id).filter(|c| !c.is_empty()) {
            return Categorization {
                category: category.clone(),
                source: CategorySource::Override,
            };
        }

        match self.rules.iter().find(|r| r.regex.is_match(description)) {
            Some(rule) => Categorization {
                category: rule.category.clone(),
                source: CategorySource::Rule {
                    rule_id: rule.id.clone(),
                },
            },
            None => Categorization {
                category: UNCATEGORIZED.to_string(),
                source: CategorySource::Uncategorized,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, pattern: &str, category: &str, case_sensitive: bool) -> CategoryRule {
        CategoryRule {
            id: id.to_string(),
            category: category.to_string(),
            pattern: pattern.to_string(),
            case_sensitive,
        }
    }

    #[test]
    fn test_override_beats_matching_rule() {
        let categorizer = Categorizer::new(&[rule("1", "Coffee", "Dining", false)], &[]);
        let mut overrides = Overrides::new();
        overrides.insert("tx_1".to_string(), "Groceries".to_string());

        let result = categorizer.explain("Blue Bottle Coffee", "tx_1", &overrides);
        assert_eq!(result.category, "Groceries");
        assert_eq!(result.source, CategorySource::Override);
    }

    #[test]
    fn test_empty_override_falls_through_to_rules() {
        let categorizer = Categorizer::new(&[rule("1", "Coffee", "Dining", false)], &[]);
        let mut overrides = Overrides::new();
        overrides.insert("tx_1".to_string(), String::new());

        assert_eq!(
            categorizer.categorize("Blue Bottle Coffee", "tx_1", &overrides),
            "Dining"
        );
    }

    #[test]
    fn test_user_rules_precede_defaults() {
        let categorizer = Categorizer::new(
            &[rule("u1", "AMAZON", "Shopping", false)],
            &[rule("d1", "AMAZON PRIME", "Subscriptions", false)],
        );
        let result = categorizer.explain("Amazon Prime Video", "tx", &Overrides::new());
        assert_eq!(result.category, "Shopping");
        assert_eq!(
            result.source,
            CategorySource::Rule {
                rule_id: "u1".to_string()
            }
        );
    }

    #[test]
    fn test_first_matching_rule_wins_within_list() {
        let categorizer = Categorizer::new(
            &[
                rule("1", "UBER EATS", "Dining", false),
                rule("2", "UBER", "Transport", false),
            ],
            &[],
        );
        let overrides = Overrides::new();
        assert_eq!(categorizer.categorize("UBER EATS 123", "a", &overrides), "Dining");
        assert_eq!(categorizer.categorize("UBER TRIP", "b", &overrides), "Transport");
    }

    #[test]
    fn test_case_sensitivity_flag() {
        let categorizer = Categorizer::new(
            &[
                rule("1", "SHELL", "Gas", true),
                rule("2", "netflix", "Subscriptions", false),
            ],
            &[],
        );
        let overrides = Overrides::new();
        assert_eq!(categorizer.categorize("shell oil", "a", &overrides), UNCATEGORIZED);
        assert_eq!(categorizer.categorize("SHELL OIL", "b", &overrides), "Gas");
        assert_eq!(categorizer.categorize("NETFLIX.COM", "c", &overrides), "Subscriptions");
    }

    #[test]
    fn test_pattern_searches_rather_than_full_match() {
        let categorizer = Categorizer::new(&[rule("1", "^TST\\*", "Dining", false)], &[]);
        let overrides = Overrides::new();
        assert_eq!(categorizer.categorize("TST* Joe's Diner", "a", &overrides), "Dining");
        assert_eq!(categorizer.categorize("Paid TST* Joe", "b", &overrides), UNCATEGORIZED);

        let categorizer = Categorizer::new(&[rule("1", "Coffee", "Dining", false)], &[]);
        assert_eq!(categorizer.categorize("Blue Bottle Coffee Co", "c", &overrides), "Dining");
    }

    #[test]
    fn test_no_match_is_uncategorized() {
        let categorizer = Categorizer::new(&[], &[]);
        let result = categorizer.explain("Anything", "tx", &Overrides::new());
        assert_eq!(result.category, UNCATEGORIZED);
        assert_eq!(result.source, CategorySource::Uncategorized);
    }

    #[test]
    fn test_invalid_stored_pattern_is_skipped() {
        let categorizer = Categorizer::new(
            &[rule("bad", "(unclosed", "Broken", false), rule("ok", "Coffee", "Dining", false)],
            &[],
        );
        assert_eq!(categorizer.len(), 1);
        assert_eq!(categorizer.categorize("Coffee", "tx", &Overrides::new()), "Dining");
    }

    #[test]
    fn test_next_rule_id_skips_taken_ids() {
        let first = next_rule_id(&[]);
        let taken = vec![rule(&first, "a", "A", false)];
        let second = next_rule_id(&taken);
        assert_ne!(first, second);
        assert!(second.parse::<i64>().is_ok());
    }

    #[test]
    fn test_compile_pattern_rejects_invalid_regex() {
        assert!(compile_pattern("(unclosed", false).is_err());
        assert!(compile_pattern("coffee|tea", false).unwrap().is_match("TEA HOUSE"));
        assert!(!compile_pattern("coffee", true).unwrap().is_match("COFFEE"));
    }

    #[test]
    fn test_categorization_serializes_source() {
        let json = serde_json::to_value(Categorization {
            category: "Dining".to_string(),
            source: CategorySource::Rule {
                rule_id: "r1".to_string(),
            },
        })
        .unwrap();
        assert_eq!(json["category"], "Dining");
        assert_eq!(json["source"], "rule");
        assert_eq!(json["rule_id"], "r1");
    }
}
