//! Category rule command implementations

use anyhow::{bail, Context, Result};
use minister_core::{
    clean_all, cleaning::normalize_description, compile_pattern, next_rule_id, CategoryRule,
    Categorizer, JsonStore,
};

use super::truncate;

pub fn cmd_rules_list(store: &JsonStore) -> Result<()> {
    let rules = store.load_category_rules();

    if rules.is_empty() {
        println!("No category rules. Add one with 'minister rules add PATTERN CATEGORY'.");
        return Ok(());
    }

    println!();
    println!("🏷️  Category rules (first match wins)");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   {:<15} {:<30} {:<20}", "ID", "PATTERN", "CATEGORY");
    for rule in &rules {
        let flag = if rule.case_sensitive { " (Aa)" } else { "" };
        println!(
            "   {:<15} {:<30} {:<20}{}",
            rule.id,
            truncate(&rule.pattern, 30),
            truncate(&rule.category, 20),
            flag
        );
    }

    Ok(())
}

/// Append a rule and re-categorize; returns the stored rule
pub fn cmd_rules_add(
    store: &JsonStore,
    pattern: &str,
    category: &str,
    case_sensitive: bool,
) -> Result<CategoryRule> {
    if pattern.is_empty() {
        bail!("Pattern is required");
    }
    if category.is_empty() {
        bail!("Category is required");
    }
    compile_pattern(pattern, case_sensitive).context("Invalid regex pattern")?;

    let _guard = store.lock();
    let mut rules = store.load_category_rules();
    let rule = CategoryRule {
        id: next_rule_id(&rules),
        category: category.to_string(),
        pattern: pattern.to_string(),
        case_sensitive,
    };
    rules.push(rule.clone());
    store
        .save_category_rules(&rules)
        .context("Failed to save category rules")?;
    clean_all(store).context("Failed to categorize transactions")?;

    println!("✅ Added rule {}: /{}/ → {}", rule.id, rule.pattern, rule.category);
    Ok(rule)
}

/// Delete a rule and re-categorize
pub fn cmd_rules_delete(store: &JsonStore, id: &str) -> Result<()> {
    let _guard = store.lock();
    let mut rules = store.load_category_rules();
    let before = rules.len();
    rules.retain(|r| r.id != id);
    if rules.len() == before {
        bail!("Category rule not found: {}", id);
    }

    store
        .save_category_rules(&rules)
        .context("Failed to save category rules")?;
    clean_all(store).context("Failed to categorize transactions")?;

    println!("✅ Deleted rule {}", id);
    Ok(())
}

pub fn cmd_rules_test(store: &JsonStore, description: &str, transaction: Option<&str>) -> Result<()> {
    let categorizer = Categorizer::new(
        &store.load_category_rules(),
        &store
            .load_default_category_rules()
            .context("Failed to load default rules")?,
    );
    let result = categorizer.explain(
        &normalize_description(description),
        transaction.unwrap_or(""),
        &store.load_overrides(),
    );

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
