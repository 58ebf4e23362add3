//! Category rule management handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use minister_core::{
    clean_all, compile_pattern, next_rule_id, Categorization, Categorizer, CategoryRule,
};

use crate::{read_json, AppError, AppState, SuccessResponse};

fn validate_pattern(pattern: &str, case_sensitive: bool) -> Result<(), AppError> {
    compile_pattern(pattern, case_sensitive)
        .map(|_| ())
        .map_err(|e| AppError::bad_request(&format!("Invalid regex pattern: {}", e)))
}

/// GET /api/categories - List user category rules in match order
pub async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryRule>> {
    Json(state.store.load_category_rules())
}

/// Request body for creating or updating a rule
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequest {
    pub pattern: Option<String>,
    pub category: Option<String>,
    pub case_sensitive: Option<bool>,
}

/// POST /api/categories - Append a user rule and re-clean
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategoryRule>, AppError> {
    let req: RuleRequest = read_json(request).await?;

    let pattern = req
        .pattern
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::bad_request("Pattern is required"))?;
    let category = req
        .category
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::bad_request("Category is required"))?;
    let case_sensitive = req.case_sensitive.unwrap_or(false);
    validate_pattern(&pattern, case_sensitive)?;

    let store = &state.store;
    let _guard = store.lock();
    let mut rules = store.load_category_rules();
    let rule = CategoryRule {
        id: next_rule_id(&rules),
        category,
        pattern,
        case_sensitive,
    };
    rules.push(rule.clone());
    store.save_category_rules(&rules)?;
    clean_all(store)?;

    info!("Created rule {} /{}/ -> '{}'", rule.id, rule.pattern, rule.category);
    Ok(Json(rule))
}

/// PUT /api/categories/:id - Update fields of a rule and re-clean
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Result<Json<CategoryRule>, AppError> {
    let req: RuleRequest = read_json(request).await?;

    let store = &state.store;
    let _guard = store.lock();
    let mut rules = store.load_category_rules();
    let rule = rules
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| AppError::not_found("Category rule not found"))?;

    let updated = CategoryRule {
        id: id.clone(),
        category: req.category.unwrap_or_else(|| rule.category.clone()),
        pattern: req.pattern.unwrap_or_else(|| rule.pattern.clone()),
        case_sensitive: req.case_sensitive.unwrap_or(rule.case_sensitive),
    };
    validate_pattern(&updated.pattern, updated.case_sensitive)?;
    *rule = updated.clone();

    store.save_category_rules(&rules)?;
    clean_all(store)?;

    info!("Updated rule {}", id);
    Ok(Json(updated))
}

/// DELETE /api/categories/:id - Remove a rule and re-clean
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    let store = &state.store;
    let _guard = store.lock();
    let mut rules = store.load_category_rules();
    let before = rules.len();
    rules.retain(|r| r.id != id);
    if rules.len() == before {
        return Err(AppError::not_found("Category rule not found"));
    }

    store.save_category_rules(&rules)?;
    clean_all(store)?;

    info!("Deleted rule {}", id);
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShouldImportResponse {
    pub should_import: bool,
    pub count: usize,
}

/// GET /api/categories/should-import-defaults - Whether the user has no rules yet
pub async fn should_import_defaults(
    State(state): State<Arc<AppState>>,
) -> Json<ShouldImportResponse> {
    let count = state.store.load_category_rules().len();
    Json(ShouldImportResponse {
        should_import: count == 0,
        count,
    })
}

#[derive(Serialize)]
pub struct ImportDefaultsResponse {
    pub success: bool,
    pub imported: usize,
    pub message: String,
}

/// POST /api/categories/import-defaults - Replace user rules with the defaults
pub async fn import_defaults(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportDefaultsResponse>, AppError> {
    let store = &state.store;
    let _guard = store.lock();
    let defaults = store.load_default_category_rules()?;
    if defaults.is_empty() {
        return Err(AppError::bad_request("No default rules available to import"));
    }

    store.save_category_rules(&defaults)?;
    clean_all(store)?;

    info!("Imported {} default rules", defaults.len());
    Ok(Json(ImportDefaultsResponse {
        success: true,
        imported: defaults.len(),
        message: format!("Imported {} default rules", defaults.len()),
    }))
}

/// Request body for testing categorization
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCategorizationRequest {
    pub description: String,
    pub transaction_id: Option<String>,
}

/// POST /api/categories/test - Show which category a description would get
pub async fn test_categorization(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Categorization>, AppError> {
    let req: TestCategorizationRequest = read_json(request).await?;

    let store = &state.store;
    let categorizer = Categorizer::new(
        &store.load_category_rules(),
        &store.load_default_category_rules()?,
    );
    let overrides = store.load_overrides();
    let description = minister_core::cleaning::normalize_description(&req.description);

    Ok(Json(categorizer.explain(
        &description,
        req.transaction_id.as_deref().unwrap_or(""),
        &overrides,
    )))
}
