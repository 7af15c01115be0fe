use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Datelike;
use serde::Deserialize;

use crate::{
    AppState,
    catalog::{merge_sorted, merge_unique, sort_labels},
    error::RepoResult,
    models::{FilterOptions, ModelList, VersionList},
    repository::RepositoryState,
};

/// Brands offered even before any listing uses them.
pub const KNOWN_BRANDS: &[&str] = &[
    "Acura", "Alfa Romeo", "Aston Martin", "Audi", "Bentley", "BMW", "BYD", "Cadillac",
    "Changan", "Chery", "Chevrolet", "Chrysler", "Citroen", "Dodge", "Exeed", "Ferrari",
    "Fiat", "Ford", "Geely", "Genesis", "GMC", "Great Wall", "Haval", "Honda", "Hyundai",
    "Infiniti", "Jaguar", "Jeep", "Kia", "Lada", "Lamborghini", "Land Rover", "Lexus",
    "Lincoln", "Maserati", "Mazda", "Mercedes-Benz", "Mini", "Mitsubishi", "Nissan", "Opel",
    "Peugeot", "Porsche", "Renault", "Rolls-Royce", "Skoda", "Subaru", "Suzuki", "Tesla",
    "Toyota", "Volkswagen", "Volvo",
];

const FALLBACK_MIN_YEAR: i32 = 1990;
/// Widest year range the options endpoint will list.
const MAX_YEAR_SPAN: i64 = 300;

/// ModelQuery
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ModelQuery {
    pub brand: Option<String>,
}

/// VersionQuery
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct VersionQuery {
    pub brand: Option<String>,
    pub model: Option<String>,
}

/// years_descending
///
/// Every year between the two bounds, newest first. Missing bounds fall back
/// to 1990 and `current_year`; swapped bounds are tolerated. A range wider
/// than `MAX_YEAR_SPAN` yields no years at all.
pub fn years_descending(min: Option<i32>, max: Option<i32>, current_year: i32) -> Vec<i32> {
    let lo = min.unwrap_or(FALLBACK_MIN_YEAR);
    let hi = max.unwrap_or(current_year);
    let (from, to) = (lo.min(hi), lo.max(hi));
    if i64::from(to) - i64::from(from) >= MAX_YEAR_SPAN {
        tracing::warn!(from, to, "listing year range too wide, serving no years");
        return Vec::new();
    }
    (from..=to).rev().collect()
}

fn or_empty<T: Default>(result: RepoResult<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, what, "filter source unavailable, serving empty list");
        T::default()
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// load_filter_options
///
/// Known brands merged with the brands in use, plus the year range of the
/// current listings. Shared by the filter endpoint and the sell form.
pub async fn load_filter_options(repo: &RepositoryState) -> FilterOptions {
    let brands = match repo.distinct_brands().await {
        Ok(db_brands) => {
            let all = KNOWN_BRANDS
                .iter()
                .copied()
                .chain(db_brands.iter().map(String::as_str));
            let mut brands = merge_unique(all);
            sort_labels(&mut brands);
            brands
        }
        Err(e) => {
            tracing::warn!(error = %e, "brand lookup failed, serving empty options");
            return FilterOptions::default();
        }
    };

    let years = match repo.year_bounds().await {
        Ok((min, max)) => years_descending(min, max, chrono::Utc::now().year()),
        Err(e) => {
            tracing::warn!(error = %e, "year lookup failed, serving empty options");
            return FilterOptions::default();
        }
    };

    FilterOptions { brands, years }
}

/// filter_options
///
/// [Public Route] Brand and year choices. Never fails; a database problem
/// yields empty lists.
#[utoipa::path(
    get,
    path = "/api/filters/options",
    responses((status = 200, description = "Brands and years", body = FilterOptions))
)]
pub async fn filter_options(State(state): State<AppState>) -> Json<FilterOptions> {
    Json(load_filter_options(&state.repo).await)
}

/// filter_models
///
/// [Public Route] Models for a brand: those already listed plus the external
/// catalog's, de-duplicated and sorted.
#[utoipa::path(
    get,
    path = "/api/filters/models",
    params(ModelQuery),
    responses((status = 200, description = "Models", body = ModelList))
)]
pub async fn filter_models(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Json<ModelList> {
    let Some(brand) = non_blank(query.brand) else {
        return Json(ModelList::default());
    };

    let local = or_empty(state.repo.distinct_models(&brand).await, "models");
    let remote = state.catalog.models_for_brand(&brand).await;
    Json(ModelList {
        models: merge_sorted(local, remote),
    })
}

/// filter_versions
///
/// [Public Route] Versions (trims) for a brand and model.
#[utoipa::path(
    get,
    path = "/api/filters/versions",
    params(VersionQuery),
    responses((status = 200, description = "Versions", body = VersionList))
)]
pub async fn filter_versions(
    State(state): State<AppState>,
    Query(query): Query<VersionQuery>,
) -> Json<VersionList> {
    let (Some(brand), Some(model)) = (non_blank(query.brand), non_blank(query.model)) else {
        return Json(VersionList::default());
    };

    let local = or_empty(state.repo.distinct_versions(&brand, &model).await, "versions");
    let remote = state.catalog.versions_for(&brand, &model).await;
    Json(VersionList {
        versions: merge_sorted(local, remote),
    })
}
