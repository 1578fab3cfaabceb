//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{Money, NewProduct, Product, ProductPatch};
use serde::{Deserialize, Serialize};
use store::{ProductFilter, Store};

use crate::auth::Principal;
use crate::error::ApiError;

use super::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price_cents: i64,
    pub detail: Option<String>,
    pub photo: Option<String>,
    #[serde(default = "default_listed")]
    pub listed: bool,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub min_stock: u32,
}

fn default_listed() -> bool {
    true
}

#[derive(Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub price_cents: Option<i64>,
    pub detail: Option<String>,
    pub photo: Option<String>,
    pub listed: Option<bool>,
    pub stock: Option<u32>,
    pub min_stock: Option<u32>,
}

#[derive(Deserialize)]
pub struct ListProductsQuery {
    /// Include soft-deleted products; administrators only.
    #[serde(default)]
    pub all: bool,
}

// -- Response types --

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: String,
    pub name: String,
    pub price_cents: i64,
    pub detail: Option<String>,
    pub photo: Option<String>,
    pub listed: bool,
    pub stock: u32,
    pub min_stock: u32,
    pub active: bool,
    pub below_minimum: bool,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price_cents: product.price.cents(),
            detail: product.detail.clone(),
            photo: product.photo.clone(),
            listed: product.listed,
            stock: product.stock,
            min_stock: product.min_stock,
            active: product.active,
            below_minimum: product.below_minimum(),
        }
    }
}

fn parse_product_id(id: &str) -> Result<ProductId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(ProductId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("invalid product id: {e}")))
}

// -- Handlers --

/// POST /products — create a product (admin).
#[tracing::instrument(skip(state, principal, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    principal.require_admin()?;

    let product = state
        .catalog
        .create(NewProduct {
            name: req.name,
            price: Money::from_cents(req.price_cents),
            detail: req.detail,
            photo: req.photo,
            listed: req.listed,
            stock: req.stock,
            min_stock: req.min_stock,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products — list the catalog. `?all=true` includes
/// soft-deleted products and requires the admin role.
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Query(query): Query<ListProductsQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let filter = if query.all {
        principal.require_admin()?;
        ProductFilter::All
    } else {
        ProductFilter::ActiveOnly
    };

    let products = state.catalog.list(filter).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/low-stock — active products below their minimum
/// stock threshold (admin).
pub async fn low_stock<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    principal.require_admin()?;
    let products = state.catalog.low_stock().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// GET /products/:id — load one product.
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    let id = parse_product_id(&id)?;
    let product = state.catalog.get(id).await?;
    Ok(Json(product.into()))
}

/// PUT /products/:id — partial update (admin).
#[tracing::instrument(skip(state, principal, req))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    principal.require_admin()?;
    let id = parse_product_id(&id)?;

    let product = state
        .catalog
        .update(id, ProductPatch {
            name: req.name,
            price: req.price_cents.map(Money::from_cents),
            detail: req.detail,
            photo: req.photo,
            listed: req.listed,
            stock: req.stock,
            min_stock: req.min_stock,
        })
        .await?;

    Ok(Json(product.into()))
}

/// DELETE /products/:id — soft delete (admin). The product vanishes
/// from the public catalog but keeps serving historical order lines.
#[tracing::instrument(skip(state, principal))]
pub async fn deactivate<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    principal.require_admin()?;
    let id = parse_product_id(&id)?;
    let product = state.catalog.deactivate(id).await?;
    Ok(Json(product.into()))
}
