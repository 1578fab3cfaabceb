//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::NaiveDate;
use common::OrderId;
use domain::{CartLine, Order, OrderLine, PaymentMethod};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, StateFilter, Store, StoreError};

use crate::auth::Principal;
use crate::error::ApiError;

use super::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub lines: Vec<CartLineRequest>,
    pub payment_method: Option<String>,
    pub observation: Option<String>,
}

#[derive(Deserialize)]
pub struct RegisterSaleRequest {
    pub lines: Vec<CartLineRequest>,
    pub payment_method: String,
    pub observation: Option<String>,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    /// One of `solicited`, `pending_pickup`, `finalized`.
    pub state: Option<String>,
    pub date: Option<NaiveDate>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: Option<String>,
    pub date: NaiveDate,
    pub observation: Option<String>,
    pub total_quantity: u32,
    pub total_cents: i64,
    pub confirmed: bool,
    pub registered: bool,
    pub paid: bool,
    pub state: &'static str,
    pub payment_method: Option<String>,
    pub channel: &'static str,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub line_no: u32,
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub total_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let state = if order.status.is_finalized() {
            "finalized"
        } else if order.status.is_pending_pickup() {
            "pending_pickup"
        } else {
            "solicited"
        };

        Self {
            id: order.id.to_string(),
            customer_id: order.customer.map(|c| c.to_string()),
            date: order.date,
            observation: order.observation.clone(),
            total_quantity: order.total_quantity,
            total_cents: order.total_amount().cents(),
            confirmed: order.status.confirmed,
            registered: order.status.registered,
            paid: order.status.paid,
            state,
            payment_method: order.payment_method.map(|m| m.to_string()),
            channel: order.channel.as_str(),
            lines: order.lines.iter().map(OrderLineResponse::from).collect(),
        }
    }
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            line_no: line.line_no,
            product_id: line.product.id.to_string(),
            product_name: line.product.name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            total_cents: line.total().cents(),
        }
    }
}

// -- Parsing helpers --

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(OrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))
}

fn parse_lines(lines: &[CartLineRequest]) -> Result<Vec<CartLine>, ApiError> {
    lines
        .iter()
        .map(|line| {
            let product_id = uuid::Uuid::parse_str(&line.product_id)
                .map(common::ProductId::from_uuid)
                .map_err(|e| ApiError::BadRequest(format!("invalid product id: {e}")))?;
            Ok(CartLine {
                product_id,
                quantity: line.quantity,
            })
        })
        .collect()
}

fn parse_payment_method(tag: &str) -> Result<PaymentMethod, ApiError> {
    tag.parse()
        .map_err(|e| ApiError::Store(StoreError::Order(e)))
}

fn parse_state_filter(tag: &str) -> Result<StateFilter, ApiError> {
    match tag {
        "solicited" => Ok(StateFilter::Solicited),
        "pending_pickup" => Ok(StateFilter::PendingPickup),
        "finalized" => Ok(StateFilter::Finalized),
        other => Err(ApiError::BadRequest(format!(
            "unknown state filter {other:?}"
        ))),
    }
}

// -- Handlers --

/// POST /orders — place an online order for the calling customer.
#[tracing::instrument(skip(state, principal, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let lines = parse_lines(&req.lines)?;
    let payment_method = req
        .payment_method
        .as_deref()
        .map(parse_payment_method)
        .transpose()?;

    let order = state
        .orders
        .place_order(principal.id, lines, payment_method, req.observation)
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// POST /orders/register — record a walk-in sale at the register
/// (admin). The order is created already finalized and stock is
/// committed in the same unit of work.
#[tracing::instrument(skip(state, principal, req))]
pub async fn register_sale<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Json(req): Json<RegisterSaleRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    principal.require_admin()?;

    let lines = parse_lines(&req.lines)?;
    let payment_method = parse_payment_method(&req.payment_method)?;

    let order = state
        .orders
        .register_sale(lines, payment_method, req.observation)
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /orders — list orders, optionally sliced by state and date
/// (admin).
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    principal.require_admin()?;

    let mut filter = OrderFilter::default();
    if let Some(ref tag) = query.state {
        filter.state = Some(parse_state_filter(tag)?);
    }
    filter.date = query.date;

    let orders = state.orders.list(filter).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/mine — the calling customer's own orders.
pub async fn mine<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state
        .orders
        .list(OrderFilter::for_customer(principal.id))
        .await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/:id — load one order. Customers see only their own.
pub async fn get<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_order_id(&id)?;
    let order = state.orders.get(id).await?;
    if !principal.may_view(order.customer) {
        // The order exists, but not for this caller.
        return Err(ApiError::NotFound(format!("order {id} not found")));
    }
    Ok(Json(order.into()))
}

/// POST /orders/:id/confirm — accept a requested order (admin).
#[tracing::instrument(skip(state, principal))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    principal.require_admin()?;
    let id = parse_order_id(&id)?;
    let order = state.orders.confirm(id).await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/register — hand the order over and commit its
/// stock consumption (admin).
#[tracing::instrument(skip(state, principal))]
pub async fn register<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    principal.require_admin()?;
    let id = parse_order_id(&id)?;
    let order = state.orders.register(id).await?;
    Ok(Json(order.into()))
}

/// POST /orders/:id/pay — record payment (admin).
#[tracing::instrument(skip(state, principal))]
pub async fn pay<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    principal.require_admin()?;
    let id = parse_order_id(&id)?;
    let order = state.orders.mark_paid(id).await?;
    Ok(Json(order.into()))
}
