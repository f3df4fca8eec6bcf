use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct StockResponse {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetStockRequest {
    pub quantity: i32,
}

/// GET /inventory/{product_id}/{size}
///
/// Unknown product/size pairs report zero.
#[utoipa::path(
    get,
    path = "/inventory/{product_id}/{size}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("size" = String, Path, description = "Size label"),
    ),
    responses(
        (status = 200, description = "Available stock", body = StockResponse),
    ),
    tag = "inventory"
)]
pub async fn get_stock(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
) -> Result<HttpResponse, AppError> {
    let (product_id, size) = path.into_inner();
    let quantity = state.inventory.available(product_id, &size).await?;
    Ok(HttpResponse::Ok().json(StockResponse {
        product_id,
        size,
        quantity,
    }))
}

/// PUT /inventory/{product_id}/{size}
#[utoipa::path(
    put,
    path = "/inventory/{product_id}/{size}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        ("size" = String, Path, description = "Size label"),
    ),
    request_body = SetStockRequest,
    responses(
        (status = 200, description = "Stock set", body = StockResponse),
        (status = 400, description = "Negative quantity"),
    ),
    tag = "inventory"
)]
pub async fn set_stock(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, String)>,
    body: web::Json<SetStockRequest>,
) -> Result<HttpResponse, AppError> {
    let (product_id, size) = path.into_inner();
    let quantity = body.quantity;
    state
        .inventory
        .set_quantity(product_id, &size, quantity)
        .await?;
    log::info!("Stock for {} size {} set to {}", product_id, size, quantity);
    Ok(HttpResponse::Ok().json(StockResponse {
        product_id,
        size,
        quantity,
    }))
}
