use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::inventory::{consolidate, StockRequest, StockShortfall};
use crate::domain::ports::InventoryLedger;
use crate::schema::inventory;

use super::models::InventoryRow;

pub struct DieselInventoryLedger {
    pool: DbPool,
}

impl DieselInventoryLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn current_quantity(
    conn: &mut PgConnection,
    product_id: Uuid,
    size: &str,
) -> Result<Option<i32>, DomainError> {
    Ok(inventory::table
        .find((product_id, size))
        .select(inventory::quantity)
        .first::<i32>(conn)
        .optional()?)
}

#[async_trait]
impl InventoryLedger for DieselInventoryLedger {
    async fn reserve(&self, items: &[StockRequest]) -> Result<(), DomainError> {
        let requests = consolidate(items)?;
        let pool = self.pool.clone();

        web::block(move || {
            let mut pooled = pool.get()?;
            let conn: &mut PgConnection = &mut pooled;
            let now = Utc::now();

            // Any shortfall aborts the transaction, undoing the decrements already made.
            conn.transaction::<_, DomainError, _>(|conn| {
                let mut shortfalls = Vec::new();
                for request in &requests {
                    let updated = diesel::update(
                        inventory::table
                            .find((request.product_id, request.size.as_str()))
                            .filter(inventory::quantity.ge(request.quantity)),
                    )
                    .set((
                        inventory::quantity.eq(inventory::quantity - request.quantity),
                        inventory::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                    if updated == 0 {
                        shortfalls.push(StockShortfall {
                            product_id: request.product_id,
                            size: request.size.clone(),
                            requested: request.quantity,
                            available: current_quantity(
                                conn,
                                request.product_id,
                                &request.size,
                            )?
                            .unwrap_or(0),
                        });
                    }
                }

                if shortfalls.is_empty() {
                    Ok(())
                } else {
                    Err(DomainError::InsufficientStock(shortfalls))
                }
            })
        })
        .await?
    }

    async fn release(&self, items: &[StockRequest]) -> Result<(), DomainError> {
        let requests = consolidate(items)?;
        let pool = self.pool.clone();

        web::block(move || {
            let mut pooled = pool.get()?;
            let conn: &mut PgConnection = &mut pooled;
            let now = Utc::now();

            conn.transaction::<_, DomainError, _>(|conn| {
                for request in requests {
                    diesel::insert_into(inventory::table)
                        .values(&InventoryRow {
                            product_id: request.product_id,
                            size: request.size,
                            quantity: request.quantity,
                            updated_at: now,
                        })
                        .on_conflict((inventory::product_id, inventory::size))
                        .do_update()
                        .set((
                            inventory::quantity
                                .eq(inventory::quantity + excluded(inventory::quantity)),
                            inventory::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                }
                Ok(())
            })
        })
        .await?
    }

    async fn available(&self, product_id: Uuid, size: &str) -> Result<i32, DomainError> {
        let pool = self.pool.clone();
        let size = size.to_string();
        web::block(move || {
            let mut conn = pool.get()?;
            Ok(current_quantity(&mut conn, product_id, &size)?.unwrap_or(0))
        })
        .await?
    }

    async fn set_quantity(
        &self,
        product_id: Uuid,
        size: &str,
        quantity: i32,
    ) -> Result<(), DomainError> {
        if quantity < 0 {
            return Err(DomainError::InvalidInput(
                "quantity must not be negative".to_string(),
            ));
        }
        let pool = self.pool.clone();
        let size = size.to_string();

        web::block(move || {
            let mut conn = pool.get()?;
            let now = Utc::now();
            diesel::insert_into(inventory::table)
                .values(&InventoryRow {
                    product_id,
                    size,
                    quantity,
                    updated_at: now,
                })
                .on_conflict((inventory::product_id, inventory::size))
                .do_update()
                .set((
                    inventory::quantity.eq(quantity),
                    inventory::updated_at.eq(now),
                ))
                .execute(&mut conn)?;
            Ok(())
        })
        .await?
    }
}
