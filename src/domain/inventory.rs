use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRequest {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockShortfall {
    pub product_id: Uuid,
    pub size: String,
    pub requested: i32,
    pub available: i32,
}

/// Merges lines that name the same `(product, size)` and sorts them by key.
///
/// Adapters lock inventory rows in the returned order, so two reservations
/// touching the same records always acquire them in the same sequence.
pub fn consolidate(items: &[StockRequest]) -> Result<Vec<StockRequest>, DomainError> {
    let mut merged: BTreeMap<(Uuid, String), i32> = BTreeMap::new();
    for item in items {
        if item.quantity <= 0 {
            return Err(DomainError::InvalidInput(format!(
                "quantity for product {} size {} must be positive",
                item.product_id, item.size
            )));
        }
        let entry = merged
            .entry((item.product_id, item.size.clone()))
            .or_insert(0);
        *entry = entry.checked_add(item.quantity).ok_or_else(|| {
            DomainError::InvalidInput(format!(
                "quantity overflow for product {} size {}",
                item.product_id, item.size
            ))
        })?;
    }

    Ok(merged
        .into_iter()
        .map(|((product_id, size), quantity)| StockRequest {
            product_id,
            size,
            quantity,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(product_id: Uuid, size: &str, quantity: i32) -> StockRequest {
        StockRequest {
            product_id,
            size: size.to_string(),
            quantity,
        }
    }

    #[test]
    fn consolidate_merges_duplicate_lines() {
        let shirt = Uuid::new_v4();
        let merged = consolidate(&[
            request(shirt, "M", 1),
            request(shirt, "L", 1),
            request(shirt, "M", 2),
        ])
        .expect("valid requests");

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], request(shirt, "L", 1));
        assert_eq!(merged[1], request(shirt, "M", 3));
    }

    #[test]
    fn consolidate_rejects_non_positive_quantity() {
        let err = consolidate(&[request(Uuid::new_v4(), "S", 0)]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn consolidate_orders_by_product_then_size() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let merged = consolidate(&[request(b, "S", 1), request(a, "XL", 1), request(a, "L", 1)])
            .expect("valid requests");

        let keys: Vec<(Uuid, &str)> = merged
            .iter()
            .map(|r| (r.product_id, r.size.as_str()))
            .collect();
        assert_eq!(keys, vec![(a, "L"), (a, "XL"), (b, "S")]);
    }
}
