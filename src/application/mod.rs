pub mod fulfillment;
pub mod order_service;
