pub mod email_client;
pub mod inventory_repo;
pub mod memory;
pub mod models;
pub mod order_repo;
pub mod payment_client;

#[cfg(test)]
pub(crate) mod test_support;
