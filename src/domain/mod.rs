pub mod errors;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod payment;
pub mod ports;
pub mod pricing;
pub mod tracking;
