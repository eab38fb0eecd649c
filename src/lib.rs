//! NetBill - Subscriber Billing Backend for ISP Operators
//!
//! This crate implements multi-tenant subscriber billing: invoice
//! generation, payment-gateway integration with webhook reconciliation,
//! and tenant-scoped data access.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
